use chrono::Utc;
use rapport::{
    Budget, BudgetResource, Command, CommandEnvelope, CommandId, PromptKind, QuestionCategory,
    Session, SessionError, SessionEvent, SessionRules, Stage,
};

fn new_session() -> Session {
    Session::new("alice", "bob", SessionRules::default(), Utc::now())
}

fn spend_messages(session: &mut Session, count: usize) {
    let now = Utc::now();
    for i in 0..count {
        let sender = if i % 2 == 0 { "alice" } else { "bob" };
        session
            .send_message(sender, "hello", None, now)
            .expect("Failed to send message");
    }
}

#[test]
fn test_introduction_scenario() {
    let mut session = new_session();
    assert_eq!(session.stage(), Stage::Introduction);
    assert_eq!(session.message_budget(), Budget::Finite(5));

    spend_messages(&mut session, 5);
    assert_eq!(session.message_budget(), Budget::Finite(0));
    assert!(session.can_advance_stage());

    session
        .advance_stage("bob", Utc::now())
        .expect("Failed to advance stage");
    assert_eq!(session.stage(), Stage::Intuition);
    assert_eq!(session.message_budget(), Budget::Finite(5));
    assert_eq!(session.question_budget(), Budget::Finite(5));
}

#[test]
fn test_send_message_beyond_budget_is_clamped() {
    let mut session = new_session();
    spend_messages(&mut session, 5);

    for _ in 0..3 {
        let result = session.send_message("alice", "again", None, Utc::now());
        assert_eq!(
            result,
            Err(SessionError::BudgetExhausted {
                resource: BudgetResource::Messages
            })
        );
    }
    assert_eq!(session.message_budget(), Budget::Finite(0));
    assert_eq!(session.messages().len(), 5);
}

#[test]
fn test_send_message_validation() {
    let mut session = new_session();
    let now = Utc::now();

    assert_eq!(
        session.send_message("alice", "   ", None, now),
        Err(SessionError::EmptyText)
    );
    assert_eq!(
        session.send_message("mallory", "hi", None, now),
        Err(SessionError::UnknownParticipant("mallory".to_string()))
    );
    assert_eq!(session.message_budget(), Budget::Finite(5));

    let events = session
        .send_message("alice", "hi", None, now)
        .expect("Failed to send message");
    let SessionEvent::MessageSent { message_id, .. } = events[0] else {
        panic!("Expected MessageSent");
    };
    session
        .send_message("bob", "hey", Some(message_id), now)
        .expect("Failed to reply");
    assert_eq!(session.messages()[1].reply_to, Some(message_id));
}

#[test]
fn test_advance_requires_exhausted_budgets() {
    let mut session = new_session();
    spend_messages(&mut session, 4);
    assert!(!session.can_advance_stage());

    let result = session.advance_stage("alice", Utc::now());
    assert_eq!(
        result,
        Err(SessionError::InvalidTransition {
            from: "Introduction".to_string(),
            to: "Intuition".to_string(),
        })
    );
    assert_eq!(session.stage(), Stage::Introduction);
}

#[test]
fn test_intuition_gates_on_questions_and_messages() {
    let mut session = new_session();
    spend_messages(&mut session, 5);
    session
        .advance_stage("alice", Utc::now())
        .expect("Failed to advance stage");

    spend_messages(&mut session, 5);
    assert!(!session.can_advance_stage());

    for _ in 0..5 {
        let events = session
            .ask_question("bob", None, Utc::now())
            .expect("Failed to ask question");
        assert!(matches!(
            events[0],
            SessionEvent::PromptIssued {
                kind: PromptKind::Intuition,
                ..
            }
        ));
    }
    assert_eq!(
        session.ask_question("bob", None, Utc::now()),
        Err(SessionError::BudgetExhausted {
            resource: BudgetResource::Questions
        })
    );
    assert!(session.can_advance_stage());
    assert_eq!(session.prompts().len(), 5);
}

#[test]
fn test_intuition_rejects_categories() {
    let mut session = new_session();
    spend_messages(&mut session, 5);
    session
        .advance_stage("alice", Utc::now())
        .expect("Failed to advance stage");

    let result = session.ask_question("alice", Some(QuestionCategory::Closer), Utc::now());
    assert!(matches!(
        result,
        Err(SessionError::InvalidStageForOperation { .. })
    ));
    assert_eq!(session.question_budget(), Budget::Finite(5));
}

#[test]
fn test_question_not_available_in_introduction() {
    let mut session = new_session();
    let result = session.ask_question("alice", None, Utc::now());
    assert_eq!(
        result,
        Err(SessionError::InvalidStageForOperation {
            operation: "ask_question",
            stage: Stage::Introduction,
        })
    );
}

fn session_in_closeness() -> Session {
    let mut session = new_session();
    spend_messages(&mut session, 5);
    session
        .advance_stage("alice", Utc::now())
        .expect("Failed to advance stage");
    spend_messages(&mut session, 5);
    for _ in 0..5 {
        session
            .ask_question("alice", None, Utc::now())
            .expect("Failed to ask question");
    }
    session
        .advance_stage("alice", Utc::now())
        .expect("Failed to advance stage");
    session
}

#[test]
fn test_closeness_categories_gate_independently() {
    let mut session = session_in_closeness();
    assert_eq!(session.stage(), Stage::Closeness);
    assert_eq!(
        session.ask_question("alice", None, Utc::now()),
        Err(SessionError::CategoryRequired(Stage::Closeness))
    );

    for _ in 0..5 {
        session
            .ask_question("alice", Some(QuestionCategory::Closer), Utc::now())
            .expect("Failed to ask question");
    }
    assert_eq!(
        session.ask_question("bob", Some(QuestionCategory::Closer), Utc::now()),
        Err(SessionError::BudgetExhausted {
            resource: BudgetResource::Category(QuestionCategory::Closer)
        })
    );
    // Other categories are untouched.
    assert_eq!(
        session.category_budget(QuestionCategory::EvenCloser),
        Budget::Finite(5)
    );
    session
        .ask_question("bob", Some(QuestionCategory::EvenCloser), Utc::now())
        .expect("Failed to ask question");

    spend_messages(&mut session, 5);
    assert!(!session.can_advance_stage());

    for _ in 0..4 {
        session
            .ask_question("bob", Some(QuestionCategory::EvenCloser), Utc::now())
            .expect("Failed to ask question");
    }
    for _ in 0..5 {
        session
            .ask_question("bob", Some(QuestionCategory::InnerWorld), Utc::now())
            .expect("Failed to ask question");
    }
    assert!(session.can_advance_stage());

    session
        .advance_stage("bob", Utc::now())
        .expect("Failed to advance stage");
    assert_eq!(session.stage(), Stage::MainQuestion);
    assert_eq!(session.message_budget(), Budget::Unlimited);
}

#[test]
fn test_main_question_stage_is_unlimited() {
    let mut session = session_in_closeness();
    spend_messages(&mut session, 5);
    for category in QuestionCategory::ALL {
        for _ in 0..5 {
            session
                .ask_question("alice", Some(category), Utc::now())
                .expect("Failed to ask question");
        }
    }
    session
        .advance_stage("alice", Utc::now())
        .expect("Failed to advance stage");

    spend_messages(&mut session, 20);
    for _ in 0..10 {
        session
            .ask_question("bob", Some(QuestionCategory::InnerWorld), Utc::now())
            .expect("Failed to ask question");
    }
    assert_eq!(
        session.category_budget(QuestionCategory::InnerWorld),
        Budget::Unlimited
    );
    assert!(!session.can_advance_stage());
    assert!(matches!(
        session.advance_stage("alice", Utc::now()),
        Err(SessionError::InvalidTransition { .. })
    ));
}

#[test]
fn test_stage_order_is_fixed() {
    let mut session = session_in_closeness();
    spend_messages(&mut session, 5);
    for category in QuestionCategory::ALL {
        for _ in 0..5 {
            session
                .ask_question("alice", Some(category), Utc::now())
                .expect("Failed to ask question");
        }
    }
    let events = session
        .advance_stage("alice", Utc::now())
        .expect("Failed to advance stage");
    assert_eq!(
        events[0],
        SessionEvent::StageChanged {
            from: Stage::Closeness,
            to: Stage::MainQuestion,
        }
    );
}

#[test]
fn test_duplicate_command_is_not_reapplied() {
    let mut session = new_session();
    let now = Utc::now();
    let envelope = CommandEnvelope::new(
        "alice",
        Command::SendMessage {
            text: "hello".to_string(),
            reply_to: None,
        },
    )
    .with_id(CommandId::new());

    let first = session.apply(&envelope, now).expect("Failed to apply");
    assert!(!first.is_duplicate());
    let second = session.apply(&envelope, now).expect("Failed to apply");
    assert!(second.is_duplicate());

    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.message_budget(), Budget::Finite(4));
}

#[test]
fn test_rejected_command_id_can_be_retried() {
    let mut session = new_session();
    let now = Utc::now();
    let envelope = CommandEnvelope::new("alice", Command::AdvanceStage).with_id(CommandId::new());

    assert!(session.apply(&envelope, now).is_err());
    spend_messages(&mut session, 5);
    let outcome = session.apply(&envelope, now).expect("Failed to apply");
    assert!(!outcome.is_duplicate());
    assert_eq!(session.stage(), Stage::Intuition);
}
