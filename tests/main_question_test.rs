mod common;

use chrono::{Duration, Utc};
use rapport::{
    Answer, Budget, DeletionInitiator, DeletionReason, JobKind, MainQuestionOutcome,
    MainQuestionState, PerSide, QuestionCategory, SessionError, SessionEvent, SessionRules, Stage,
};

use common::{session_in_main_question, spend_messages, ALICE, BOB};

#[test]
fn test_entering_main_question_schedules_reveal() {
    let now = Utc::now();
    let session = session_in_main_question(SessionRules::default(), now);

    let expected = now + Duration::days(3);
    assert_eq!(
        session.main_question(),
        &MainQuestionState::Dormant {
            reveal_at: expected
        }
    );
    let jobs = session.scheduled_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::Reveal);
    assert_eq!(jobs[0].due_at, expected);
}

#[test]
fn test_declined_early_request_keeps_original_timer() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    let reveal_at = session
        .main_question()
        .reveal_at()
        .expect("Reveal time should be set");

    session
        .request_early_reveal(ALICE)
        .expect("Failed to request early reveal");
    assert_eq!(
        session.request_early_reveal(BOB),
        Err(SessionError::RequestAlreadyPending)
    );
    assert_eq!(
        session.respond_early_reveal(ALICE, true),
        Err(SessionError::NotRequestRecipient)
    );

    session
        .respond_early_reveal(BOB, false)
        .expect("Failed to decline");
    assert_eq!(
        session.main_question(),
        &MainQuestionState::Dormant { reveal_at }
    );
    assert_eq!(session.scheduled_jobs()[0].due_at, reveal_at);

    // A new request is possible after a decline.
    session
        .request_early_reveal(BOB)
        .expect("Failed to request again");
}

#[test]
fn test_accepted_early_request_reveals_question() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);

    session
        .request_early_reveal(BOB)
        .expect("Failed to request early reveal");
    let events = session
        .respond_early_reveal(ALICE, true)
        .expect("Failed to accept");

    assert_eq!(events, vec![SessionEvent::MainQuestionRevealed]);
    assert!(session.main_question().is_revealed());
    assert!(session.scheduled_jobs().is_empty());
}

#[test]
fn test_reveal_timer_fires_only_when_due() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    let job = session.scheduled_jobs()[0];

    let early = session
        .fire_timer(&job, now + Duration::days(1))
        .expect("Failed to fire timer");
    assert!(early.is_empty());
    assert!(!session.main_question().is_revealed());

    let events = session
        .fire_timer(&job, job.due_at)
        .expect("Failed to fire timer");
    assert_eq!(events, vec![SessionEvent::MainQuestionRevealed]);

    // A second firing of the same job changes nothing.
    let again = session
        .fire_timer(&job, job.due_at)
        .expect("Failed to fire timer");
    assert!(again.is_empty());
}

#[test]
fn test_answer_before_reveal_is_rejected() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    assert_eq!(
        session.submit_answer(ALICE, Answer::Yes, now),
        Err(SessionError::QuestionNotRevealed)
    );
}

#[test]
fn test_second_answer_is_rejected() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.request_early_reveal(ALICE).expect("Failed to request");
    session.respond_early_reveal(BOB, true).expect("Failed to accept");

    session
        .submit_answer(ALICE, Answer::Yes, now)
        .expect("Failed to answer");
    assert_eq!(
        session.submit_answer(ALICE, Answer::No, now),
        Err(SessionError::AlreadyAnswered)
    );

    session
        .submit_answer(BOB, Answer::Yes, now)
        .expect("Failed to answer");
    assert_eq!(
        session.submit_answer(BOB, Answer::Yes, now),
        Err(SessionError::AlreadyAnswered)
    );
}

fn confirm_match(first: &str, second: &str) {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.request_early_reveal(first).expect("Failed to request");
    session
        .respond_early_reveal(second, true)
        .expect("Failed to accept");

    session
        .submit_answer(first, Answer::Yes, now)
        .expect("Failed to answer");
    session
        .submit_contact_info(first, &format!("@{first}"), now)
        .expect("Failed to submit contact");
    assert_eq!(session.stage(), Stage::MainQuestion);

    session
        .submit_answer(second, Answer::Yes, now)
        .expect("Failed to answer");
    assert_eq!(session.stage(), Stage::MainQuestion);

    let events = session
        .submit_contact_info(second, &format!("@{second}"), now)
        .expect("Failed to submit contact");
    assert!(events.contains(&SessionEvent::MatchConfirmed {
        contacts: PerSide::new("@alice".to_string(), "@bob".to_string()),
    }));
    assert_eq!(session.stage(), Stage::DateExperience);
    assert_eq!(session.message_budget(), Budget::Finite(0));
    assert!(matches!(
        session.main_question(),
        MainQuestionState::Resolved {
            outcome: MainQuestionOutcome::Accepted,
            ..
        }
    ));
    assert!(!session.is_terminal());
}

#[test]
fn test_yes_yes_with_contacts_alice_first() {
    confirm_match(ALICE, BOB);
}

#[test]
fn test_yes_yes_with_contacts_bob_first() {
    confirm_match(BOB, ALICE);
}

#[test]
fn test_contact_info_requires_own_yes() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.request_early_reveal(ALICE).expect("Failed to request");
    session.respond_early_reveal(BOB, true).expect("Failed to accept");

    assert_eq!(
        session.submit_contact_info(ALICE, "@alice", now),
        Err(SessionError::ContactInfoNotExpected)
    );
    session
        .submit_answer(ALICE, Answer::No, now)
        .expect("Failed to answer");
    assert_eq!(
        session.submit_contact_info(ALICE, "@alice", now),
        Err(SessionError::ContactInfoNotExpected)
    );
    assert_eq!(
        session.submit_contact_info(BOB, "   ", now),
        Err(SessionError::EmptyText)
    );
}

fn decline(initiator_answer: Answer, counterpart_answer: Answer, counterpart_first: bool) {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.request_early_reveal(ALICE).expect("Failed to request");
    session.respond_early_reveal(BOB, true).expect("Failed to accept");

    let order = if counterpart_first {
        [(BOB, counterpart_answer), (ALICE, initiator_answer)]
    } else {
        [(ALICE, initiator_answer), (BOB, counterpart_answer)]
    };
    let (first, first_answer) = order[0];
    let (second, second_answer) = order[1];

    session
        .submit_answer(first, first_answer, now)
        .expect("Failed to answer");
    // Nothing is decided while one answer is missing.
    assert!(!session.is_terminal());

    let events = session
        .submit_answer(second, second_answer, now)
        .expect("Failed to answer");
    let expected = match (initiator_answer, counterpart_answer) {
        (Answer::No, Answer::No) => DeletionInitiator::Both,
        (Answer::No, _) => DeletionInitiator::Initiator,
        _ => DeletionInitiator::Counterpart,
    };
    assert!(events.contains(&SessionEvent::MatchRejected {
        declined_by: expected
    }));

    let deletion = session.deletion().expect("Session should be deleted");
    assert_eq!(deletion.initiated_by, expected);
    assert_eq!(deletion.reason, DeletionReason::MainQuestionDeclined);
    assert!(session.scheduled_jobs().is_empty());
    assert_eq!(
        session.send_message(ALICE, "hello?", None, now),
        Err(SessionError::SessionTerminated)
    );
}

#[test]
fn test_initiator_no_deletes_session() {
    decline(Answer::No, Answer::Yes, false);
    decline(Answer::No, Answer::Yes, true);
}

#[test]
fn test_counterpart_no_deletes_session() {
    decline(Answer::Yes, Answer::No, false);
    decline(Answer::Yes, Answer::No, true);
}

#[test]
fn test_both_no_deletes_session() {
    decline(Answer::No, Answer::No, false);
    decline(Answer::No, Answer::No, true);
}

#[test]
fn test_deletion_still_possible_after_no() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.request_early_reveal(ALICE).expect("Failed to request");
    session.respond_early_reveal(BOB, true).expect("Failed to accept");
    session
        .submit_answer(ALICE, Answer::No, now)
        .expect("Failed to answer");

    session
        .delete_session(BOB, Some("fair enough"), now)
        .expect("Failed to delete session");
    let deletion = session.deletion().expect("Session should be deleted");
    assert_eq!(deletion.initiated_by, DeletionInitiator::Counterpart);
}

#[test]
fn test_postpone_returns_to_closeness_then_reveals() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);

    let events = session.postpone(BOB, now).expect("Failed to postpone");
    assert_eq!(
        events[0],
        SessionEvent::StageChanged {
            from: Stage::MainQuestion,
            to: Stage::Closeness,
        }
    );
    assert_eq!(session.stage(), Stage::Closeness);
    assert_eq!(session.message_budget(), Budget::Finite(5));

    let jobs = session.scheduled_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ResumeMainQuestion);
    assert_eq!(jobs[0].due_at, now + Duration::days(1));

    let events = session
        .fire_timer(&jobs[0], jobs[0].due_at)
        .expect("Failed to fire timer");
    assert!(events.contains(&SessionEvent::MainQuestionRevealed));
    assert_eq!(session.stage(), Stage::MainQuestion);
    assert!(session.main_question().is_revealed());
    assert!(session.scheduled_jobs().is_empty());
}

#[test]
fn test_postponed_question_waits_for_resume_timer() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.postpone(ALICE, now).expect("Failed to postpone");

    spend_messages(&mut session, 5, now);
    for category in QuestionCategory::ALL {
        for _ in 0..5 {
            session
                .ask_question(BOB, Some(category), now)
                .expect("Failed to ask question");
        }
    }
    assert!(matches!(
        session.advance_stage(ALICE, now),
        Err(SessionError::InvalidTransition { .. })
    ));
    assert_eq!(session.stage(), Stage::Closeness);
    assert_eq!(
        session.main_question(),
        &MainQuestionState::Postponed {
            resume_at: now + Duration::days(1)
        }
    );

    let jobs = session.scheduled_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ResumeMainQuestion);
    session
        .fire_timer(&jobs[0], jobs[0].due_at)
        .expect("Failed to fire timer");
    assert_eq!(session.stage(), Stage::MainQuestion);
    assert!(session.main_question().is_revealed());
}

#[test]
fn test_revealed_question_cannot_be_postponed() {
    let now = Utc::now();
    let mut session = session_in_main_question(SessionRules::default(), now);
    session.request_early_reveal(ALICE).expect("Failed to request");
    session.respond_early_reveal(BOB, true).expect("Failed to accept");

    assert!(matches!(
        session.postpone(ALICE, now),
        Err(SessionError::InvalidTransition { .. })
    ));
    assert_eq!(session.stage(), Stage::MainQuestion);
}

#[test]
fn test_early_request_outside_main_question() {
    let mut session = rapport::Session::new(ALICE, BOB, SessionRules::default(), Utc::now());
    assert_eq!(
        session.request_early_reveal(ALICE),
        Err(SessionError::InvalidStageForOperation {
            operation: "request_early_reveal",
            stage: Stage::Introduction,
        })
    );
}
