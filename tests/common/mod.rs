#![allow(dead_code)]

use chrono::{DateTime, Utc};
use rapport::{QuestionCategory, Session, SessionRules, Stage};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

pub fn spend_messages(session: &mut Session, count: usize, now: DateTime<Utc>) {
    for i in 0..count {
        let sender = if i % 2 == 0 { ALICE } else { BOB };
        session
            .send_message(sender, "hello", None, now)
            .expect("Failed to send message");
    }
}

/// Walk a fresh session through the gated stages up to MainQuestion.
pub fn session_in_main_question(rules: SessionRules, now: DateTime<Utc>) -> Session {
    let mut session = Session::new(ALICE, BOB, rules, now);

    spend_messages(&mut session, 5, now);
    session
        .advance_stage(ALICE, now)
        .expect("Failed to enter Intuition");

    spend_messages(&mut session, 5, now);
    for _ in 0..5 {
        session
            .ask_question(BOB, None, now)
            .expect("Failed to ask question");
    }
    session
        .advance_stage(BOB, now)
        .expect("Failed to enter Closeness");

    spend_messages(&mut session, 5, now);
    for category in QuestionCategory::ALL {
        for _ in 0..5 {
            session
                .ask_question(ALICE, Some(category), now)
                .expect("Failed to ask question");
        }
    }
    session
        .advance_stage(ALICE, now)
        .expect("Failed to enter MainQuestion");
    assert_eq!(session.stage(), Stage::MainQuestion);
    session
}
