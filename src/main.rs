use std::sync::Arc;

use anyhow::Context;
use dispatch::{BroadcastDispatcher, LogDispatcher, NotificationDispatcher};
use log::info;

use rapport::{
    Answer, Command, CommandEnvelope, CommandId, EngineConfig, InMemorySessionStore,
    QuestionCategory, ServiceError, SessionId, SessionService, Stage,
};

const ALICE: &str = "alice";
const BOB: &str = "bob";

async fn run(
    service: &SessionService,
    session_id: SessionId,
    by: &str,
    command: Command,
) -> anyhow::Result<()> {
    let name = command.name();
    let envelope = CommandEnvelope::new(by, command).with_id(CommandId::new());
    match service.execute(session_id, envelope).await {
        Ok(outcome) => {
            println!("{by:>6} {name:<20} ok, {} events", outcome.events().len());
            Ok(())
        }
        Err(ServiceError::SessionError(e)) => {
            println!("{by:>6} {name:<20} rejected: {}", e.user_message());
            Ok(())
        }
        Err(e) => Err(e).context(format!("{name} failed")),
    }
}

async fn chat(
    service: &SessionService,
    session_id: SessionId,
    lines: &[(&str, &str)],
) -> anyhow::Result<()> {
    for (by, text) in lines {
        run(
            service,
            session_id,
            by,
            Command::SendMessage {
                text: text.to_string(),
                reply_to: None,
            },
        )
        .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::var("RAPPORT_CONFIG") {
        Ok(path) => EngineConfig::from_file(&path).context("Failed to load config")?,
        Err(_) => EngineConfig::default(),
    };
    let history = Arc::new(BroadcastDispatcher::new(config.notification_history));
    let dispatcher: Arc<dyn NotificationDispatcher> =
        match std::env::var("RAPPORT_DISPATCH").as_deref() {
            Ok("log") => Arc::new(LogDispatcher::default()),
            _ => history.clone(),
        };
    let mut inbox = dispatcher.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = inbox.recv().await {
            println!(
                "   -> {} [{}] {}",
                notification.recipient, notification.kind, notification.payload
            );
        }
    });

    let service = SessionService::new(
        config,
        Arc::new(InMemorySessionStore::new()),
        dispatcher,
    );
    let session_id = service.create_session(ALICE, BOB).await?;
    info!("Session {session_id} created");

    // Introduction: five shared messages.
    chat(
        &service,
        session_id,
        &[
            (ALICE, "Hi!"),
            (BOB, "Hello"),
            (ALICE, "How was your day?"),
            (BOB, "Good, yours?"),
            (ALICE, "Great"),
        ],
    )
    .await?;
    run(&service, session_id, BOB, Command::SendMessage {
        text: "One more?".to_string(),
        reply_to: None,
    })
    .await?;
    run(&service, session_id, ALICE, Command::AdvanceStage).await?;

    // Intuition: spend the questions, then the messages.
    for _ in 0..5 {
        run(
            &service,
            session_id,
            BOB,
            Command::AskQuestion { category: None },
        )
        .await?;
    }
    chat(
        &service,
        session_id,
        &[(ALICE, "a"), (BOB, "b"), (ALICE, "c"), (BOB, "d"), (ALICE, "e")],
    )
    .await?;
    run(&service, session_id, BOB, Command::AdvanceStage).await?;

    // Closeness is skipped by the operator for the demo.
    service
        .operator()
        .jump_to_stage(session_id, Stage::MainQuestion)
        .await?;

    run(&service, session_id, ALICE, Command::AskQuestion {
        category: Some(QuestionCategory::InnerWorld),
    })
    .await?;
    run(&service, session_id, ALICE, Command::RequestEarlyReveal).await?;
    run(&service, session_id, BOB, Command::RespondEarlyReveal { accept: true }).await?;
    run(&service, session_id, BOB, Command::SubmitAnswer { answer: Answer::Yes }).await?;
    run(&service, session_id, ALICE, Command::SubmitAnswer { answer: Answer::Yes }).await?;
    run(&service, session_id, ALICE, Command::SubmitContactInfo {
        contact: "@alice".to_string(),
    })
    .await?;
    run(&service, session_id, BOB, Command::SubmitContactInfo {
        contact: "+1 555 0100".to_string(),
    })
    .await?;

    for _ in 0..3 {
        run(&service, session_id, ALICE, Command::AskDeepQuestion).await?;
    }

    let snapshot = service.snapshot(session_id).await?;
    println!(
        "Session {} is in {} ({}), {} prompts issued",
        snapshot.id(),
        snapshot.stage(),
        snapshot.stage().title(),
        snapshot.prompts().len()
    );

    run(&service, session_id, BOB, Command::DeleteSession {
        feedback: Some("It was nice meeting you".to_string()),
    })
    .await?;
    run(&service, session_id, ALICE, Command::SendMessage {
        text: "Still there?".to_string(),
        reply_to: None,
    })
    .await?;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    println!(
        "{} notifications kept for {ALICE}",
        history.history_for(ALICE).len()
    );
    service.shutdown().await;
    Ok(())
}
