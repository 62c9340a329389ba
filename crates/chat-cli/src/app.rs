//! Interactive session loop

use std::sync::Arc;

use chat_common::{AppConfig, AppResult};
use chat_core::{Message, MessageId, Session};
use chat_service::{ChatClient, ServiceContext, ServiceError, SessionScope};
use chat_store::{MemoryAuth, MemoryBackend};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::Command;
use crate::render;

/// Sign in the configured identity and run until `/quit`, end of input or
/// Ctrl-C
pub async fn run(config: AppConfig) -> AppResult<()> {
    let identity = config.require_identity()?;
    let mut session = Session::new(identity.user_id.as_str(), identity.email.as_str());
    if let Some(url) = &identity.avatar_url {
        session = session.with_avatar(url.as_str());
    }

    let backend = MemoryBackend::new();
    let auth = Arc::new(MemoryAuth::new(session));
    let ctx = ServiceContext::builder()
        .presence_store(backend.presence_store())
        .message_store(backend.message_store())
        .config(&config)
        .build()?;
    drive(Arc::new(ChatClient::new(ctx, auth))).await
}

/// Watch auth state in the background while the interactive session runs
async fn drive(client: Arc<ChatClient>) -> AppResult<()> {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .run(async {
                    let _ = stop_rx.await;
                })
                .await;
        })
    };

    // The watcher is stopped on every path, including a failed sign-in or
    // sign-out
    let result = chat(&client).await;
    let _ = stop_tx.send(());
    if let Err(e) = runner.await {
        warn!(error = %e, "Auth watcher ended abnormally");
    }

    info!("Chat client stopped");
    result
}

async fn chat(client: &ChatClient) -> AppResult<()> {
    let session = client.sign_in().await?;
    println!("Signed in as {}. Type /help for commands.", session.email);

    let scope = client.active_scope()?;
    let printer = spawn_printer(&scope);
    drop(scope);

    let result = input_loop(client).await;

    printer.abort();
    let signed_out = client.sign_out().await;
    result?;
    Ok(signed_out?)
}

async fn input_loop(client: &ChatClient) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                return Ok(());
            }
        };
        let Some(line) = line else {
            debug!("End of input");
            return Ok(());
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("! {e}");
                continue;
            }
        };

        match command {
            Command::Send(text) => {
                if let Err(e) = client.send_message(&text).await {
                    println!("! message not sent: {e}");
                }
            }
            Command::Older => match client.load_older().await {
                Ok(page) if page.is_empty() => println!("(no older messages)"),
                Ok(page) => {
                    println!("--- {} older ---", page.messages.len());
                    for message in page.messages.iter().rev() {
                        println!("{}", render::message_line(message));
                    }
                    println!("---");
                }
                Err(ServiceError::LoadInFlight) => println!("(still loading)"),
                Err(e) => println!("! could not load older messages: {e}"),
            },
            Command::Who => println!("{}", render::roster_block(&client.roster()?)),
            Command::Help => println!("{}", Command::HELP),
            Command::Quit => return Ok(()),
        }
    }
}

/// Print new messages and roster changes as they arrive
fn spawn_printer(scope: &SessionScope) -> JoinHandle<()> {
    let mut messages = scope.watch_messages();
    let mut roster = scope.watch_roster();

    tokio::spawn(async move {
        let mut mark: Option<(DateTime<Utc>, MessageId)> = None;
        let mut online: Vec<String> = Vec::new();

        loop {
            tokio::select! {
                changed = messages.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot: Vec<Message> = messages.borrow_and_update().clone();
                    for message in render::newer_than(&snapshot, &mut mark) {
                        println!("{}", render::message_line(message));
                    }
                }
                changed = roster.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let active = render::active_emails(&roster.borrow_and_update());
                    if active != online {
                        println!("(online: {})", active.join(", "));
                        online = active;
                    }
                }
            }
        }
    })
}
