//! Interactive terminal client for the OpenAI Realtime API.
//!
//! This binary:
//! 1. Parses flags and loads configuration from the environment.
//! 2. Opens a realtime session and waits for the server to create it.
//! 3. Sends each stdin line as a user message and streams assistant text to
//!    stdout until Ctrl+C or the server closes the connection.

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use openai_realtime::{Conversation, RealtimeConfig};
use openai_realtime_types::Role;
use realtime_cli::{args::Args, render::TranscriptPrinter};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Resolves on `Ctrl+C`. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C. Closing session...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Initialize Logging ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 2. Load Configuration ---
    let mut config = RealtimeConfig::from_env().context("Failed to load configuration")?;
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }

    // --- 3. Connect ---
    let conversation = Conversation::connect(&config)
        .await
        .context("Failed to connect to the realtime endpoint")?;
    conversation
        .wait_connected()
        .await
        .context("Connection closed before the session was created")?;
    info!(model = %config.model, "Session established.");

    if args.changes_session() {
        conversation
            .update_session(|session| args.apply(session))
            .await
            .context("Failed to update session")?;
    }

    // --- 4. Stream Output ---
    let printer = tokio::spawn({
        let mut updates = conversation.subscribe();
        async move {
            let mut transcript = TranscriptPrinter::default();
            while updates.changed().await.is_ok() {
                let chunk = transcript.next_chunk(&updates.borrow_and_update());
                if !chunk.is_empty() {
                    print!("{chunk}");
                    let _ = std::io::stdout().flush();
                }
            }
        }
    });

    let error_log = tokio::spawn({
        let mut errors = conversation.errors();
        async move {
            while let Some(error) = errors.next().await {
                warn!(%error, "Server reported an error.");
            }
        }
    });

    // --- 5. Forward Input ---
    let response = args.response_config();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut state = conversation.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = state.wait_for(|s| !s.connected) => {
                warn!("Connection closed by the server.");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => conversation
                        .send_text(Role::User, line, Some(response.clone()))
                        .await
                        .context("Failed to send message")?,
                    // Keep printing replies until Ctrl+C.
                    None => stdin_open = false,
                }
            }
        }
    }

    conversation.close().await;
    let _ = printer.await;
    let _ = error_log.await;
    println!();
    info!("Session closed.");
    Ok(())
}
