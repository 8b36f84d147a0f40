//! Lists the files on a device behind a serial-over-TCP bridge.
//!
//! Demonstrates:
//! - Opening a session
//! - Running a file operation
//! - Cutting the payload out of the output with the markers
//!
//! Usage:
//!   cargo run --example list_files -- localhost:4000
//!   cargo run --example list_files -- localhost:4000 --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result, bail};
use board_repl::{BEGIN_MARKER, END_MARKER, Session, SessionEvent, SessionOptions, TcpConnector};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// How long to collect output after the script is sent.
const SETTLE_TIME: Duration = Duration::from_secs(2);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let Some(address) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: list_files <host:port> [--debug]");
    };

    let filter = if debug { "board_repl=debug" } else { "board_repl=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let session = Session::new(SessionOptions::default())?;
    let mut events = session.subscribe();

    session
        .open(&TcpConnector, address)
        .await
        .with_context(|| format!("opening {address}"))?;

    session.list_files().await?.wait().await?;

    let collect = async {
        while let Ok(event) = events.recv().await {
            if let SessionEvent::Output { text } = event {
                print!("{text}");
            }
        }
    };
    let _ = tokio::time::timeout(SETTLE_TIME, collect).await;

    let output = session.scratch();
    match (output.find(BEGIN_MARKER), output.rfind(END_MARKER)) {
        (Some(start), Some(end)) if start < end => {
            println!("\nFiles: {}", output[start + BEGIN_MARKER.len()..end].trim());
        }
        _ => println!("\nNo listing found in output"),
    }

    session.close().await?;
    Ok(())
}
