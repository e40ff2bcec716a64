//! Telemetry uplink against a local collector.
//!
//! Demonstrates:
//! - Buffering while the collector is unreachable
//! - Delivery in order once the socket opens
//! - Periodic heartbeats
//! - Automatic reconnect after the collector drops the connection
//!
//! Usage:
//!   cargo run --example telemetry_uplink
//!   cargo run --example telemetry_uplink -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use telemetry_uplink::{ResilientSocketClient, Result};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Telemetry Uplink ===\n");

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    tokio::spawn(run_collector(listener));

    let client = ResilientSocketClient::builder()
        .url(format!("ws://127.0.0.1:{port}"))
        .reconnect_delay(Duration::from_secs(1))
        .heartbeat_interval(Duration::from_secs(2))
        .build()?;

    println!("[1] Sending before connect (buffered)");
    for seq in 0..3 {
        let sent = client.send(&json!({ "event": "rtp", "seq": seq }));
        println!("    send seq={seq} -> {sent}");
    }

    let _heartbeat = client.start_heartbeat("demo@example.com")?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("\n[2] State: {} (buffered: {})", client.state(), client.buffered_len());

    println!("\n[3] Sending while open");
    println!("    send -> {}", client.send(&json!({ "event": "answered" })));

    println!("\n[4] Waiting for the collector to drop us and the client to come back...");
    tokio::time::sleep(Duration::from_secs(6)).await;
    println!("    State: {} (connected: {})", client.state(), client.is_connected());

    client.disconnect();
    println!("\n[5] Disconnected: {}", client.state());

    Ok(())
}

// ============================================================================
// Collector
// ============================================================================

/// Prints every frame; drops the first session abruptly after three seconds.
async fn run_collector(listener: TcpListener) {
    let mut session = 0;

    while let Ok((socket, _)) = listener.accept().await {
        session += 1;
        let Ok(mut ws) = accept_async(socket).await else {
            continue;
        };

        let lifetime = if session == 1 {
            Duration::from_secs(3)
        } else {
            Duration::from_secs(3600)
        };

        tokio::spawn(async move {
            let _ = tokio::time::timeout(lifetime, async {
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        println!("    [collector #{session}] {}", text.as_str());
                    }
                }
            })
            .await;
            println!("    [collector #{session}] dropping connection");
        });
    }
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "telemetry_uplink=debug"
    } else {
        "telemetry_uplink=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
