//! ws-relay
//!
//! Accepts WebSocket upgrades and bridges each one to an outbound TCP
//! connection.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  WS RELAY                     │
//!   WebSocket client  │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ──────────────────┼─▶│  net   │──▶│   http   │──▶│   relay    │  │
//!                     │  │listener│   │ websocket│   │  target    │  │
//!                     │  └────────┘   └──────────┘   │  upstream  │──┼──▶ TCP upstream
//!   ◀─────────────────┼──────── binary frames ◀──────│  session   │◀─┼───
//!                     │                               └────────────┘  │
//!                     │  config · observability · lifecycle · admin   │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ws_relay::lifecycle::startup;

#[derive(Debug, Parser)]
#[command(name = "ws-relay", version, about = "WebSocket to TCP relay")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "WS_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    startup::run(cli.config).await?;
    Ok(())
}
