mod common;
mod config;
mod network;
mod session;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use network::{ChatClient, WsConnector};
use session::{ChatSessionStateMachine, ConnectionSession};
use tokio::sync::mpsc;
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "gateway_chat",
    version,
    about = "Visitor-to-business chat over a realtime gateway"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Gateway WebSocket URL (overrides config file and CHAT_GATEWAY_URL)
    #[arg(long, value_name = "URL")]
    gateway_url: Option<String>,
    /// Timeout for gateway round trips, in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
    /// Write the resolved configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config).with_overrides(
        std::env::var(config::GATEWAY_URL_ENV).ok(),
        cli.gateway_url.clone(),
        cli.timeout_secs,
    );

    if cli.save_config {
        match config::save_config(&cli.config, &app_config) {
            Ok(()) => log::info!("Saved configuration to {}", cli.config),
            Err(err) => log::error!("Failed to write config {}: {err}", cli.config),
        }
    }

    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Chat client
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Chat client -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    // 2. Khởi chạy chat client (Chạy ngầm)
    let session = ConnectionSession::new(
        Arc::new(WsConnector),
        app_config.gateway_url.clone(),
        app_config.request_timeout(),
    );
    let client = ChatClient::new(ChatSessionStateMachine::new(session), event_tx, cmd_rx);
    let client_task = tokio::spawn(client.run());

    // 3. Khởi chạy UI (Chạy trên Main Thread)
    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);
    let mut cmd_tx = Some(cmd_tx);
    let gateway_url = app_config.gateway_url.clone();

    let result = eframe::run_native(
        "Gateway Chat",
        options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .expect("ChatApp should only be initialized once");
            let command_sender = cmd_tx
                .take()
                .expect("ChatApp should only be initialized once");

            log::info!("Chat UI started against {gateway_url}");

            Ok(Box::new(ChatApp::new(cc, command_sender, event_receiver)))
        }),
    );

    // Đóng UI = unmount: client tự đóng phiên khi kênh lệnh bị drop.
    if tokio::time::timeout(Duration::from_secs(2), client_task)
        .await
        .is_err()
    {
        log::warn!("Chat client did not shut down in time");
    }

    result
}
