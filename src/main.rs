mod config;
mod protocol;
mod server;
mod session;
mod state;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::state::Board;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{}", config::USAGE);
            std::process::exit(1);
        }
    };

    let board = Arc::new(Board::new(
        config.board_w,
        config.board_h,
        config.note_w,
        config.note_h,
        config.colors.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(
        port = config.port,
        board_w = config.board_w,
        board_h = config.board_h,
        note_w = config.note_w,
        note_h = config.note_h,
        colors = ?config.colors,
        "pinboard listening"
    );

    server::run(listener, board).await;
}
