//! Listener — accepts connections and spawns one session task per client.
//!
//! DESIGN
//! ======
//! The accept loop runs until the process exits. Each accepted connection
//! gets its own tokio task running a `Session` against the one shared
//! `Board`; a failure in one session never touches the others. Failing to
//! accept an individual connection is logged and skipped — only failing to
//! bind the port (handled in `main`) is fatal.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::session::Session;
use crate::state::Board;

/// Accept connections forever, one session task per client.
pub async fn run(listener: TcpListener, board: Arc<Board>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let board = Arc::clone(&board);
                tokio::spawn(async move {
                    let (read_half, write_half) = stream.into_split();
                    let mut session = Session::new(BufReader::new(read_half), write_half, board);
                    let session_id = session.session_id();
                    info!(%peer, %session_id, "client connected");
                    match session.run().await {
                        Ok(()) => info!(%peer, %session_id, "client disconnected"),
                        Err(e) => warn!(%peer, %session_id, error = %e, "session ended with I/O error"),
                    }
                    // Both stream halves drop here, closing the connection
                    // on every exit path.
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
            }
        }
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
