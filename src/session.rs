//! Per-connection protocol session.
//!
//! DESIGN
//! ======
//! One `Session` runs per accepted connection, on its own task, holding the
//! connection's read and write halves and a shared handle to the one
//! `Board`. The session is generic over `AsyncBufRead`/`AsyncWrite` so
//! tests drive it over `tokio::io::duplex` pipes instead of sockets.
//!
//! LIFECYCLE
//! =========
//! 1. Init → send the handshake block (BOARD / NOTE / COLORS / OK)
//! 2. Active → read line, parse, call the board, write the response
//! 3. Closed → on DISCONNECT, EOF, or I/O failure
//!
//! Malformed input never closes the session: every parse failure is caught
//! per command and answered with `ERROR INVALID_FORMAT <detail>`. Only a
//! transport failure ends the loop early, and the connection handle is
//! released when the session (and its task) drops.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{Command, ParseError, parse_command};
use crate::state::{Board, BoardError, Note};

// =============================================================================
// STATES
// =============================================================================

/// Protocol position of the session. Init lasts only until the handshake
/// has been written; Closed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Active,
    Closed,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct Session<R, W> {
    reader: R,
    writer: W,
    board: Arc<Board>,
    /// Correlation ID for log lines; carries no protocol meaning.
    session_id: Uuid,
    state: State,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, board: Arc<Board>) -> Self {
        Self { reader, writer, board, session_id: Uuid::new_v4(), state: State::Init }
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Drive the session to completion: handshake, then the command loop
    /// until DISCONNECT, EOF, or I/O failure.
    ///
    /// # Errors
    ///
    /// Returns the transport error that ended the session, if any. Parse
    /// and board-semantic failures are answered on the wire, never here.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.send_handshake().await?;
        self.state = State::Active;

        let mut line = String::new();
        while self.state == State::Active {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                debug!(session_id = %self.session_id, "client closed the connection");
                break;
            }
            let trimmed = line.trim();
            // Blank lines are ignored without a response.
            if trimmed.is_empty() {
                continue;
            }
            self.dispatch(trimmed).await?;
        }

        self.state = State::Closed;
        Ok(())
    }

    /// Initialization block letting the client self-configure: board and
    /// note dimensions plus the valid colors, terminated by `OK`.
    async fn send_handshake(&mut self) -> std::io::Result<()> {
        let mut block = format!(
            "BOARD {} {}\nNOTE {} {}\nCOLORS",
            self.board.board_w(),
            self.board.board_h(),
            self.board.note_w(),
            self.board.note_h(),
        );
        for color in self.board.colors() {
            block.push(' ');
            block.push_str(&color);
        }
        block.push_str("\nOK\n");
        self.writer.write_all(block.as_bytes()).await?;
        self.writer.flush().await
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    async fn dispatch(&mut self, line: &str) -> std::io::Result<()> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => return self.send_parse_error(&e).await,
        };

        match command {
            Command::Post { x, y, color, message } => {
                let result = self.board.post(x, y, &color, &message).await;
                self.send_board_result(result).await
            }
            Command::Get(query) => {
                let notes = self.board.notes(&query).await;
                self.send_notes(&notes).await
            }
            Command::GetPins => {
                let pins = self.board.pins().await;
                self.send_pins(&pins).await
            }
            Command::Pin { x, y } => {
                let result = self.board.pin(x, y).await;
                self.send_board_result(result).await
            }
            Command::Unpin { x, y } => {
                let result = self.board.unpin(x, y).await;
                self.send_board_result(result).await
            }
            Command::Shake => {
                self.board.shake().await;
                self.send_ok().await
            }
            Command::Clear => {
                self.board.clear().await;
                self.send_ok().await
            }
            Command::Disconnect => {
                self.state = State::Closed;
                self.send_line("OK bye").await
            }
        }
    }

    // =========================================================================
    // RESPONSES
    // =========================================================================

    async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    async fn send_ok(&mut self) -> std::io::Result<()> {
        self.send_line("OK").await
    }

    async fn send_board_result(&mut self, result: Result<(), BoardError>) -> std::io::Result<()> {
        match result {
            Ok(()) => self.send_ok().await,
            Err(e) => {
                debug!(session_id = %self.session_id, code = e.code(), "command rejected");
                self.send_line(&format!("ERROR {} {e}", e.code())).await
            }
        }
    }

    async fn send_parse_error(&mut self, e: &ParseError) -> std::io::Result<()> {
        debug!(session_id = %self.session_id, code = e.code(), "malformed command");
        self.send_line(&format!("ERROR {} {e}", e.code())).await
    }

    /// `NOTE <x> <y> <color> <message>` per match, then `OK <count>`. A
    /// client reads lines until one starts with the terminal marker.
    async fn send_notes(&mut self, notes: &[Note]) -> std::io::Result<()> {
        let mut reply = String::new();
        for note in notes {
            reply.push_str(&format!("NOTE {} {} {} {}\n", note.x, note.y, note.color, note.message));
        }
        reply.push_str(&format!("OK {}\n", notes.len()));
        self.writer.write_all(reply.as_bytes()).await?;
        self.writer.flush().await
    }

    /// `PIN <x> <y>` per pin, then `OK <count>`.
    async fn send_pins(&mut self, pins: &[(u32, u32)]) -> std::io::Result<()> {
        let mut reply = String::new();
        for (x, y) in pins {
            reply.push_str(&format!("PIN {x} {y}\n"));
        }
        reply.push_str(&format!("OK {}\n", pins.len()));
        self.writer.write_all(reply.as_bytes()).await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
