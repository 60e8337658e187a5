//! Shared board state.
//!
//! DESIGN
//! ======
//! One `Board` instance exists per server process and is shared by every
//! connected session via `Arc`. Dimensions and the valid-color set are fixed
//! at construction; the note and pin collections live behind a single
//! `tokio::sync::Mutex` so that every operation — reads included — is
//! serialized with every other. Each public method takes the lock for its
//! whole check-then-act span, so a precondition (bounds, color, overlap, pin
//! existence) can never be interleaved with a concurrent mutation.
//!
//! Board-semantic failures are ordinary `BoardError` values the session
//! layer translates into wire error codes. Nothing here panics.

use std::collections::BTreeSet;

use tokio::sync::Mutex;

// =============================================================================
// NOTE
// =============================================================================

/// One note on the board. Position is the upper-left corner; width and
/// height are board-wide constants, not per-note attributes. Immutable once
/// posted — notes are only ever removed, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub message: String,
}

impl Note {
    /// Whether the point `(px, py)` lies inside this note's rectangle.
    /// Half-open on both axes: the right and bottom edges are excluded.
    #[must_use]
    pub fn contains(&self, px: u32, py: u32, note_w: u32, note_h: u32) -> bool {
        px >= self.x
            && u64::from(px) < u64::from(self.x) + u64::from(note_w)
            && py >= self.y
            && u64::from(py) < u64::from(self.y) + u64::from(note_h)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Violated precondition of a board operation. Each variant maps to one
/// stable wire error code; the `Display` text is the human-readable detail
/// sent after the code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Note at ({x}, {y}) exceeds board dimensions ({board_w}x{board_h})")]
    OutOfBounds { x: u32, y: u32, board_w: u32, board_h: u32 },
    #[error("The colour \"{color}\" is not supported. Supported colours: {supported:?}")]
    ColourNotSupported { color: String, supported: Vec<String> },
    #[error("A note already exists at position ({x}, {y})")]
    CompleteOverlap { x: u32, y: u32 },
    #[error("No note contains the coordinate ({x}, {y})")]
    NoNoteAtCoordinate { x: u32, y: u32 },
    #[error("No pin exists at coordinate ({x}, {y})")]
    PinNotFound { x: u32, y: u32 },
}

impl BoardError {
    /// Grepable wire code, stable across releases.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "OUT_OF_BOUNDS",
            Self::ColourNotSupported { .. } => "COLOUR_NOT_SUPPORTED",
            Self::CompleteOverlap { .. } => "COMPLETE_OVERLAP",
            Self::NoNoteAtCoordinate { .. } => "NO_NOTE_AT_COORDINATE",
            Self::PinNotFound { .. } => "PIN_NOT_FOUND",
        }
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// Structured filter set for note queries. `None` fields are wildcards;
/// present fields are ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteQuery {
    /// Exact color match.
    pub color: Option<String>,
    /// Note rectangle must contain this point.
    pub contains: Option<(u32, u32)>,
    /// Message must contain this substring (case-sensitive).
    pub refers_to: Option<String>,
}

// =============================================================================
// BOARD
// =============================================================================

/// Mutable half of the board: notes in insertion order, pins as a multiset
/// of points (repeated pinning at one coordinate adds distinct entries).
#[derive(Debug, Default)]
struct BoardInner {
    notes: Vec<Note>,
    pins: Vec<(u32, u32)>,
}

/// The shared canvas. Constructed once at startup from already-validated
/// configuration; lives for the process lifetime.
#[derive(Debug)]
pub struct Board {
    board_w: u32,
    board_h: u32,
    note_w: u32,
    note_h: u32,
    /// Ordered so the handshake COLORS line is deterministic.
    colors: BTreeSet<String>,
    inner: Mutex<BoardInner>,
}

impl Board {
    /// Create an empty board. Caller guarantees positive dimensions,
    /// note dimensions within board dimensions, and a non-empty color set
    /// (enforced by `config::ServerConfig`).
    #[must_use]
    pub fn new(board_w: u32, board_h: u32, note_w: u32, note_h: u32, colors: BTreeSet<String>) -> Self {
        Self { board_w, board_h, note_w, note_h, colors, inner: Mutex::new(BoardInner::default()) }
    }

    #[must_use]
    pub fn board_w(&self) -> u32 {
        self.board_w
    }

    #[must_use]
    pub fn board_h(&self) -> u32 {
        self.board_h
    }

    #[must_use]
    pub fn note_w(&self) -> u32 {
        self.note_w
    }

    #[must_use]
    pub fn note_h(&self) -> u32 {
        self.note_h
    }

    /// Defensive copy of the valid-color set, in ascending order.
    #[must_use]
    pub fn colors(&self) -> Vec<String> {
        self.colors.iter().cloned().collect()
    }

    /// Whether a note anchored at `(x, y)` lies fully within the board.
    fn in_bounds(&self, x: u32, y: u32) -> bool {
        u64::from(x) + u64::from(self.note_w) <= u64::from(self.board_w)
            && u64::from(y) + u64::from(self.note_h) <= u64::from(self.board_h)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Validate and append a note. Checks run in a fixed order — bounds,
    /// then color, then exact-coordinate duplicate — and the first failing
    /// check wins. The whole check-then-insert runs under one lock hold.
    ///
    /// # Errors
    ///
    /// `OutOfBounds`, `ColourNotSupported`, or `CompleteOverlap`.
    pub async fn post(&self, x: u32, y: u32, color: &str, message: &str) -> Result<(), BoardError> {
        let mut inner = self.inner.lock().await;
        if !self.in_bounds(x, y) {
            return Err(BoardError::OutOfBounds { x, y, board_w: self.board_w, board_h: self.board_h });
        }
        if !self.colors.contains(color) {
            return Err(BoardError::ColourNotSupported {
                color: color.to_owned(),
                supported: self.colors(),
            });
        }
        if inner.notes.iter().any(|n| n.x == x && n.y == y) {
            return Err(BoardError::CompleteOverlap { x, y });
        }
        inner
            .notes
            .push(Note { x, y, color: color.to_owned(), message: message.to_owned() });
        Ok(())
    }

    /// Add one pin at `(x, y)`. Each successful call adds a distinct pin,
    /// even at a coordinate that already carries one.
    ///
    /// # Errors
    ///
    /// `NoNoteAtCoordinate` if no note's rectangle contains the point.
    pub async fn pin(&self, x: u32, y: u32) -> Result<(), BoardError> {
        let mut inner = self.inner.lock().await;
        let covered = inner.notes.iter().any(|n| n.contains(x, y, self.note_w, self.note_h));
        if !covered {
            return Err(BoardError::NoNoteAtCoordinate { x, y });
        }
        inner.pins.push((x, y));
        Ok(())
    }

    /// Remove exactly one pin whose coordinate equals `(x, y)`.
    ///
    /// # Errors
    ///
    /// `PinNotFound` if no pin exists at that coordinate.
    pub async fn unpin(&self, x: u32, y: u32) -> Result<(), BoardError> {
        let mut inner = self.inner.lock().await;
        let Some(idx) = inner.pins.iter().position(|&p| p == (x, y)) else {
            return Err(BoardError::PinNotFound { x, y });
        };
        inner.pins.remove(idx);
        Ok(())
    }

    /// Remove every unpinned note, then every stranded pin. Two passes in a
    /// fixed order: notes are filtered against the pre-shake pin set, then
    /// pins are filtered against the post-shake note set.
    pub async fn shake(&self) {
        let mut inner = self.inner.lock().await;
        let BoardInner { notes, pins } = &mut *inner;
        notes.retain(|n| pins.iter().any(|&(px, py)| n.contains(px, py, self.note_w, self.note_h)));
        pins.retain(|&(px, py)| notes.iter().any(|n| n.contains(px, py, self.note_w, self.note_h)));
    }

    /// Empty both notes and pins.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.notes.clear();
        inner.pins.clear();
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Notes matching every present filter, in insertion order.
    pub async fn notes(&self, query: &NoteQuery) -> Vec<Note> {
        let inner = self.inner.lock().await;
        inner
            .notes
            .iter()
            .filter(|n| {
                query.color.as_ref().is_none_or(|c| &n.color == c)
                    && query
                        .contains
                        .is_none_or(|(px, py)| n.contains(px, py, self.note_w, self.note_h))
                    && query.refers_to.as_ref().is_none_or(|s| n.message.contains(s.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Snapshot of all current pins.
    pub async fn pins(&self) -> Vec<(u32, u32)> {
        self.inner.lock().await.pins.clone()
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
