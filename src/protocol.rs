//! Command grammar — one client line in, one structured `Command` out.
//!
//! DESIGN
//! ======
//! The session reads a line, hands it here, and gets back either a
//! `Command` or a `ParseError` describing the expected grammar. Parsing is
//! total: it never touches board state, so a malformed line can never leave
//! a half-applied mutation behind.
//!
//! GET filters are parsed by a small cursor-based tokenizer into a
//! `NoteQuery` (filter name → value) rather than by index arithmetic over
//! the raw string. Filters may appear in any order and any subset;
//! `refersTo=` swallows the rest of the line as free text; a duplicated
//! filter silently overwrites the earlier one (last one wins).

use crate::state::NoteQuery;

// =============================================================================
// COMMANDS
// =============================================================================

/// One parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Post { x: u32, y: u32, color: String, message: String },
    Get(NoteQuery),
    GetPins,
    Pin { x: u32, y: u32 },
    Unpin { x: u32, y: u32 },
    Shake,
    Clear,
    Disconnect,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Protocol-level malformed input. Always reported on the wire as
/// `ERROR INVALID_FORMAT <detail>`; the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unrecognized command: {0}")]
    UnknownCommand(String),
    #[error("Expected format: {0}")]
    Usage(&'static str),
    #[error("Coordinates must be non-negative integers")]
    BadCoordinate,
    #[error("{0} takes no arguments")]
    UnexpectedArgs(&'static str),
    #[error("Invalid GET filter: {0}")]
    UnknownFilter(String),
    #[error("Expected contains=<x> <y>")]
    BadContains,
}

impl ParseError {
    /// Wire code for every parse failure.
    #[must_use]
    pub fn code(&self) -> &'static str {
        "INVALID_FORMAT"
    }
}

// =============================================================================
// LINE PARSER
// =============================================================================

/// Parse one trimmed, non-empty input line. The command keyword is
/// case-insensitive; argument text keeps its original case.
///
/// # Errors
///
/// `ParseError` describing the expected grammar for the offending command.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (line, ""),
    };

    match keyword.to_ascii_uppercase().as_str() {
        "POST" => parse_post(rest),
        "GET" => parse_get(rest),
        "PIN" => parse_point(rest, "PIN <x> <y>").map(|(x, y)| Command::Pin { x, y }),
        "UNPIN" => parse_point(rest, "UNPIN <x> <y>").map(|(x, y)| Command::Unpin { x, y }),
        "SHAKE" => parse_bare(rest, "SHAKE").map(|()| Command::Shake),
        "CLEAR" => parse_bare(rest, "CLEAR").map(|()| Command::Clear),
        "DISCONNECT" => Ok(Command::Disconnect),
        _ => Err(ParseError::UnknownCommand(keyword.to_owned())),
    }
}

fn parse_coordinate(token: &str) -> Result<u32, ParseError> {
    // u32 rejects signs, so negative coordinates fail here too.
    token.parse::<u32>().map_err(|_| ParseError::BadCoordinate)
}

/// Peel one whitespace-delimited token off the front, returning it and the
/// untrimmed remainder. `None` when nothing but whitespace is left.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(end) => Some((&s[..end], &s[end..])),
        None => Some((s, "")),
    }
}

fn parse_post(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "POST <x> <y> <colour> <message>";
    let (x, rest) = next_token(rest).ok_or(ParseError::Usage(USAGE))?;
    let (y, rest) = next_token(rest).ok_or(ParseError::Usage(USAGE))?;
    let (color, rest) = next_token(rest).ok_or(ParseError::Usage(USAGE))?;
    let message = rest.trim();
    if message.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::Post {
        x: parse_coordinate(x)?,
        y: parse_coordinate(y)?,
        color: color.to_owned(),
        message: message.to_owned(),
    })
}

fn parse_point(rest: &str, usage: &'static str) -> Result<(u32, u32), ParseError> {
    let mut parts = rest.split_whitespace();
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::Usage(usage));
    };
    Ok((parse_coordinate(x)?, parse_coordinate(y)?))
}

fn parse_bare(rest: &str, keyword: &'static str) -> Result<(), ParseError> {
    if rest.is_empty() { Ok(()) } else { Err(ParseError::UnexpectedArgs(keyword)) }
}

// =============================================================================
// GET FILTERS
// =============================================================================

fn parse_get(rest: &str) -> Result<Command, ParseError> {
    if rest.eq_ignore_ascii_case("PINS") {
        return Ok(Command::GetPins);
    }
    parse_filters(rest).map(Command::Get)
}

/// Tokenize `[color=<c>] [contains=<x> <y>] [refersTo=<text>]` into a
/// `NoteQuery`. Cursor-based so `refersTo=` can take the untouched rest of
/// the line.
fn parse_filters(rest: &str) -> Result<NoteQuery, ParseError> {
    let mut query = NoteQuery::default();
    let mut cursor = rest;

    loop {
        cursor = cursor.trim_start();
        if cursor.is_empty() {
            return Ok(query);
        }

        let token_end = cursor.find(char::is_whitespace).unwrap_or(cursor.len());
        let token = &cursor[..token_end];
        let Some((key, value)) = token.split_once('=') else {
            return Err(ParseError::UnknownFilter(cursor.to_owned()));
        };

        match key.to_ascii_lowercase().as_str() {
            // British spelling accepted as an alias.
            "color" | "colour" => {
                query.color = Some(value.to_owned());
                cursor = &cursor[token_end..];
            }
            "contains" => {
                let (point, remaining) = parse_contains(value, &cursor[token_end..])?;
                query.contains = Some(point);
                cursor = remaining;
            }
            "refersto" => {
                // Everything after the '=' is the substring, spaces included.
                let after_eq = token.len() - value.len();
                query.refers_to = Some(cursor[after_eq..].trim().to_owned());
                return Ok(query);
            }
            _ => return Err(ParseError::UnknownFilter(cursor.to_owned())),
        }
    }
}

/// Parse the two integers of `contains=<x> <y>`. The x may be attached to
/// the '=' or follow it; the y is always the next whitespace token.
fn parse_contains<'a>(attached: &str, mut remaining: &'a str) -> Result<((u32, u32), &'a str), ParseError> {
    let x_token = if attached.is_empty() {
        let (token, rest) = next_token(remaining).ok_or(ParseError::BadContains)?;
        remaining = rest;
        token
    } else {
        attached
    };
    let (y_token, rest) = next_token(remaining).ok_or(ParseError::BadContains)?;

    let x = x_token.parse::<u32>().map_err(|_| ParseError::BadContains)?;
    let y = y_token.parse::<u32>().map_err(|_| ParseError::BadContains)?;
    Ok(((x, y), rest))
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
