//! Server startup configuration.
//!
//! Parsed from argv:
//! `pinboard <port> <board_width> <board_height> <note_width> <note_height> <colour>...`
//!
//! The core consumes these as already-validated values — any violation is a
//! startup-time fatal error, reported with a usage message before the
//! listener ever binds.

use std::collections::BTreeSet;

/// Usage string printed on any argv error.
pub const USAGE: &str =
    "Usage: pinboard <port> <board_width> <board_height> <note_width> <note_height> <colour1> [colour2 ...]";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("expected at least 6 arguments")]
    MissingArgs,
    #[error("invalid {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("port must be between 1 and 65535")]
    BadPort,
    #[error("dimensions must be positive")]
    NonPositiveDimension,
    #[error("note dimensions cannot exceed board dimensions")]
    NoteLargerThanBoard,
    #[error("at least one colour is required")]
    NoColors,
}

/// Validated startup parameters for one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub board_w: u32,
    pub board_h: u32,
    pub note_w: u32,
    pub note_h: u32,
    pub colors: BTreeSet<String>,
}

impl ServerConfig {
    /// Parse and validate argv (program name already stripped).
    ///
    /// # Errors
    ///
    /// `ConfigError` naming the first violated constraint.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().trim().to_owned()).collect();
        if args.len() < 6 {
            return Err(ConfigError::MissingArgs);
        }

        let port = parse_number(&args[0], "port")?;
        let board_w = parse_number(&args[1], "board_width")?;
        let board_h = parse_number(&args[2], "board_height")?;
        let note_w = parse_number(&args[3], "note_width")?;
        let note_h = parse_number(&args[4], "note_height")?;

        if port == 0 || port > 65535 {
            return Err(ConfigError::BadPort);
        }
        let port = u16::try_from(port).map_err(|_| ConfigError::BadPort)?;

        if board_w == 0 || board_h == 0 || note_w == 0 || note_h == 0 {
            return Err(ConfigError::NonPositiveDimension);
        }
        if note_w > board_w || note_h > board_h {
            return Err(ConfigError::NoteLargerThanBoard);
        }

        let colors: BTreeSet<String> = args[5..].iter().filter(|c| !c.is_empty()).cloned().collect();
        if colors.is_empty() {
            return Err(ConfigError::NoColors);
        }

        Ok(Self { port, board_w, board_h, note_w, note_h, colors })
    }
}

fn parse_number(value: &str, name: &'static str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidNumber { name, value: value.to_owned() })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
