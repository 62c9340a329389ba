//! Stdin command parsing

use chat_common::{AppError, AppResult};

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Post the text as a message
    Send(String),
    /// Load the next page of older messages
    Older,
    /// Print the roster
    Who,
    /// Print the command list
    Help,
    /// Sign out and exit
    Quit,
}

impl Command {
    /// Parse a line. Blank lines yield `None`.
    ///
    /// # Errors
    /// Returns `AppError::InvalidInput` for an unknown `/command`
    pub fn parse(line: &str) -> AppResult<Option<Self>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };

        match rest.trim().to_lowercase().as_str() {
            "older" | "o" => Ok(Some(Self::Older)),
            "who" | "w" => Ok(Some(Self::Who)),
            "help" | "h" | "?" => Ok(Some(Self::Help)),
            "quit" | "q" | "exit" => Ok(Some(Self::Quit)),
            // "//text" sends "/text"
            _ if rest.starts_with('/') => Ok(Some(Self::Send(rest.to_string()))),
            other => Err(AppError::invalid_input(format!("unknown command /{other}"))),
        }
    }

    pub const HELP: &'static str = "\
Commands:
  <text>    send a message
  /older    load older messages
  /who      show who is online
  /help     show this help
  /quit     sign out and exit";
}
