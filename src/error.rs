use thiserror::Error;

use crate::position::Position;

/// Errors produced while reading Plorth source into tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input does not match the grammar
    #[error("{position}: syntax error: {message}")]
    Syntax { position: Position, message: String },

    /// A `\u` escape does not name a character
    /// (lone or mismatched UTF-16 surrogate)
    #[error("{position}: invalid escape sequence `{sequence}`")]
    InvalidEscape { position: Position, sequence: String },

    /// Arrays, objects and quotes are nested deeper than allowed
    #[error("{position}: nesting exceeds maximum depth of {limit}")]
    TooDeep { position: Position, limit: usize },
}

impl Error {
    /// Where in the source the error was detected
    pub fn position(&self) -> &Position {
        match self {
            Self::Syntax { position, .. }
            | Self::InvalidEscape { position, .. }
            | Self::TooDeep { position, .. } => position,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
