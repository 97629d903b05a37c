//! Error types for STEP file operations.

use thiserror::Error;

use crate::model::EntityKey;

/// Errors that can occur during STEP file operations.
#[derive(Error, Debug)]
pub enum StepError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lexer error: unexpected character or malformed token.
    #[error("Lexer error at line {line}, column {col}: {message}")]
    Lexer {
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
        /// Error message.
        message: String,
    },

    /// Parser error: unexpected token or malformed structure.
    #[error("Parser error{}: {message}", entity_id.map(|id| format!(" at entity #{}", id)).unwrap_or_default())]
    Parser {
        /// Entity ID where the error occurred, if known.
        entity_id: Option<u64>,
        /// Error message.
        message: String,
    },

    /// Malformed escape directive inside a string literal.
    #[error("Invalid string escape: {0}")]
    Escape(String),

    /// A `#id` reference with no matching entity in the DATA section.
    #[error("Missing entity reference: #{0}")]
    MissingEntity(u64),

    /// An entity key passed to the compiler is not present in the store.
    #[error("Entity key {0:?} not present in the store")]
    UnknownEntityKey(EntityKey),

    /// A reference cycle was detected while compiling the entity graph.
    ///
    /// The chain lists the type names of the entities on the cycle, ending
    /// with a repeat of the entity where the cycle closes.
    #[error("Circular entity reference: {}", chain.join(" -> "))]
    CircularReference {
        /// Type names of the entities forming the cycle.
        chain: Vec<String>,
    },
}

impl StepError {
    /// Create a lexer error.
    pub fn lexer(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            col,
            message: message.into(),
        }
    }

    /// Create a parser error.
    pub fn parser(entity_id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Parser {
            entity_id,
            message: message.into(),
        }
    }
}
