//! Centralised error hierarchy for the **mad interpreter**.
//!
//! Every stage (scanner, parser, runtime) converts its failure modes into one of
//! the variants defined here, so the whole pipeline can share a single
//! `Result<T>` alias and the session can report any failure the same way.
//!
//! The module **does not** print diagnostics itself; see [`crate::session`].

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Where a diagnostic points: a source line plus a short piece of context
/// (the offending token, a variable name, the operands of a failed operator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 1‑based source line.
    pub line: usize,

    /// Free‑form context rendered after the message.
    pub context: String,
}

impl Location {
    pub fn new<S: Into<String>>(line: usize, context: S) -> Self {
        Self {
            line,
            context: context.into(),
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MadError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Scan {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("{}", render(.message, .location))]
    Parse {
        message: String,
        location: Option<Location>,
    },

    /// Runtime evaluation error.
    #[error("{}", render(.message, .location))]
    Runtime {
        message: String,
        location: Option<Location>,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn render(message: &str, location: &Option<Location>) -> String {
    match location {
        Some(Location { line, context }) if context.is_empty() => {
            format!("[line {}] Error: {}", line, message)
        }
        Some(Location { line, context }) => {
            format!("[line {}] Error: {} ({})", line, message, context)
        }
        None => format!("Error: {}", message),
    }
}

impl MadError {
    /// Helper constructor for the **scanner**.
    pub fn scan<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Scan error: line={}, msg={}", line, message);

        MadError::Scan { message, line }
    }

    /// Helper constructor for the **parser**.  Errors raised at the EOF token
    /// carry no location; the message says so instead.
    pub fn parse_at<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Parse error: line={}, token={:?}, msg={}",
            token.line, token.lexeme, message
        );

        if token.token_type == TokenType::EOF {
            return MadError::Parse {
                message: format!("{} at end of file.", message),
                location: None,
            };
        }

        MadError::Parse {
            message,
            location: Some(Location::new(
                token.line,
                format!("at token \"{}\"", token.lexeme),
            )),
        }
    }

    /// Helper constructor for the **interpreter** and **environment**.
    pub fn runtime<S: Into<String>>(msg: S, location: Option<Location>) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: msg={}, at={:?}", message, location);

        MadError::Runtime { message, location }
    }

    /// Runtime error anchored at a token, with `context` rendered after it.
    pub fn runtime_at<S: Into<String>, C: Into<String>>(token: &Token, msg: S, context: C) -> Self {
        Self::runtime(msg, Some(Location::new(token.line, context)))
    }

    /// Source line of the diagnostic, when one is known.
    pub fn line(&self) -> Option<usize> {
        match self {
            MadError::Scan { line, .. } => Some(*line),
            MadError::Parse { location, .. } | MadError::Runtime { location, .. } => {
                location.as_ref().map(|l| l.line)
            }
            _ => None,
        }
    }

    /// The bare message without line or context decoration.
    pub fn message(&self) -> String {
        match self {
            MadError::Scan { message, .. }
            | MadError::Parse { message, .. }
            | MadError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, MadError>;
