//! Drives one source text through scan → parse → interpret and owns the
//! diagnostic policy.
//!
//! Nothing below this module prints errors or decides whether the process
//! should stop: every stage returns a [`MadError`], and [`Session::run`]
//! reports it and answers with a [`Status`] according to the [`Mode`].

use std::io::Write;

use log::{debug, info, warn};

use crate::error::{MadError, Result};
use crate::interpreter::Interpreter;
use crate::parser::parse;
use crate::scanner::{scan, Scanner};
use crate::token::TokenType;

/// How the session reacts to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Running a file: the first error ends the run with exit status 1.
    Batch,

    /// Running prompt input: the error is shown and the next input is read.
    Interactive,
}

/// What the caller should do after [`Session::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Continue,
    Halt(i32),
}

pub struct Session<W: Write, E: Write> {
    mode: Mode,
    interpreter: Interpreter<W>,
    diagnostics: E,
}

impl<W: Write, E: Write> Session<W, E> {
    /// `out` receives program output, `diagnostics` receives error reports.
    pub fn new(mode: Mode, out: W, diagnostics: E) -> Self {
        info!("Starting {:?} session", mode);

        Self {
            mode,
            interpreter: Interpreter::new(out),
            diagnostics,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Scan, parse and evaluate `source`, reporting the first error if any.
    pub fn run(&mut self, source: &str) -> Status {
        match self.execute(source) {
            Ok(()) => Status::Continue,
            Err(e) => self.report(&e),
        }
    }

    fn execute(&mut self, source: &str) -> Result<()> {
        let tokens = scan(source)?;
        let statements = parse(&tokens)?;

        debug!("Running {} statement(s)", statements.len());

        match self.mode {
            Mode::Batch => self.interpreter.interpret(&statements),
            Mode::Interactive => self.interpreter.interpret_incremental(&statements),
        }
    }

    /// The diagnostic sink: render the error, then apply the mode policy.
    pub fn report(&mut self, error: &MadError) -> Status {
        warn!("Reporting diagnostic: {}", error);

        if let Err(io_err) = writeln!(self.diagnostics, "{}", error) {
            warn!("Could not write diagnostic: {}", io_err);
        }

        match self.mode {
            Mode::Batch => Status::Halt(1),
            Mode::Interactive => Status::Continue,
        }
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn diagnostics(&self) -> &E {
        &self.diagnostics
    }

    /// Hand back both sinks, consuming the session.
    pub fn into_parts(self) -> (W, E) {
        (self.interpreter.into_output(), self.diagnostics)
    }
}

/// Does `source` stop in the middle of a block or a string literal?  The
/// prompt keeps reading lines until this turns false.
pub fn is_incomplete(source: &str) -> bool {
    let mut depth: i64 = 0;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => match token.token_type {
                TokenType::LEFT_BRACE => depth += 1,
                TokenType::RIGHT_BRACE => depth -= 1,
                _ => {}
            },
            Err(MadError::Scan { message, .. }) if message.starts_with("Unterminated") => {
                return true;
            }
            // Any other problem is for `run` to report.
            Err(_) => {}
        }
    }

    depth > 0
}
