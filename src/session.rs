//! Triggering surface for embedding shells.
//!
//! A shell hands `execute` the full program text and gets back the
//! user-visible text plus a failure flag; `is_busy` lets it disable
//! re-triggering and show a working indication while a run is in flight.
//! The run itself is synchronous — any staging delay is the shell's
//! business, not the core's.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::interpreter::{Interpreter, RunOutput, RuntimeError};
use crate::lexer::{self, LexError};
use crate::parser::{self, ParseError};

/// Any failure a run can surface, front end or runtime. All are fatal to
/// the run and all discard its buffered output.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Tokenize, parse, and interpret one program text.
pub fn run_source(source: &str) -> Result<RunOutput, Error> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse_tokens(tokens)?;
    Ok(Interpreter::new().run(&program)?)
}

/// Outcome handed to the shell: either the rendered result/TAC artifact or
/// a single `Error: …` line, never a mixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: String,
    pub failed: bool,
}

pub struct Session {
    busy: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// True while a run is in flight; readable from another thread.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn execute(&self, source: &str) -> RunReport {
        self.busy.store(true, Ordering::Release);
        let report = match run_source(source) {
            Ok(output) => RunReport {
                output: output.render(),
                failed: false,
            },
            Err(error) => RunReport {
                output: format!("Error: {error}"),
                failed: true,
            },
        };
        self.busy.store(false, Ordering::Release);
        report
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
