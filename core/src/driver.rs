pub mod process;
pub mod prompt;

pub use process::*;

use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: PathBuf, reason: String },

    #[error("No prompt within {budget:?} (candidate is hung, looping, or too slow)")]
    ResponseTimeout { budget: Duration },

    #[error("Terminal stream closed before a prompt appeared (candidate exited or crashed)")]
    StreamClosed,

    #[error("Prompt line carries no parenthesized status token: '{line}'")]
    MalformedPrompt { line: String },

    #[error("I/O error on candidate terminal: {0}")]
    Io(#[from] std::io::Error),
}
