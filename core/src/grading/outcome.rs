use std::time::Duration;

use super::diff::Diff;
use super::table::{self, Table};
use crate::driver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Terminal result of grading one test case. Exactly one of the two
/// verdicts; `failure` is present iff the verdict is `Fail`.
#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub verdict: Verdict,
    pub commands_run: usize,
    pub total_time: Duration,
    pub failure: Option<Failure>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Why a case failed, pinned to the command that failed it, with both
/// displays for human diagnosis.
#[derive(Debug)]
pub struct Failure {
    /// Zero-based position in the command script.
    pub index: usize,
    pub command: String,
    pub reason: FailReason,
    pub expected_table: Option<Table>,
    pub observed_table: Option<Table>,
}

#[derive(Debug, thiserror::Error)]
pub enum FailReason {
    #[error("{0}")]
    Mismatch(Diff),

    #[error("Malformed display output: {0}")]
    MalformedOutput(#[source] table::Error),

    #[error("Protocol failure: {0}")]
    Protocol(#[source] driver::Error),
}
