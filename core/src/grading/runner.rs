use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use super::diff::{self, Diff, Observed, GRACE};
use super::outcome::{CaseOutcome, FailReason, Failure, Verdict};
use super::table::Table;
use super::testcase::CaseData;
use super::trace::Expectation;
use crate::driver::{self, prompt, ByteSink, ProcessDriver};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Test case '{case}': command script has {commands} line(s) \
         but the expectation trace has {records} record(s)"
    )]
    ScriptLengthMismatch {
        case: String,
        commands: usize,
        records: usize,
    },

    #[error(transparent)]
    Driver(#[from] driver::Error),
}

/// Grades one test case end-to-end against a candidate binary: spawn,
/// handshake, then strict lock-step submit/await/parse/compare per
/// command. The first failing command is terminal for the case.
#[derive(Debug, Clone)]
pub struct SessionRunner {
    program: PathBuf,
    args: Vec<String>,
    session_log: Option<PathBuf>,
}

enum Turn {
    Pass,
    Fail(Failure),
}

impl SessionRunner {
    /// Pause between submitting a command and starting the response read,
    /// so the read cannot race the candidate's output buffering. The
    /// protocol has no per-command readiness marker, so a fixed settle
    /// delay is the best available synchronization. Not charged against
    /// the candidate's time budget.
    pub const COMMAND_SETTLE_DELAY: Duration = Duration::from_millis(100);

    /// Budget for the startup banner handshake, which has no trace record
    /// of its own.
    pub const INITIAL_PROMPT_TIMEOUT: Duration = Duration::from_secs(1);

    const THROUGHPUT_LOG_EVERY: usize = 1000;

    /// Stands in for the command name when the failure happened during the
    /// startup handshake, before any scripted command was sent.
    pub const STARTUP_TURN: &str = "<startup>";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            session_log: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// File that will capture every raw byte the candidate writes.
    pub fn session_log(mut self, path: Option<PathBuf>) -> Self {
        self.session_log = path;
        self
    }

    pub async fn run(&self, case: &CaseData) -> Result<CaseOutcome> {
        if case.commands.len() != case.expectations.len() {
            return Err(Error::ScriptLengthMismatch {
                case: case.name.clone(),
                commands: case.commands.len(),
                records: case.expectations.len(),
            });
        }

        let started = Instant::now();
        let mut driver = ProcessDriver::spawn(&self.program, &self.args, self.open_sink())?;

        // A candidate that hangs or dies before its first prompt fails the
        // case like any other protocol breach; only spawning itself is a
        // harness-level error.
        if let Err(e) = driver.handshake(Self::INITIAL_PROMPT_TIMEOUT).await {
            return Ok(CaseOutcome {
                name: case.name.clone(),
                verdict: Verdict::Fail,
                commands_run: 0,
                total_time: started.elapsed(),
                failure: Some(Failure {
                    index: 0,
                    command: Self::STARTUP_TURN.to_owned(),
                    reason: FailReason::Protocol(e),
                    expected_table: None,
                    observed_table: None,
                }),
            });
        }

        let mut batch_started = Instant::now();
        for (i, (command, expected)) in
            case.commands.iter().zip(&case.expectations).enumerate()
        {
            if (i + 1) % Self::THROUGHPUT_LOG_EVERY == 0 {
                log::info!(
                    "{}: ran {} commands ({:.2}s for the last {})",
                    case.name,
                    i + 1,
                    batch_started.elapsed().as_secs_f64(),
                    Self::THROUGHPUT_LOG_EVERY,
                );
                batch_started = Instant::now();
            }

            match self.run_turn(&mut driver, i, command, expected).await {
                Turn::Pass => {}
                Turn::Fail(failure) => {
                    driver.terminate();
                    return Ok(CaseOutcome {
                        name: case.name.clone(),
                        verdict: Verdict::Fail,
                        commands_run: i + 1,
                        total_time: started.elapsed(),
                        failure: Some(failure),
                    });
                }
            }
        }

        driver.terminate();
        Ok(CaseOutcome {
            name: case.name.clone(),
            verdict: Verdict::Pass,
            commands_run: case.commands.len(),
            total_time: started.elapsed(),
            failure: None,
        })
    }

    /// One half-duplex turn. Every problem attributable to the candidate
    /// (a classified diff, unparsable display output, a hung or dead
    /// process, a prompt without a status token) fails the turn; nothing
    /// here aborts the harness.
    async fn run_turn(
        &self,
        driver: &mut ProcessDriver,
        index: usize,
        command: &str,
        expected: &Expectation,
    ) -> Turn {
        let fail = |reason: FailReason, observed_table: Option<Table>| {
            Turn::Fail(Failure {
                index,
                command: command.to_owned(),
                reason,
                expected_table: expected.table.clone(),
                observed_table,
            })
        };
        let time_exceeded = || Diff::TimeExceeded {
            command: command.to_owned(),
            limit_secs: expected.time_limit_secs,
        };

        if let Err(e) = driver.send_command(command) {
            return fail(FailReason::Protocol(e), None);
        }
        tokio::time::sleep(Self::COMMAND_SETTLE_DELAY).await;

        let budget = Duration::from_secs(expected.time_limit_secs) + GRACE;
        let read_started = Instant::now();
        let (before, prompt_line) = match driver.await_prompt(budget).await {
            Ok(turn) => turn,
            Err(driver::Error::ResponseTimeout { .. }) => {
                return fail(FailReason::Mismatch(time_exceeded()), None);
            }
            Err(e) => return fail(FailReason::Protocol(e), None),
        };
        let elapsed = read_started.elapsed();

        let ok = match prompt::status_is_ok(&prompt_line) {
            Ok(ok) => ok,
            Err(e) => return fail(FailReason::Protocol(e), None),
        };

        let lines: Vec<&str> = before
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .collect();
        let table = if lines.is_empty() {
            None
        } else {
            match Table::parse(&lines) {
                Ok(t) => Some(t),
                Err(e) => return fail(FailReason::MalformedOutput(e), None),
            }
        };

        let observed = Observed { ok, elapsed, table };
        match diff::compare(command, expected, &observed) {
            Some(d) => {
                let observed_table = observed.table;
                fail(FailReason::Mismatch(d), observed_table)
            }
            None => Turn::Pass,
        }
    }

    fn open_sink(&self) -> Option<ByteSink> {
        let path = self.session_log.as_ref()?;
        match std::fs::File::create(path) {
            Ok(f) => Some(Box::new(f)),
            Err(e) => {
                log::warn!("Cannot open session log {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grading::table::CellValue;
    use crate::grading::trace::parse_trace;

    /// A scripted stand-in for a candidate spreadsheet binary.
    fn mock_runner(script: &str) -> SessionRunner {
        SessionRunner::new("sh").args(["-c".to_owned(), script.to_owned()])
    }

    fn case(commands: &[&str], trace: &str) -> CaseData {
        CaseData {
            name: "mock".to_owned(),
            commands: commands.iter().map(|s| s.to_string()).collect(),
            expectations: parse_trace(trace).unwrap(),
        }
    }

    const WELL_BEHAVED: &str = r#"
printf 'startup banner\n[0.00] (ok) > '
while read cmd; do
  case "$cmd" in
    q) exit 0 ;;
    bad) printf '[0.00] (invalid cmd) > ' ;;
    hideout) printf '[0.00] (ok) > ' ;;
    hang) sleep 10 ;;
    garble) printf '1 huh\n[0.00] (ok) > ' ;;
    *) printf '1 2\n3 4\n[0.00] (ok) > ' ;;
  esac
done
"#;

    #[tokio::test]
    async fn matching_session_passes() {
        let data = case(
            &["A1=1", "A2=3"],
            "ok 1\n1 2\n3 4\n*******************\nok 1\n1 2\n3 4\n*******************\n",
        );
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.commands_run, 2);
        assert!(outcome.failure.is_none());
    }

    #[tokio::test]
    async fn no_display_record_against_no_output_passes() {
        let data = case(&["hideout"], "ok 1\n*******************\n");
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Pass);
    }

    #[tokio::test]
    async fn wrong_cell_fails_with_cell_mismatch() {
        let data = case(
            &["A1=1"],
            "ok 1\n1 2\n3 5\n*******************\n",
        );
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Fail);

        let failure = outcome.failure.unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.command, "A1=1");
        match failure.reason {
            FailReason::Mismatch(Diff::CellMismatch {
                row,
                col,
                expected,
                observed,
            }) => {
                assert_eq!((row, col), (1, 1));
                assert_eq!(expected, CellValue::Num(5));
                assert_eq!(observed, CellValue::Num(4));
            }
            other => panic!("unexpected reason: {:?}", other),
        }
        assert!(failure.observed_table.is_some());
    }

    #[tokio::test]
    async fn reported_failure_status_fails_with_status_mismatch() {
        let data = case(&["bad"], "ok 1\n*******************\n");
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        let failure = outcome.failure.unwrap();
        assert!(matches!(
            failure.reason,
            FailReason::Mismatch(Diff::StatusMismatch {
                expected_ok: true,
                observed_ok: false,
            })
        ));
    }

    #[tokio::test]
    async fn hung_candidate_fails_with_time_exceeded() {
        let data = case(&["hang"], "ok 0\n*******************\n");
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Fail);

        let failure = outcome.failure.unwrap();
        match failure.reason {
            FailReason::Mismatch(Diff::TimeExceeded { command, limit_secs }) => {
                assert_eq!(command, "hang");
                assert_eq!(limit_secs, 0);
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_failure_stops_the_script() {
        let data = case(
            &["A1=1", "bad", "A3=9"],
            "ok 1\n1 2\n3 4\n*******************\n\
             ok 1\n*******************\n\
             ok 1\n1 2\n3 4\n*******************\n",
        );
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(outcome.commands_run, 2);
        assert_eq!(outcome.failure.unwrap().index, 1);
    }

    #[tokio::test]
    async fn unparsable_display_fails_as_malformed_output() {
        let data = case(&["garble"], "ok 1\n1 2\n*******************\n");
        let outcome = mock_runner(WELL_BEHAVED).run(&data).await.unwrap();
        let failure = outcome.failure.unwrap();
        assert!(matches!(failure.reason, FailReason::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn candidate_hung_at_startup_fails_the_case() {
        // Never prints the banner prompt, so the handshake times out.
        let data = case(&["A1=1"], "ok 1\n*******************\n");
        let outcome = mock_runner("sleep 10").run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(outcome.commands_run, 0);

        let failure = outcome.failure.unwrap();
        assert_eq!(failure.command, SessionRunner::STARTUP_TURN);
        assert!(matches!(
            failure.reason,
            FailReason::Protocol(driver::Error::ResponseTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn candidate_dead_at_startup_fails_the_case() {
        let data = case(&["A1=1"], "ok 1\n*******************\n");
        let outcome = mock_runner("exit 3").run(&data).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(outcome.commands_run, 0);
        assert!(matches!(
            outcome.failure.unwrap().reason,
            FailReason::Protocol(driver::Error::StreamClosed)
        ));
    }

    #[tokio::test]
    async fn length_mismatch_is_fatal_before_any_command() {
        // Unspawnable program proves no command was ever sent: the length
        // cross-check must reject the case first.
        let runner = SessionRunner::new("/nonexistent/candidate");
        let data = case(
            &["A1=1", "A2=2"],
            "ok 1\n*******************\n",
        );
        let err = runner.run(&data).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ScriptLengthMismatch {
                commands: 2,
                records: 1,
                ..
            }
        ));
    }
}
