use std::fmt;
use std::time::Duration;

use super::table::{CellValue, Table};
use super::trace::Expectation;

/// Fixed allowance added to a command's time budget before the budget
/// counts as blown. Deliberately not a config key: the grace protects the
/// grader from scheduler jitter, it is not a knob for candidates.
pub const GRACE: Duration = Duration::from_millis(200);

/// What actually happened for one submitted command: the status decoded
/// from the prompt, the wall-clock time from submission to prompt, and the
/// parsed display (`None` when no non-empty line preceded the prompt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    pub ok: bool,
    pub elapsed: Duration,
    pub table: Option<Table>,
}

/// The classified discrepancy between an expectation and an observation.
/// Exactly one variant per failing comparison; a pass produces no `Diff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff {
    TimeExceeded {
        command: String,
        limit_secs: u64,
    },
    StatusMismatch {
        expected_ok: bool,
        observed_ok: bool,
    },
    DimensionMismatch {
        expected: (usize, usize),
        observed: (usize, usize),
    },
    CellMismatch {
        row: usize,
        col: usize,
        expected: CellValue,
        observed: CellValue,
    },
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Diff::*;
        match self {
            TimeExceeded { command, limit_secs } => write!(
                f,
                "time limit exceeded: '{}' did not finish within {}s",
                command, limit_secs
            ),
            StatusMismatch {
                expected_ok,
                observed_ok,
            } => write!(
                f,
                "status mismatch: expected '{}', got '{}'",
                status_word(*expected_ok),
                status_word(*observed_ok)
            ),
            DimensionMismatch { expected, observed } => write!(
                f,
                "display dimension mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, observed.0, observed.1
            ),
            CellMismatch {
                row,
                col,
                expected,
                observed,
            } => write!(
                f,
                "cell mismatch at (row {}, col {}): expected {}, got {}",
                row, col, expected, observed
            ),
        }
    }
}

fn status_word(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "err"
    }
}

/// Compares one expectation against one observation. Pure; checks apply in
/// a fixed order so that a single root cause is reported when several
/// discrepancies coexist: time budget, then status, then display
/// dimensions, then the first differing cell in row-major order.
pub fn compare(command: &str, expected: &Expectation, observed: &Observed) -> Option<Diff> {
    if observed.elapsed > Duration::from_secs(expected.time_limit_secs) + GRACE {
        return Some(Diff::TimeExceeded {
            command: command.to_owned(),
            limit_secs: expected.time_limit_secs,
        });
    }

    if expected.ok != observed.ok {
        return Some(Diff::StatusMismatch {
            expected_ok: expected.ok,
            observed_ok: observed.ok,
        });
    }

    // No expected display recorded: the grid is not checked at all.
    let Some(expected_table) = &expected.table else {
        return None;
    };

    let observed_dim = observed.table.as_ref().map(Table::dim).unwrap_or((0, 0));
    if expected_table.dim() != observed_dim {
        return Some(Diff::DimensionMismatch {
            expected: expected_table.dim(),
            observed: observed_dim,
        });
    }

    let observed_table = observed.table.as_ref()?;
    for (row, (erow, orow)) in expected_table.rows().zip(observed_table.rows()).enumerate() {
        for (col, (e, o)) in erow.iter().zip(orow.iter()).enumerate() {
            if e != o {
                return Some(Diff::CellMismatch {
                    row,
                    col,
                    expected: *e,
                    observed: *o,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    fn expectation(ok: bool, secs: u64, table_lines: Option<&[&str]>) -> Expectation {
        Expectation {
            ok,
            time_limit_secs: secs,
            table: table_lines.map(|lines| Table::parse(lines).unwrap()),
        }
    }

    fn observed(ok: bool, millis: u64, table_lines: Option<&[&str]>) -> Observed {
        Observed {
            ok,
            elapsed: Duration::from_millis(millis),
            table: table_lines.map(|lines| Table::parse(lines).unwrap()),
        }
    }

    #[test]
    fn within_budget_matching_everything_is_a_pass() {
        let e = expectation(true, 0, None);
        let o = observed(true, 50, None);
        assert_eq!(compare("A1=2", &e, &o), None);
    }

    #[test]
    fn time_exceeded_wins_over_every_other_discrepancy() {
        let e = expectation(true, 5, Some(&["3"]));
        // 6s response with wrong status and wrong cells: still TimeExceeded.
        let o = observed(false, 6_000, Some(&["4 4"]));
        assert_eq!(
            compare("A1=3", &e, &o),
            Some(Diff::TimeExceeded {
                command: "A1=3".to_owned(),
                limit_secs: 5,
            })
        );
    }

    #[test]
    fn elapsed_within_grace_is_not_time_exceeded() {
        let e = expectation(true, 1, None);
        let o = observed(true, 1_100, None);
        assert_eq!(compare("A1=1", &e, &o), None);
    }

    #[test]
    fn status_mismatch_wins_over_grid_discrepancies() {
        let e = expectation(false, 0, Some(&["1 2"]));
        let o = observed(true, 10, Some(&["9 9 9"]));
        assert_eq!(
            compare("A1=(1/0)", &e, &o),
            Some(Diff::StatusMismatch {
                expected_ok: false,
                observed_ok: true,
            })
        );
    }

    #[test]
    fn dimension_mismatch_before_cell_scan() {
        let e = expectation(true, 1, Some(&["1 2", "3 4"]));
        let o = observed(true, 10, Some(&["1 2"]));
        assert_eq!(
            compare("w", &e, &o),
            Some(Diff::DimensionMismatch {
                expected: (2, 2),
                observed: (1, 2),
            })
        );
    }

    #[test]
    fn expected_display_but_none_observed_is_dimension_mismatch() {
        let e = expectation(true, 1, Some(&["1"]));
        let o = observed(true, 10, None);
        assert_eq!(
            compare("w", &e, &o),
            Some(Diff::DimensionMismatch {
                expected: (1, 1),
                observed: (0, 0),
            })
        );
    }

    #[test]
    fn no_expected_display_skips_grid_checks() {
        let e = expectation(true, 1, None);
        let o = observed(true, 10, Some(&["1 2", "3 4"]));
        assert_eq!(compare("disable_output", &e, &o), None);
    }

    #[test]
    fn first_differing_cell_in_row_major_order() {
        let e = expectation(true, 1, Some(&["1 2", "3 4"]));
        let o = observed(true, 10, Some(&["1 2", "3 5"]));
        assert_eq!(
            compare("B2=5", &e, &o),
            Some(Diff::CellMismatch {
                row: 1,
                col: 1,
                expected: CellValue::Num(4),
                observed: CellValue::Num(5),
            })
        );
    }

    #[test]
    fn error_markers_compare_equal_to_each_other() {
        let e = expectation(true, 1, Some(&["error 2"]));
        let o = observed(true, 10, Some(&["error 2"]));
        assert_eq!(compare("x", &e, &o), None);

        let o = observed(true, 10, Some(&["error 3"]));
        assert_eq!(
            compare("x", &e, &o),
            Some(Diff::CellMismatch {
                row: 0,
                col: 1,
                expected: CellValue::Num(2),
                observed: CellValue::Num(3),
            })
        );
    }

    #[test]
    fn compare_is_pure() {
        let e = expectation(true, 1, Some(&["1 2"]));
        let o = observed(true, 10, Some(&["1 3"]));
        assert_eq!(compare("x", &e, &o), compare("x", &e, &o));
    }
}
