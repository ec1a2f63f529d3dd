use super::table::{self, Table};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Truncated expectation record #{record}: bad status/time header '{header}'")]
    TruncatedRecord { record: usize, header: String },

    #[error("Expectation resource contains zero records")]
    EmptyTrace,

    #[error("Bad expected display in record #{record}: {source}")]
    Table {
        record: usize,
        #[source]
        source: table::Error,
    },
}

/// What the recorded trace promises for one scripted command: the status
/// the program must self-report, a time budget in whole seconds, and the
/// display it must render (`None` for commands that print nothing, e.g.
/// `q` or an output-disabling directive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub ok: bool,
    pub time_limit_secs: u64,
    pub table: Option<Table>,
}

/// The literal line separating records in an `.exp` resource.
pub const RECORD_DELIMITER: &str = "*******************";

const OK_STATUS_WORD: &str = "ok";

/// Decodes an expectation resource into per-command expectations, in file
/// order. Records are *terminated* by the delimiter line; content after
/// the final delimiter does not belong to any record.
pub fn parse_trace(content: &str) -> Result<Vec<Expectation>> {
    let mut expectations = Vec::new();
    let mut record_lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim_end() == RECORD_DELIMITER {
            expectations.push(parse_record(&record_lines, expectations.len())?);
            record_lines.clear();
        } else if !line.trim().is_empty() {
            record_lines.push(line);
        }
    }

    if !record_lines.is_empty() {
        log::warn!(
            "Ignoring {} trailing line(s) after the final record delimiter",
            record_lines.len()
        );
    }
    if expectations.is_empty() {
        return Err(Error::EmptyTrace);
    }
    Ok(expectations)
}

fn parse_record(lines: &[&str], record: usize) -> Result<Expectation> {
    let Some((header, body)) = lines.split_first() else {
        return Err(Error::TruncatedRecord {
            record,
            header: String::new(),
        });
    };

    let mut tokens = header.split_whitespace();
    let (Some(status_word), Some(time_token), None) =
        (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(Error::TruncatedRecord {
            record,
            header: header.to_string(),
        });
    };
    let Ok(time_limit_secs) = time_token.parse::<u64>() else {
        return Err(Error::TruncatedRecord {
            record,
            header: header.to_string(),
        });
    };

    let table = if body.is_empty() {
        None
    } else {
        Some(Table::parse(body).map_err(|source| Error::Table { record, source })?)
    };

    Ok(Expectation {
        ok: status_word == OK_STATUS_WORD,
        time_limit_secs,
        table,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grading::table::CellValue;

    fn trace(records: &[&str]) -> String {
        let mut s = String::new();
        for r in records {
            s.push_str(r);
            if !r.is_empty() {
                s.push('\n');
            }
            s.push_str(RECORD_DELIMITER);
            s.push('\n');
        }
        s
    }

    #[test]
    fn record_without_body_has_no_expected_display() {
        let exps = parse_trace(&trace(&["ok 0"])).unwrap();
        assert_eq!(
            exps,
            vec![Expectation {
                ok: true,
                time_limit_secs: 0,
                table: None,
            }]
        );
    }

    #[test]
    fn record_with_body_parses_the_display() {
        let exps = parse_trace(&trace(&["ok 5\n1 2\n3 4", "err 1"])).unwrap();
        assert_eq!(exps.len(), 2);

        let t = exps[0].table.as_ref().unwrap();
        assert_eq!(t.dim(), (2, 2));
        assert_eq!(t.get(1, 0), Some(CellValue::Num(3)));

        assert!(!exps[1].ok);
        assert_eq!(exps[1].time_limit_secs, 1);
        assert_eq!(exps[1].table, None);
    }

    #[test]
    fn non_ok_status_word_means_expected_failure() {
        let exps = parse_trace(&trace(&["invalid_range 0"])).unwrap();
        assert!(!exps[0].ok);
    }

    #[test]
    fn blank_lines_inside_a_record_are_skipped() {
        let content = format!("ok 2\n\n1 2\n\n3 4\n{}\n", RECORD_DELIMITER);
        let exps = parse_trace(&content).unwrap();
        assert_eq!(exps[0].table.as_ref().unwrap().dim(), (2, 2));
    }

    #[test]
    fn zero_records_is_empty_trace_error() {
        assert_eq!(parse_trace(""), Err(Error::EmptyTrace));
        // Content but no delimiter: nothing is a complete record.
        assert_eq!(parse_trace("ok 0\n"), Err(Error::EmptyTrace));
    }

    #[test]
    fn missing_header_is_truncated_record() {
        let err = parse_trace(&trace(&[""])).unwrap_err();
        assert!(matches!(err, Error::TruncatedRecord { record: 0, .. }));
    }

    #[test]
    fn malformed_header_is_truncated_record() {
        for header in ["ok", "ok five", "ok 1 extra"] {
            let err = parse_trace(&trace(&[header])).unwrap_err();
            assert!(
                matches!(err, Error::TruncatedRecord { .. }),
                "header {:?} should be rejected",
                header
            );
        }
    }

    #[test]
    fn bad_cell_in_body_carries_record_index() {
        let err = parse_trace(&trace(&["ok 0", "ok 0\n1 oops"])).unwrap_err();
        assert!(matches!(err, Error::Table { record: 1, .. }));
    }

    #[test]
    fn trailing_lines_after_final_delimiter_are_ignored() {
        let content = format!("ok 0\n{}\nleftover junk\n", RECORD_DELIMITER);
        let exps = parse_trace(&content).unwrap();
        assert_eq!(exps.len(), 1);
    }
}
