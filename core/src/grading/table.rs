use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unparsable cell token '{token}' (display line {line})")]
    CellParse { token: String, line: usize },

    #[error("Ragged grid: display line {line} has {width} cells, previous lines have {expected_width}")]
    RaggedGrid {
        line: usize,
        width: usize,
        expected_width: usize,
    },
}

/// A single spreadsheet cell as the candidate program renders it:
/// either an integer or the `error` marker a faulted computation prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    Num(i64),
    Error,
}

impl CellValue {
    const ERROR_TOKEN: &str = "error";

    pub fn parse_token(token: &str, line: usize) -> Result<Self> {
        if token.eq_ignore_ascii_case(Self::ERROR_TOKEN) {
            return Ok(Self::Error);
        }
        token
            .parse::<i64>()
            .map(Self::Num)
            .map_err(|_| Error::CellParse {
                token: token.to_owned(),
                line,
            })
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CellValue::Num(n) => write!(f, "{}", n),
            CellValue::Error => write!(f, "{}", Self::ERROR_TOKEN),
        }
    }
}

/// One rendered display viewport, parsed into a rectangular grid of cells.
///
/// Invariant: every row has the same width. The empty table (zero rows) is
/// valid and represents a command that printed no display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    cells: Vec<Vec<CellValue>>,
}

impl Table {
    /// Parses non-empty output lines, one display row per line, cells
    /// separated by whitespace.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut cells: Vec<Vec<CellValue>> = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let row = line
                .as_ref()
                .split_whitespace()
                .map(|token| CellValue::parse_token(token, i))
                .collect::<Result<Vec<_>>>()?;
            if let Some(first) = cells.first() {
                if row.len() != first.len() {
                    return Err(Error::RaggedGrid {
                        line: i,
                        width: row.len(),
                        expected_width: first.len(),
                    });
                }
            }
            cells.push(row);
        }
        Ok(Self { cells })
    }

    pub fn num_rows(&self) -> usize {
        self.cells.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.num_rows(), self.num_cols())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<CellValue> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.cells.iter().map(Vec::as_slice)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in &self.cells {
            let line = row
                .iter()
                .map(CellValue::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
