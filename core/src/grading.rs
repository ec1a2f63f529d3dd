pub mod diff;
pub mod outcome;
pub mod runner;
pub mod table;
pub mod testcase;
pub mod trace;

pub use diff::*;
pub use outcome::*;
pub use runner::*;
pub use table::{CellValue, Table};
pub use testcase::*;
pub use trace::Expectation;
