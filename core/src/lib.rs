pub mod action;
pub mod config;
pub mod driver;
pub mod grading;
pub mod serdable;
pub mod style;

pub use crate::config::Config;
