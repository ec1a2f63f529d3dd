use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};

use super::trace::{self, Expectation};
use crate::serdable::GlobPattern;

pub const EXP_EXTENSION: &str = "exp";

/// One test case on disk: a command script paired with its recorded
/// expectation trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestCase {
    name: String,
    cmd_path: PathBuf,
    exp_path: PathBuf,
}

/// The same case, loaded into memory and ready to grade. Decoupled from
/// the filesystem so the session runner can be exercised with inline data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseData {
    pub name: String,
    pub commands: Vec<String>,
    pub expectations: Vec<Expectation>,
}

impl FsTestCase {
    pub fn from_cmd_file(cmd_path: impl Into<PathBuf>) -> Self {
        let cmd_path = cmd_path.into();
        let name = cmd_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| cmd_path.to_string_lossy().into_owned());
        let exp_path = cmd_path.with_extension(EXP_EXTENSION);
        Self {
            name,
            cmd_path,
            exp_path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cmd_path(&self) -> &Path {
        &self.cmd_path
    }

    /// Resolves a test-dir-or-single-file argument into case pairs:
    /// a file stands for itself, a directory is enumerated.
    pub fn resolve(path: impl AsRef<Path>, include: &GlobPattern) -> anyhow::Result<Vec<Self>> {
        let path = path.as_ref();
        if path.is_file() {
            return Ok(vec![Self::from_cmd_file(path)]);
        }
        Self::enumerate(path, include)
    }

    /// Finds every command script in `dir` matching `include` (by file
    /// name) that has an `.exp` sibling, sorted by case name.
    pub fn enumerate(dir: impl AsRef<Path>, include: &GlobPattern) -> anyhow::Result<Vec<Self>> {
        let mut cases = Vec::new();
        for entry in fsutil::read_dir(&dir)?.filter_map(Result::ok) {
            let Ok(ft) = entry.file_type() else {
                continue;
            };
            if ft.is_dir() {
                continue;
            }
            let filename = entry.file_name();
            if !include.matches(&filename.to_string_lossy()) {
                continue;
            }
            let case = Self::from_cmd_file(entry.path());
            if !case.exp_path.is_file() {
                log::warn!(
                    "Skipping {}: no expectation file {}",
                    case.cmd_path.display(),
                    case.exp_path.display()
                );
                continue;
            }
            cases.push(case);
        }
        cases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cases)
    }

    /// Reads the command script and decodes the expectation trace.
    /// Commands are kept verbatim, one per line, blank lines included.
    pub fn load(&self) -> anyhow::Result<CaseData> {
        let commands: Vec<String> = fsutil::read_to_string(&self.cmd_path)?
            .lines()
            .map(str::to_owned)
            .collect();
        if commands.is_empty() {
            bail!("Command script {} is empty", self.cmd_path.display());
        }

        let trace_content = fsutil::read_to_string(&self.exp_path)?;
        let expectations = trace::parse_trace(&trace_content)
            .with_context(|| format!("Bad expectation file {}", self.exp_path.display()))?;

        Ok(CaseData {
            name: self.name.clone(),
            commands,
            expectations,
        })
    }
}
