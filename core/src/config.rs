use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::serdable::GlobPattern;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,

    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub test: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Build command run inside the submission directory.
    #[serde(default = "BuildConfig::default_command")]
    pub command: String,

    /// Where the build is expected to leave the binary, relative to the
    /// submission directory.
    #[serde(default = "BuildConfig::default_binary")]
    pub binary: PathBuf,

    /// Where built binaries are staged before grading.
    #[serde(default = "BuildConfig::default_staging_dir")]
    pub staging_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Arguments passed to the candidate binary (viewport rows, cols).
    #[serde(default = "RunConfig::default_args")]
    pub args: Vec<String>,

    /// When set, every raw byte of each graded session is captured here.
    #[serde(default)]
    pub session_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Command-script files to pick up in a test directory; each needs an
    /// `.exp` sibling.
    #[serde(default = "TestConfig::default_include")]
    pub include: GlobPattern,
}

impl BuildConfig {
    fn default_command() -> String {
        "make".to_owned()
    }

    fn default_binary() -> PathBuf {
        PathBuf::from("target/release/spreadsheet")
    }

    fn default_staging_dir() -> PathBuf {
        std::env::temp_dir().join("ttyjudge")
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            binary: Self::default_binary(),
            staging_dir: Self::default_staging_dir(),
        }
    }
}

impl RunConfig {
    fn default_args() -> Vec<String> {
        vec!["999".to_owned(), "18278".to_owned()]
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            args: Self::default_args(),
            session_log: None,
        }
    }
}

impl TestConfig {
    fn default_include() -> GlobPattern {
        GlobPattern::parse("*.cmds").unwrap()
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            include: Self::default_include(),
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "ttyjudge.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).unwrap();
        std::str::from_utf8(file.data.as_ref()).unwrap().to_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Loads the nearest `ttyjudge.toml`, or built-in defaults when none
    /// exists anywhere up the tree.
    pub fn from_file_or_default(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        match Self::find_file_in_ancestors(cur_dir) {
            Some(path) => Self::from_toml_file(path),
            None => {
                log::info!("No {} found; using defaults", Self::FILENAME);
                Ok(Self::default())
            }
        }
    }
}
