pub mod build;
pub mod grade;
pub mod init;

use std::path::PathBuf;

use ttyjudge_core::Config;

use crate::util;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Path to a config file (default: find `ttyjudge.toml` in ancestor dirs)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Build(build::Args),
    Init(init::Args),

    #[command(alias("g"))]
    Grade(grade::Args),

    #[command(alias("t"))]
    Test(test::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Build(args) => build::exec(args, self).await,
            Grade(args) => grade::exec(args, self).await,
            Init(args) => init::exec(args, self),
            Test(args) => test::exec(args, self).await,
        }
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::from_toml_file(path.clone()),
            None => Config::from_file_or_default(util::current_dir()),
        }
    }
}
