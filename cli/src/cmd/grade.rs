use std::path::PathBuf;

use anyhow::ensure;
use ttyjudge_core::action;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Candidate project dir containing the build recipe
    #[arg(default_value = "./")]
    pub project_dir: PathBuf,

    /// Test case dir, or a single command script
    #[arg(short = 'd', long, default_value = "./tests")]
    pub testcase_dir: PathBuf,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;

    let staged = action::build_binary(&args.project_dir, &cfg.build, &cfg.run).await?;
    let outcomes = action::do_grade(&staged, &args.testcase_dir, &cfg).await?;

    let num_failed = outcomes.iter().filter(|o| !o.passed()).count();
    ensure!(
        num_failed == 0,
        "{}/{} test cases failed",
        num_failed,
        outcomes.len()
    );
    Ok(())
}
