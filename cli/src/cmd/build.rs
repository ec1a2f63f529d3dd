use std::path::PathBuf;

use ttyjudge_core::{action, print_success};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Candidate project dir containing the build recipe
    #[arg(default_value = "./")]
    pub project_dir: PathBuf,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let staged = action::build_binary(&args.project_dir, &cfg.build, &cfg.run).await?;
    print_success!("Successfully built. (binary: {})", staged.to_string_lossy());
    Ok(())
}
