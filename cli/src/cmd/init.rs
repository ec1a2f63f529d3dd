use std::path::PathBuf;

use ttyjudge_core::{action, print_success};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(default_value = "./")]
    dir: PathBuf,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let config_path = action::init_project(&args.dir)?;
    print_success!(
        "Successfully wrote example config. (path: {})",
        config_path.to_string_lossy()
    );
    Ok(())
}
