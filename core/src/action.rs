pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use error::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::Mutex;

use crate::config::{BuildConfig, RunConfig};
use crate::grading::{CaseOutcome, FsTestCase, SessionRunner};
use crate::{style, Config};

pub fn init_project(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let config_path = dir.as_ref().join(Config::FILENAME);
    ensure!(
        !config_path.exists(),
        "Already exists: {}",
        config_path.to_string_lossy()
    );
    fsutil::write_with_mkdir(&config_path, &Config::example_toml())?;
    Ok(config_path)
}

/// Builds the candidate binary in `project_dir` and stages a copy of it
/// under the configured staging directory.
///
/// Returns the path of the staged copy.
pub async fn build_binary(
    project_dir: impl AsRef<Path>,
    build_cfg: &BuildConfig,
    run_cfg: &RunConfig,
) -> Result<PathBuf> {
    let project_dir = project_dir.as_ref();

    log::info!("Building: {}", build_cfg.command);
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&build_cfg.command)
        .current_dir(project_dir)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to exec build command '{}'", build_cfg.command))?;

    ensure!(
        output.status.success(),
        "Build command '{}' failed ({}):\n{}",
        build_cfg.command,
        output.status,
        String::from_utf8_lossy(&output.stderr),
    );

    let binary_path = project_dir.join(&build_cfg.binary);
    ensure!(
        binary_path.is_file(),
        "Build succeeded but binary not found: {}",
        binary_path.to_string_lossy()
    );

    let staged_name = {
        let stem = binary_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "candidate".to_owned());
        format!("{}_{}", stem, run_cfg.args.join("_"))
    };
    let staged_path = build_cfg.staging_dir.join(staged_name);

    fsutil::mkdir_all(&build_cfg.staging_dir)?;
    fsutil::copy_file(&binary_path, &staged_path)?;

    Ok(staged_path)
}

pub async fn do_grade(
    program: impl AsRef<Path>,
    case_path: impl AsRef<Path>,
    cfg: &Config,
) -> Result<Vec<CaseOutcome>> {
    let testcases = FsTestCase::resolve(&case_path, &cfg.test.include)
        .context("Failed to find testcase")?;
    if testcases.is_empty() {
        bail!(
            "No testcases found in {}",
            case_path.as_ref().to_string_lossy()
        );
    }

    let runner = SessionRunner::new(program.as_ref())
        .args(cfg.run.args.clone())
        .session_log(cfg.run.session_log.clone());

    let style = ProgressStyle::default_bar()
        .template("{spinner} {msg}")
        .unwrap();

    let mut results = Vec::with_capacity(testcases.len());
    let mut bars = Vec::with_capacity(testcases.len());
    let progress_bar_container = MultiProgress::new();

    log::info!(
        "Grading {} with args {:?}",
        program.as_ref().to_string_lossy(),
        cfg.run.args
    );

    // Prepare progress bar
    for t in &testcases {
        let bar = progress_bar_container
            .add(ProgressBar::new(100))
            .with_style(style.clone())
            .with_message(format!("Testcase {} ...", t.name()));
        let bar = Arc::new(Mutex::new(bar));
        bars.push(bar.clone());

        // Tick spinner
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let bar = bar.lock().await;
                if bar.is_finished() {
                    break;
                }
                bar.tick();
            }
        });
    }

    for (t, bar) in testcases.iter().zip(&bars) {
        let data = t.load()?;
        let res = runner
            .run(&data)
            .await
            .with_context(|| format!("Testcase {} could not be graded", t.name()))?;
        bar.lock().await.finish_with_message({
            format!(
                "Testcase {} ... {} [{}ms]",
                t.name(),
                style::verdict_icon(res.verdict),
                res.total_time.as_millis(),
            )
            .cyan()
            .to_string()
        });
        results.push(res);
    }
    print!("\n");

    results
        .iter()
        .filter(|x| !x.passed())
        .for_each(style::print_failure_detail);

    style::print_run_summary(&results);
    Ok(results)
}
