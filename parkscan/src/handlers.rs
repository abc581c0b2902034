use anyhow::{Context, Result};
use clap::ArgMatches;
use parkscan_core::{OutputFormat, Reporter, RunConfig, ScanSummary, WorkerPolicy, execute_scan};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Command line misuse, reported together with the usage text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("please provide either a url or file containing urls to scan")]
    MissingTarget,

    #[error("invalid thread count")]
    InvalidThreadCount,
}

impl UsageError {
    pub fn exit_code(&self) -> i32 {
        match self {
            UsageError::MissingTarget => 1,
            UsageError::InvalidThreadCount => 2,
        }
    }
}

/// Resolve parsed arguments into a [`RunConfig`].
pub fn build_run_config(args: &ArgMatches) -> Result<RunConfig, UsageError> {
    if args.get_one::<String>("url").is_none() && args.get_one::<String>("file").is_none() {
        return Err(UsageError::MissingTarget);
    }

    let threads = args
        .get_one::<i64>("threads")
        .copied()
        .and_then(|t| usize::try_from(t).ok())
        .filter(|t| *t >= 1)
        .ok_or(UsageError::InvalidThreadCount)?;

    let policy = args
        .get_one::<String>("worker-policy")
        .and_then(|p| WorkerPolicy::from_str(p))
        .unwrap_or_default();
    let format = args
        .get_one::<String>("format")
        .and_then(|f| OutputFormat::from_str(f))
        .unwrap_or_default();

    let mut config = RunConfig::default()
        .with_threads(threads)
        .with_insecure(args.get_flag("insecure"))
        .with_verbose(args.get_flag("verbose"))
        .with_worker_policy(policy)
        .with_format(format);

    if let Some(accept_new_domain) = args.get_one::<bool>("accept-new-domain") {
        config = config.with_accept_new_domain(*accept_new_domain);
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*timeout));
    }
    if let Some(max_redirects) = args.get_one::<usize>("max-redirects") {
        config = config.with_max_redirects(*max_redirects);
    }

    Ok(config)
}

/// Load targets from a file if one was given, otherwise from the single URL.
pub fn load_targets_from_source(url: Option<&str>, file: Option<&str>) -> Result<Vec<String>> {
    if let Some(file) = file {
        let expanded = shellexpand::tilde(file);
        load_targets_from_file(Path::new(expanded.as_ref()))
    } else if let Some(url) = url {
        Ok(vec![url.to_string()])
    } else {
        Err(UsageError::MissingTarget.into())
    }
}

/// One target per line. Blank lines are kept and scanned like any other entry.
pub fn load_targets_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read target file {}", path.display()))?;

    let targets: Vec<String> = content.lines().map(String::from).collect();
    debug!("Loaded {} targets from {}", targets.len(), path.display());
    Ok(targets)
}

/// Scan `targets`, printing results to stdout as they come in.
pub async fn run_scan(targets: &[String], config: &RunConfig) -> Result<ScanSummary> {
    let reporter = Arc::new(Reporter::stdout(config.verbose, config.format));
    let summary = execute_scan(targets, config, reporter)
        .await
        .context("Scan aborted")?;
    Ok(summary)
}
