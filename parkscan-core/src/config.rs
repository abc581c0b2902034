// Run configuration shared read-only by every worker

use parkscan_scanner::fetcher::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS};
use parkscan_scanner::{Fetcher, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inputs shorter than this are scanned sequentially, without spawning workers.
pub const MIN_THREADING_INPUT_SIZE: usize = 20;

pub const DEFAULT_THREADS: usize = 10;

/// How the number of workers is derived from the input size and `--threads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPolicy {
    /// `max(targets, threads)`: one worker per target in practice. This is the
    /// historical behavior and stays the default so output matches older runs.
    #[default]
    Literal,
    /// `min(targets, threads)`: at most `threads` workers.
    Bounded,
}

impl WorkerPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "literal" => Some(WorkerPolicy::Literal),
            "bounded" => Some(WorkerPolicy::Bounded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Options for a scan, resolved once at startup
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub threads: usize,
    pub timeout: Duration,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub accept_new_domain: bool,
    /// Also report failed, blocked and parked targets
    pub verbose: bool,
    pub worker_policy: WorkerPolicy,
    pub max_redirects: usize,
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            insecure: false,
            accept_new_domain: true,
            verbose: false,
            worker_policy: WorkerPolicy::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            format: OutputFormat::default(),
        }
    }
}

impl RunConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_accept_new_domain(mut self, accept_new_domain: bool) -> Self {
        self.accept_new_domain = accept_new_domain;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_worker_policy(mut self, worker_policy: WorkerPolicy) -> Self {
        self.worker_policy = worker_policy;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the fetcher every worker shares for this run.
    pub fn fetcher(&self) -> Result<Fetcher, ScanError> {
        Fetcher::builder()
            .with_timeout(self.timeout)
            .with_insecure(self.insecure)
            .with_accept_new_domain(self.accept_new_domain)
            .with_max_redirects(self.max_redirects)
            .build()
    }
}
