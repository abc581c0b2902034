// Result reporting shared by all scan workers

use crate::config::OutputFormat;
use colored::Colorize;
use parkscan_scanner::{Classification, FetchOutcome, classify, matched_phrase};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;

/// Verdict for one target, as handed to the reporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Active,
    /// Carries the phrase that gave the page away
    Parked(String),
    Failed(String),
    Blocked(String),
}

impl TargetStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TargetStatus::Active => "active",
            TargetStatus::Parked(_) => "parked",
            TargetStatus::Failed(_) => "failed",
            TargetStatus::Blocked(_) => "blocked",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            TargetStatus::Parked(phrase)
            | TargetStatus::Failed(phrase)
            | TargetStatus::Blocked(phrase) => Some(phrase),
            TargetStatus::Active => None,
        }
    }
}

impl From<FetchOutcome> for TargetStatus {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Body(body) => match classify(&body) {
                Classification::Active => TargetStatus::Active,
                Classification::Parked => {
                    TargetStatus::Parked(matched_phrase(&body).unwrap_or_default().to_string())
                }
            },
            FetchOutcome::Failed(reason) => TargetStatus::Failed(reason),
            FetchOutcome::Blocked(reason) => TargetStatus::Blocked(reason),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    url: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

/// Writes one line per target. Lines from concurrent workers never interleave:
/// each line is rendered first and written while holding the sink lock.
pub struct Reporter<W: Write> {
    sink: Mutex<W>,
    verbose: bool,
    format: OutputFormat,
}

impl Reporter<io::Stdout> {
    pub fn stdout(verbose: bool, format: OutputFormat) -> Self {
        Self::new(io::stdout(), verbose, format)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(sink: W, verbose: bool, format: OutputFormat) -> Self {
        Self {
            sink: Mutex::new(sink),
            verbose,
            format,
        }
    }

    /// Active targets are always shown; everything else only in verbose mode.
    pub fn should_emit(&self, status: &TargetStatus) -> bool {
        matches!(status, TargetStatus::Active) || self.verbose
    }

    /// Render the line for `url` without its trailing newline.
    pub fn render(&self, url: &str, status: &TargetStatus) -> io::Result<String> {
        match self.format {
            OutputFormat::Text => Ok(render_text(url, status)),
            OutputFormat::Json => {
                let line = ReportLine {
                    url,
                    status: status.label(),
                    detail: status.detail(),
                };
                serde_json::to_string(&line).map_err(io::Error::other)
            }
        }
    }

    /// Report one target. Returns `Ok(false)` when the status is filtered out.
    pub fn report(&self, url: &str, status: &TargetStatus) -> io::Result<bool> {
        if !self.should_emit(status) {
            return Ok(false);
        }

        let line = self.render(url, status)?;

        // Poisoned only if a write panicked; the sink itself is still usable
        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(sink, "{}", line)?;
        sink.flush()?;
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        match self.sink.into_inner() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn render_text(url: &str, status: &TargetStatus) -> String {
    match status {
        TargetStatus::Active => url.green().to_string(),
        TargetStatus::Parked(_) => format!("{} is parked", url).yellow().to_string(),
        TargetStatus::Failed(reason) => format!("{} ({})", url, reason).red().to_string(),
        TargetStatus::Blocked(reason) => {
            format!("{} (blocked: {})", url, reason).red().to_string()
        }
    }
}
