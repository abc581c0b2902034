use serde::{Deserialize, Serialize};

/// What a single fetch chain ended with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Body of the terminal, non-redirect response (any status code)
    Body(String),
    /// Transport, protocol or URL error, or a redirect loop
    Failed(String),
    /// Redirect to another domain refused by policy
    Blocked(String),
}

impl FetchOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked(reason.into())
    }
}
