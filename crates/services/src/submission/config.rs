use std::env;
use std::time::Duration;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Endpoint settings for result submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionConfig {
    pub endpoint_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl SubmissionConfig {
    /// Read settings from the environment.
    ///
    /// Returns `None` unless `ROGAINE_SUBMIT_ENABLED=1` and an endpoint is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        if lookup("ROGAINE_SUBMIT_ENABLED").as_deref().map(str::trim) != Some("1") {
            return None;
        }
        let endpoint_url = lookup("ROGAINE_SUBMIT_ENDPOINT_URL")?;
        if endpoint_url.trim().is_empty() {
            return None;
        }
        let token = lookup("ROGAINE_SUBMIT_TOKEN").filter(|t| !t.trim().is_empty());
        Some(Self {
            endpoint_url: endpoint_url.trim().to_owned(),
            token,
            timeout: timeout_from(lookup("ROGAINE_SUBMIT_TIMEOUT_SECS")),
        })
    }
}

/// Request timeout, also used as the leave-hook budget.
#[must_use]
pub fn timeout_from_env() -> Duration {
    timeout_from(env::var("ROGAINE_SUBMIT_TIMEOUT_SECS").ok())
}

fn timeout_from(raw: Option<String>) -> Duration {
    let secs = raw
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}
