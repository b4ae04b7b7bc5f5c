//! Service configuration, built once at start-up and handed to the service.
use std::fmt;

/// Contract code version. Function names may be suffixed with `_<number>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub number: String,
    pub build: String,
    pub date: String,
}

/// What `create` does when the deal identifier is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Replace the stored record, keeping the stored version history.
    #[default]
    Overwrite,
    /// Fail with an "already exists" error and write nothing.
    Reject,
}

/// What `close` does with a leg or close date it cannot parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatePolicy {
    /// Substitute 01.01.0001 and log a warning.
    #[default]
    ZeroFallback,
    /// Fail the close with a parse error.
    Strict,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub version: VersionInfo,
    pub duplicate_policy: DuplicatePolicy,
    pub date_policy: DatePolicy,
    /// `tracing_subscriber::EnvFilter` directive used by the binary.
    pub log_filter: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            number: "1.0.0".into(),
            build: "15".into(),
            date: "19.11.2018".into(),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} build: {} ({})", self.number, self.build, self.date)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: VersionInfo::default(),
            duplicate_policy: DuplicatePolicy::default(),
            date_policy: DatePolicy::default(),
            log_filter: "info".into(),
        }
    }
}

impl ServiceConfig {
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
    pub fn with_date_policy(mut self, policy: DatePolicy) -> Self {
        self.date_policy = policy;
        self
    }
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_display_matches_release_string() {
        assert_eq!(
            VersionInfo::default().to_string(),
            "1.0.0 build: 15 (19.11.2018)"
        );
    }
}
