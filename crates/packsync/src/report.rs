use std::fmt;

use crate::transport::MetaError;

/// A failure surfaced to the user by a background operation.
///
/// Callers decide how to present it: the CLI prints it to stderr, an
/// interactive front end would show it in a status area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// What was being loaded, e.g. `pack metadata` or `fabric MC versions`.
    pub operation: String,
    /// Human-readable cause.
    pub message: String,
}

impl FailureReport {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn from_error(operation: impl Into<String>, error: &MetaError) -> Self {
        Self::new(operation, error.to_string())
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error while loading {}: {}", self.operation, self.message)
    }
}

impl std::error::Error for FailureReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_operation() {
        let report = FailureReport::new("fabric MC versions", "HTTP 503");
        assert_eq!(
            report.to_string(),
            "Error while loading fabric MC versions: HTTP 503"
        );
    }

    #[test]
    fn from_error_keeps_error_text() {
        let report =
            FailureReport::from_error("pack metadata", &MetaError::Parse("bad toml".into()));
        assert_eq!(report.operation, "pack metadata");
        assert_eq!(report.message, "parse error: bad toml");
    }
}
