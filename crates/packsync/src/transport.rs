use std::sync::Arc;

use crate::locator::Locator;

/// Errors that can occur while fetching or interpreting pack metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// The read was abandoned. Superseded fetches end this way and are
    /// never shown to the user.
    #[error("cancelled")]
    Cancelled,
}

impl MetaError {
    /// True for errors that should be surfaced to the user.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Reads the raw bytes behind a locator.
///
/// Implementations decide how each scheme is reached (network, filesystem,
/// memory). Reads are cancelled by dropping the returned future, so an
/// implementation must not leave work running after it is dropped.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable label identifying this transport.
    fn label(&self) -> &str;

    /// Read the full document behind `locator`.
    async fn read(&self, locator: &Locator) -> Result<Vec<u8>, MetaError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn read(&self, locator: &Locator) -> Result<Vec<u8>, MetaError> {
        (**self).read(locator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_not_reportable() {
        assert!(!MetaError::Cancelled.is_reportable());
        assert!(MetaError::Fetch("boom".into()).is_reportable());
        assert!(MetaError::Parse("bad".into()).is_reportable());
        assert!(MetaError::InvalidLocator("x".into()).is_reportable());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            MetaError::Fetch("HTTP 404".into()).to_string(),
            "fetch error: HTTP 404"
        );
        assert_eq!(
            MetaError::InvalidLocator("ftp".into()).to_string(),
            "invalid locator: ftp"
        );
    }
}
