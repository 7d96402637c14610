use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::transport::MetaError;

/// How a locator's document is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    File,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::File => "file",
        }
    }

    /// True for schemes served over the network.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http | Self::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a document source: a scheme plus an address or path.
///
/// Two locators are the same request when they compare equal. Syntax checks
/// stop at the scheme; the transport reports anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    scheme: Scheme,
    address: String,
}

impl Locator {
    pub fn new(scheme: Scheme, address: impl Into<String>) -> Self {
        Self {
            scheme,
            address: address.into(),
        }
    }

    /// Parse user-supplied text such as `https://example.com/pack.toml`.
    pub fn parse(text: &str) -> Result<Self, MetaError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MetaError::InvalidLocator("locator is required".into()));
        }

        let (scheme, address) = text
            .split_once("://")
            .ok_or_else(|| MetaError::InvalidLocator(format!("missing scheme in {text:?}")))?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "file" => Scheme::File,
            "github" => {
                return Err(MetaError::InvalidLocator(
                    "github locators are not supported yet".into(),
                ));
            }
            other => {
                return Err(MetaError::InvalidLocator(format!(
                    "unsupported scheme: {other}"
                )));
            }
        };

        if address.is_empty() {
            return Err(MetaError::InvalidLocator(format!(
                "{scheme} locator has no address"
            )));
        }

        Ok(Self {
            scheme,
            address: address.to_owned(),
        })
    }

    /// Build a `file` locator for a filesystem path.
    pub fn from_path(path: &Path) -> Self {
        let display = path.to_string_lossy().replace('\\', "/");
        let address = if display.starts_with('/') {
            display
        } else {
            format!("/{display}")
        };

        Self {
            scheme: Scheme::File,
            address,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The filesystem path for a `file` locator.
    pub fn to_path(&self) -> Option<PathBuf> {
        if self.scheme != Scheme::File {
            return None;
        }

        // `/C:/packs/pack.toml` is a Windows drive path
        let bytes = self.address.as_bytes();
        let path = if bytes.len() > 2 && bytes[0] == b'/' && bytes[2] == b':' {
            &self.address[1..]
        } else {
            self.address.as_str()
        };

        Some(PathBuf::from(path))
    }

    /// Append a path to this locator, e.g. an API route onto a base URL.
    pub fn join(&self, suffix: &str) -> Self {
        let base = self.address.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');

        Self {
            scheme: self.scheme,
            address: format!("{base}/{suffix}"),
        }
    }
}

impl FromStr for Locator {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.address)
    }
}
