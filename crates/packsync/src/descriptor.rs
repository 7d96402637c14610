use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::provider::LoaderKind;
use crate::transport::MetaError;

/// Component key naming the base game version.
pub const MINECRAFT: &str = "minecraft";

/// Format tag declared by a pack, e.g. `packwiz:1.1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PackFormat(String);

impl PackFormat {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the packwiz 1.x format family.
    pub fn is_supported(&self) -> bool {
        self.0
            .strip_prefix("packwiz:")
            .is_some_and(|version| version == "1" || version.starts_with("1."))
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location and checksum of the pack's index file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexFile {
    pub file: String,
    #[serde(alias = "hashFormat")]
    pub hash_format: String,
    pub hash: String,
}

/// Parsed pack metadata, published by a successful descriptor fetch.
///
/// A snapshot is never edited after publication; a newer fetch replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(alias = "packFormat")]
    pub pack_format: PackFormat,
    pub index: IndexFile,
    /// Component name (`minecraft`, `fabric`, ...) to version.
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn component(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    pub fn minecraft_version(&self) -> Option<&str> {
        self.component(MINECRAFT)
    }

    /// The first known loader family named in the component map, with its
    /// version. Families are checked in the order fabric, quilt, forge.
    pub fn detect_loader(&self) -> Option<(LoaderKind, &str)> {
        LoaderKind::ALL
            .into_iter()
            .find_map(|kind| self.component(kind.key()).map(|version| (kind, version)))
    }
}

/// Parse a `pack.toml` descriptor document.
pub fn parse_descriptor(bytes: &[u8]) -> Result<Snapshot, MetaError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MetaError::Parse(format!("descriptor is not UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    toml::from_str(text).map_err(|e| MetaError::Parse(format!("invalid descriptor: {e}")))
}
