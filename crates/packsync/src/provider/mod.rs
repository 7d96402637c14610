//! Engine and loader version lookup against upstream indexes.
//!
//! Every loader family resolves versions through the same
//! [`VersionProvider`] contract. Which strategy backs a family is fixed by
//! its [`IndexFormat`]: paired JSON lists (Fabric, Quilt) or one flat maven
//! index (Forge).

pub mod flat;
pub mod paired;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::locator::{Locator, Scheme};
use crate::transport::{MetaError, Transport};

pub use flat::FlatIndexProvider;
pub use paired::{LoaderStability, PairedListProvider};

/// Resolves engine and loader version lists for one loader family.
///
/// Each instance fetches its backing index at most once; later calls filter
/// the cached copy. A failed fetch is not cached, so the next call retries.
#[async_trait::async_trait]
pub trait VersionProvider: Send + Sync {
    /// Stable identifier of the loader family, used as the component key
    /// when matching against a pack's versions.
    fn identify(&self) -> &str;

    /// Engine versions, most recent first, as ordered upstream.
    async fn list_engine_versions(&self, stable_only: bool) -> Result<Vec<String>, MetaError>;

    /// Loader versions compatible with `engine_version`, in upstream order.
    async fn list_loader_versions(
        &self,
        engine_version: &str,
        stable_only: bool,
    ) -> Result<Vec<String>, MetaError>;
}

#[async_trait::async_trait]
impl<T: VersionProvider + ?Sized> VersionProvider for Arc<T> {
    fn identify(&self) -> &str {
        (**self).identify()
    }

    async fn list_engine_versions(&self, stable_only: bool) -> Result<Vec<String>, MetaError> {
        (**self).list_engine_versions(stable_only).await
    }

    async fn list_loader_versions(
        &self,
        engine_version: &str,
        stable_only: bool,
    ) -> Result<Vec<String>, MetaError> {
        (**self)
            .list_loader_versions(engine_version, stable_only)
            .await
    }
}

/// Shape of an upstream version index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// Engine list and loader list, both carrying stability flags.
    PairedListWithStability,
    /// Engine list with stability flags; loader entries carry none.
    PairedListNoStability,
    /// One list of `<engine>-<loader>` entries.
    FlatIndex,
}

/// Supported loader families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Fabric,
    Quilt,
    Forge,
}

impl LoaderKind {
    /// All families, in the order a pack's components are checked.
    pub const ALL: [LoaderKind; 3] = [Self::Fabric, Self::Quilt, Self::Forge];

    /// Component key naming this family in a pack's versions.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Fabric => "fabric",
            Self::Quilt => "quilt",
            Self::Forge => "forge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s.trim()))
    }

    pub fn index_format(&self) -> IndexFormat {
        match self {
            Self::Fabric => IndexFormat::PairedListWithStability,
            Self::Quilt => IndexFormat::PairedListNoStability,
            Self::Forge => IndexFormat::FlatIndex,
        }
    }

    /// Build a fresh provider, with an empty cache, for this family.
    pub fn provider(
        &self,
        transport: Arc<dyn Transport>,
        endpoints: &Endpoints,
    ) -> Box<dyn VersionProvider> {
        match self.index_format() {
            IndexFormat::PairedListWithStability => Box::new(PairedListProvider::new(
                "fabric",
                LoaderStability::Flagged,
                transport,
                endpoints.fabric_meta.join("v2/versions/game"),
                endpoints.fabric_meta.join("v2/versions/yarn"),
            )),
            // Quilt reports itself as "fabric" and shares its component key
            IndexFormat::PairedListNoStability => Box::new(PairedListProvider::new(
                "fabric",
                LoaderStability::Absent,
                transport,
                endpoints.quilt_meta.join("v3/versions/game"),
                endpoints.quilt_meta.join("v3/versions/quilt-mappings"),
            )),
            IndexFormat::FlatIndex => Box::new(FlatIndexProvider::new(
                "forge",
                transport,
                endpoints
                    .forge_maven
                    .join("net/minecraftforge/forge/maven-metadata.xml"),
            )),
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LoaderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown loader {s:?} (expected fabric, quilt or forge)"))
    }
}

/// Base locations of the upstream indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub fabric_meta: Locator,
    pub quilt_meta: Locator,
    pub forge_maven: Locator,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            fabric_meta: Locator::new(Scheme::Https, "meta.fabricmc.net"),
            quilt_meta: Locator::new(Scheme::Https, "meta.quiltmc.org"),
            forge_maven: Locator::new(Scheme::Https, "maven.minecraftforge.net"),
        }
    }
}

/// Read `locator` and decode it as JSON.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    locator: &Locator,
) -> Result<T, MetaError> {
    let bytes = transport.read(locator).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| MetaError::Parse(format!("invalid index at {locator}: {e}")))
}
