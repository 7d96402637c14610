use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::OnceCell;

use super::{VersionProvider, fetch_json};
use crate::locator::Locator;
use crate::transport::{MetaError, Transport};

/// Whether loader entries in a paired index carry a stability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderStability {
    /// Entries may carry `stable`; a missing flag means unstable.
    Flagged,
    /// Entries carry no flag; every entry counts as stable.
    Absent,
}

#[derive(Debug, Clone, Deserialize)]
struct EngineEntry {
    version: String,
    #[serde(default)]
    stable: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoaderEntry {
    version: String,
    game_version: String,
    #[serde(default)]
    stable: Option<bool>,
}

/// Version provider backed by two JSON arrays: engine versions and loader
/// (or mapping) versions tagged with the engine version they target.
pub struct PairedListProvider {
    name: String,
    stability: LoaderStability,
    transport: Arc<dyn Transport>,
    engine_index: Locator,
    loader_index: Locator,
    engines: OnceCell<Vec<EngineEntry>>,
    loaders: OnceCell<Vec<LoaderEntry>>,
}

impl PairedListProvider {
    pub fn new(
        name: impl Into<String>,
        stability: LoaderStability,
        transport: Arc<dyn Transport>,
        engine_index: Locator,
        loader_index: Locator,
    ) -> Self {
        Self {
            name: name.into(),
            stability,
            transport,
            engine_index,
            loader_index,
            engines: OnceCell::new(),
            loaders: OnceCell::new(),
        }
    }

    async fn engines(&self) -> Result<&[EngineEntry], MetaError> {
        let entries = self
            .engines
            .get_or_try_init(|| async {
                tracing::debug!(provider = %self.name, index = %self.engine_index, "fetching engine index");
                fetch_json::<Vec<EngineEntry>>(self.transport.as_ref(), &self.engine_index).await
            })
            .await?;
        Ok(entries.as_slice())
    }

    async fn loaders(&self) -> Result<&[LoaderEntry], MetaError> {
        let entries = self
            .loaders
            .get_or_try_init(|| async {
                tracing::debug!(provider = %self.name, index = %self.loader_index, "fetching loader index");
                fetch_json::<Vec<LoaderEntry>>(self.transport.as_ref(), &self.loader_index).await
            })
            .await?;
        Ok(entries.as_slice())
    }

    fn loader_is_stable(&self, entry: &LoaderEntry) -> bool {
        match self.stability {
            LoaderStability::Flagged => entry.stable.unwrap_or(false),
            LoaderStability::Absent => true,
        }
    }
}

#[async_trait::async_trait]
impl VersionProvider for PairedListProvider {
    fn identify(&self) -> &str {
        &self.name
    }

    async fn list_engine_versions(&self, stable_only: bool) -> Result<Vec<String>, MetaError> {
        Ok(self
            .engines()
            .await?
            .iter()
            .filter(|entry| entry.stable || !stable_only)
            .map(|entry| entry.version.clone())
            .collect())
    }

    async fn list_loader_versions(
        &self,
        engine_version: &str,
        stable_only: bool,
    ) -> Result<Vec<String>, MetaError> {
        Ok(self
            .loaders()
            .await?
            .iter()
            .filter(|entry| entry.game_version == engine_version)
            .filter(|entry| self.loader_is_stable(entry) || !stable_only)
            .map(|entry| entry.version.clone())
            .collect())
    }
}
