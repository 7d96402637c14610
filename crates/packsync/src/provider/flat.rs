use std::collections::HashSet;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tokio::sync::OnceCell;

use super::VersionProvider;
use crate::locator::Locator;
use crate::transport::{MetaError, Transport};

/// One `<engine>-<loader>` index entry, split on the first hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FlatEntry {
    engine: String,
    loader: String,
}

impl FlatEntry {
    fn split(raw: &str) -> Result<Self, MetaError> {
        match raw.split_once('-') {
            Some((engine, loader)) if !engine.is_empty() => Ok(Self {
                engine: engine.to_owned(),
                loader: loader.to_owned(),
            }),
            _ => Err(MetaError::Parse(format!("malformed index entry {raw:?}"))),
        }
    }
}

/// Version provider backed by a single maven metadata document listing
/// combined `<engine>-<loader>` versions. The index has no stability
/// information, so `stable_only` has no effect.
pub struct FlatIndexProvider {
    name: String,
    transport: Arc<dyn Transport>,
    index: Locator,
    entries: OnceCell<Vec<FlatEntry>>,
}

impl FlatIndexProvider {
    pub fn new(name: impl Into<String>, transport: Arc<dyn Transport>, index: Locator) -> Self {
        Self {
            name: name.into(),
            transport,
            index,
            entries: OnceCell::new(),
        }
    }

    async fn entries(&self) -> Result<&[FlatEntry], MetaError> {
        let entries = self
            .entries
            .get_or_try_init(|| async {
                tracing::debug!(provider = %self.name, index = %self.index, "fetching flat index");
                let bytes = self.transport.read(&self.index).await?;
                parse_index(&bytes)
            })
            .await?;
        Ok(entries.as_slice())
    }
}

#[async_trait::async_trait]
impl VersionProvider for FlatIndexProvider {
    fn identify(&self) -> &str {
        &self.name
    }

    async fn list_engine_versions(&self, _stable_only: bool) -> Result<Vec<String>, MetaError> {
        let entries = self.entries().await?;
        let mut seen = HashSet::new();

        Ok(entries
            .iter()
            .filter(|entry| seen.insert(entry.engine.as_str()))
            .map(|entry| entry.engine.clone())
            .collect())
    }

    async fn list_loader_versions(
        &self,
        engine_version: &str,
        _stable_only: bool,
    ) -> Result<Vec<String>, MetaError> {
        Ok(self
            .entries()
            .await?
            .iter()
            .filter(|entry| entry.engine == engine_version)
            .map(|entry| entry.loader.clone())
            .collect())
    }
}

fn parse_index(bytes: &[u8]) -> Result<Vec<FlatEntry>, MetaError> {
    read_versions(bytes)?
        .iter()
        .map(|raw| FlatEntry::split(raw))
        .collect()
}

/// Text of every `<version>` element, in document order.
fn read_versions(bytes: &[u8]) -> Result<Vec<String>, MetaError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MetaError::Parse(format!("index is not UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut in_version = false;
    let mut versions = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => in_version = tag.name().as_ref() == b"version",
            Ok(Event::End(_)) => in_version = false,
            Ok(Event::Text(content)) if in_version => {
                let value = content
                    .unescape()
                    .map_err(|e| MetaError::Parse(format!("invalid index text: {e}")))?;
                versions.push(value.into_owned());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(MetaError::Parse(format!("invalid index XML: {e}"))),
        }
    }

    Ok(versions)
}
