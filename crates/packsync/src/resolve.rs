use crate::descriptor::Snapshot;
use crate::provider::VersionProvider;
use crate::report::FailureReport;

/// Version lists for one loader family, with the entries a pack points at
/// preselected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub engine_versions: Vec<String>,
    pub selected_engine: Option<String>,
    pub loader_versions: Vec<String>,
    pub selected_loader: Option<String>,
}

/// List engine versions, then loader versions for the selected engine.
///
/// A pack's versions are preselected only when the pack names this
/// provider's component and the version appears in the list; otherwise the
/// first entry wins.
pub async fn resolve(
    provider: &dyn VersionProvider,
    snapshot: Option<&Snapshot>,
    stable_only: bool,
) -> Result<Resolution, FailureReport> {
    let name = provider.identify();
    let pinned_loader = snapshot.and_then(|s| s.component(name));
    let pinned_engine = snapshot
        .filter(|_| pinned_loader.is_some())
        .and_then(Snapshot::minecraft_version);

    let engine_versions = provider
        .list_engine_versions(stable_only)
        .await
        .map_err(|e| FailureReport::from_error(format!("{name} MC versions"), &e))?;
    let selected_engine = preselect(&engine_versions, pinned_engine);

    let Some(engine) = selected_engine.clone() else {
        return Ok(Resolution {
            engine_versions,
            ..Resolution::default()
        });
    };

    let loader_versions = provider
        .list_loader_versions(&engine, stable_only)
        .await
        .map_err(|e| FailureReport::from_error(format!("{name} versions"), &e))?;
    let selected_loader = preselect(&loader_versions, pinned_loader);

    tracing::debug!(
        provider = name,
        engine = %engine,
        loader = ?selected_loader,
        "resolved versions"
    );

    Ok(Resolution {
        engine_versions,
        selected_engine: Some(engine),
        loader_versions,
        selected_loader,
    })
}

fn preselect(versions: &[String], pinned: Option<&str>) -> Option<String> {
    pinned
        .and_then(|wanted| versions.iter().find(|v| *v == wanted))
        .or_else(|| versions.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::descriptor::parse_descriptor;
    use crate::locator::Locator;
    use crate::provider::{Endpoints, LoaderKind};
    use crate::test_support::InMemoryTransport;
    use crate::transport::MetaError;

    const GAME: &str = "https://meta.fabricmc.net/v2/versions/game";
    const YARN: &str = "https://meta.fabricmc.net/v2/versions/yarn";

    fn fabric_transport() -> Arc<InMemoryTransport> {
        let transport = Arc::new(InMemoryTransport::new("memory"));
        transport.insert(
            &Locator::parse(GAME).unwrap(),
            r#"[{"version":"1.20.2","stable":true},{"version":"1.20.1","stable":true}]"#,
        );
        transport.insert(
            &Locator::parse(YARN).unwrap(),
            r#"[
                {"gameVersion":"1.20.1","version":"1.20.1+build.10","stable":true},
                {"gameVersion":"1.20.1","version":"1.20.1+build.9","stable":true},
                {"gameVersion":"1.20.2","version":"1.20.2+build.4","stable":true}
            ]"#,
        );
        transport
    }

    fn snapshot(versions: &str) -> Snapshot {
        let text = format!(
            "name = \"p\"\npack-format = \"packwiz:1.1.0\"\n[index]\nfile = \"index.toml\"\nhash-format = \"sha256\"\nhash = \"00\"\n[versions]\n{versions}"
        );
        parse_descriptor(text.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn without_snapshot_first_entries_are_selected() {
        let provider = LoaderKind::Fabric.provider(fabric_transport(), &Endpoints::default());

        let resolution = resolve(provider.as_ref(), None, false).await.unwrap();

        assert_eq!(resolution.engine_versions, vec!["1.20.2", "1.20.1"]);
        assert_eq!(resolution.selected_engine.as_deref(), Some("1.20.2"));
        assert_eq!(resolution.loader_versions, vec!["1.20.2+build.4"]);
        assert_eq!(resolution.selected_loader.as_deref(), Some("1.20.2+build.4"));
    }

    #[tokio::test]
    async fn pack_versions_are_preselected() {
        let provider = LoaderKind::Fabric.provider(fabric_transport(), &Endpoints::default());
        let pack = snapshot("minecraft = \"1.20.1\"\nfabric = \"1.20.1+build.9\"\n");

        let resolution = resolve(provider.as_ref(), Some(&pack), false).await.unwrap();

        assert_eq!(resolution.selected_engine.as_deref(), Some("1.20.1"));
        assert_eq!(
            resolution.loader_versions,
            vec!["1.20.1+build.10", "1.20.1+build.9"]
        );
        assert_eq!(resolution.selected_loader.as_deref(), Some("1.20.1+build.9"));
    }

    #[tokio::test]
    async fn unknown_pack_versions_fall_back_to_first() {
        let provider = LoaderKind::Fabric.provider(fabric_transport(), &Endpoints::default());
        let pack = snapshot("minecraft = \"1.20.1\"\nfabric = \"0.0.1\"\n");

        let resolution = resolve(provider.as_ref(), Some(&pack), false).await.unwrap();

        assert_eq!(resolution.selected_engine.as_deref(), Some("1.20.1"));
        assert_eq!(resolution.selected_loader.as_deref(), Some("1.20.1+build.10"));
    }

    #[tokio::test]
    async fn engine_pin_needs_matching_component() {
        let provider = LoaderKind::Fabric.provider(fabric_transport(), &Endpoints::default());
        let pack = snapshot("minecraft = \"1.20.1\"\nforge = \"47.1.0\"\n");

        let resolution = resolve(provider.as_ref(), Some(&pack), false).await.unwrap();

        assert_eq!(resolution.selected_engine.as_deref(), Some("1.20.2"));
    }

    #[tokio::test]
    async fn empty_engine_list_skips_loader_lookup() {
        let transport = Arc::new(InMemoryTransport::new("memory"));
        transport.insert(&Locator::parse(GAME).unwrap(), "[]");
        let provider = LoaderKind::Fabric.provider(transport.clone(), &Endpoints::default());

        let resolution = resolve(provider.as_ref(), None, false).await.unwrap();

        assert_eq!(resolution, Resolution::default());
        assert_eq!(transport.reads(&Locator::parse(YARN).unwrap()), 0);
    }

    #[tokio::test]
    async fn failures_name_the_operation() {
        let transport = fabric_transport();
        transport.fail_next(
            &Locator::parse(GAME).unwrap(),
            MetaError::Fetch("HTTP 503 Service Unavailable".into()),
        );
        let provider = LoaderKind::Fabric.provider(transport.clone(), &Endpoints::default());

        let report = resolve(provider.as_ref(), None, false).await.unwrap_err();
        assert_eq!(
            report.to_string(),
            "Error while loading fabric MC versions: fetch error: HTTP 503 Service Unavailable"
        );

        transport.fail_next(
            &Locator::parse(YARN).unwrap(),
            MetaError::Fetch("timed out".into()),
        );
        let report = resolve(provider.as_ref(), None, false).await.unwrap_err();
        assert_eq!(report.operation, "fabric versions");
    }
}
