use std::sync::Arc;

use anyhow::{Result, bail};
use packsync::{
    Endpoints, LoaderKind, Locator, Resolution, Snapshot, Transport, UpdateCoordinator,
    UpdateEvent, resolve,
};

use super::format;

/// Fetch the descriptor behind `locator` through the update coordinator.
pub async fn fetch_snapshot(
    transport: Arc<dyn Transport>,
    locator: Locator,
) -> Result<Arc<Snapshot>> {
    let (coordinator, mut events) = UpdateCoordinator::new(transport);
    coordinator.request_update(locator);

    match events.recv().await {
        Some(UpdateEvent::SnapshotReady { snapshot, .. }) => Ok(snapshot),
        Some(UpdateEvent::Failed { report, .. }) => Err(report.into()),
        None => bail!("descriptor fetch ended without a result"),
    }
}

/// Resolve versions for the loader the pack names, if any.
pub async fn resolve_snapshot(
    transport: Arc<dyn Transport>,
    endpoints: &Endpoints,
    snapshot: &Snapshot,
    stable_only: bool,
) -> Result<Option<(LoaderKind, Resolution)>> {
    let Some((kind, _)) = snapshot.detect_loader() else {
        return Ok(None);
    };

    let provider = kind.provider(transport, endpoints);
    let resolution = resolve(provider.as_ref(), Some(snapshot), stable_only).await?;
    Ok(Some((kind, resolution)))
}

pub async fn run(
    transport: Arc<dyn Transport>,
    endpoints: &Endpoints,
    locator: Locator,
    stable_only: bool,
) -> Result<()> {
    let snapshot = fetch_snapshot(Arc::clone(&transport), locator).await?;
    print!("{}", format::snapshot_details(&snapshot));

    if !snapshot.pack_format.is_supported() {
        tracing::warn!(format = %snapshot.pack_format, "unrecognized pack format");
    }

    println!();
    match resolve_snapshot(transport, endpoints, &snapshot, stable_only).await? {
        Some((kind, resolution)) => print!("{}", format::resolution_details(kind, &resolution)),
        None => println!("No supported loader in pack versions"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use packsync::test_support::InMemoryTransport;

    use super::*;

    const PACK: &str = "https://packs.test/pack.toml";
    const FORGE_INDEX: &str =
        "https://maven.minecraftforge.net/net/minecraftforge/forge/maven-metadata.xml";

    fn pack_toml(loader: &str) -> String {
        format!(
            "name = \"Cozy\"\npack-format = \"packwiz:1.1.0\"\n\n[index]\nfile = \"index.toml\"\nhash-format = \"sha256\"\nhash = \"00\"\n\n[versions]\nminecraft = \"1.19.2\"\n{loader}\n"
        )
    }

    fn transport() -> Arc<InMemoryTransport> {
        let transport = Arc::new(InMemoryTransport::new("memory"));
        transport.insert(
            &Locator::parse(FORGE_INDEX).unwrap(),
            "<metadata><versioning><versions><version>1.20.1-47.1.0</version><version>1.19.2-43.2.0</version><version>1.19.2-43.1.1</version></versions></versioning></metadata>",
        );
        transport
    }

    #[tokio::test]
    async fn fetches_and_resolves_forge_pack() {
        let transport = transport();
        transport.insert(&Locator::parse(PACK).unwrap(), pack_toml("forge = \"43.1.1\""));

        let snapshot = fetch_snapshot(transport.clone(), Locator::parse(PACK).unwrap())
            .await
            .unwrap();
        assert_eq!(snapshot.name, "Cozy");

        let (kind, resolution) =
            resolve_snapshot(transport, &Endpoints::default(), &snapshot, false)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(kind, LoaderKind::Forge);
        assert_eq!(resolution.selected_engine.as_deref(), Some("1.19.2"));
        assert_eq!(resolution.loader_versions, vec!["43.2.0", "43.1.1"]);
        assert_eq!(resolution.selected_loader.as_deref(), Some("43.1.1"));
    }

    #[tokio::test]
    async fn pack_without_loader_resolves_nothing() {
        let transport = transport();
        transport.insert(&Locator::parse(PACK).unwrap(), pack_toml(""));

        let snapshot = fetch_snapshot(transport.clone(), Locator::parse(PACK).unwrap())
            .await
            .unwrap();
        let resolved = resolve_snapshot(transport.clone(), &Endpoints::default(), &snapshot, false)
            .await
            .unwrap();

        assert!(resolved.is_none());
        assert_eq!(transport.reads(&Locator::parse(FORGE_INDEX).unwrap()), 0);
    }

    #[tokio::test]
    async fn missing_pack_reports_failure() {
        let err = fetch_snapshot(transport(), Locator::parse(PACK).unwrap())
            .await
            .unwrap_err();

        assert!(
            err.to_string()
                .starts_with("Error while loading pack metadata: fetch error")
        );
    }
}
