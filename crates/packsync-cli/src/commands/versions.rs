use anyhow::Result;
use packsync::{FailureReport, VersionProvider};

use super::format;

/// Engine versions, or loader versions for `engine` when given.
pub async fn lookup(
    provider: &dyn VersionProvider,
    engine: Option<&str>,
    stable_only: bool,
) -> Result<Vec<String>, FailureReport> {
    let name = provider.identify();
    match engine {
        None => provider
            .list_engine_versions(stable_only)
            .await
            .map_err(|e| FailureReport::from_error(format!("{name} MC versions"), &e)),
        Some(engine) => provider
            .list_loader_versions(engine, stable_only)
            .await
            .map_err(|e| FailureReport::from_error(format!("{name} versions"), &e)),
    }
}

pub async fn run(
    provider: &dyn VersionProvider,
    engine: Option<&str>,
    stable_only: bool,
) -> Result<()> {
    let versions = lookup(provider, engine, stable_only).await?;

    if versions.is_empty() {
        eprintln!("No versions found");
        return Ok(());
    }

    print!("{}", format::version_list(&versions, None));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use packsync::test_support::InMemoryTransport;
    use packsync::{Endpoints, LoaderKind, Locator, MetaError};

    use super::*;

    const GAME: &str = "https://meta.quiltmc.org/v3/versions/game";
    const MAPPINGS: &str = "https://meta.quiltmc.org/v3/versions/quilt-mappings";

    fn transport() -> Arc<InMemoryTransport> {
        let transport = Arc::new(InMemoryTransport::new("memory"));
        transport.insert(
            &Locator::parse(GAME).unwrap(),
            r#"[{"version":"23w31a","stable":false},{"version":"1.20.1","stable":true}]"#,
        );
        transport.insert(
            &Locator::parse(MAPPINGS).unwrap(),
            r#"[{"gameVersion":"1.20.1","version":"1.20.1+build.23"}]"#,
        );
        transport
    }

    #[tokio::test]
    async fn lists_engine_versions() {
        let provider = LoaderKind::Quilt.provider(transport(), &Endpoints::default());

        assert_eq!(
            lookup(provider.as_ref(), None, true).await.unwrap(),
            vec!["1.20.1"]
        );
        assert_eq!(
            lookup(provider.as_ref(), None, false).await.unwrap(),
            vec!["23w31a", "1.20.1"]
        );
    }

    #[tokio::test]
    async fn lists_loader_versions_for_engine() {
        let provider = LoaderKind::Quilt.provider(transport(), &Endpoints::default());

        assert_eq!(
            lookup(provider.as_ref(), Some("1.20.1"), true).await.unwrap(),
            vec!["1.20.1+build.23"]
        );
    }

    #[tokio::test]
    async fn failure_names_operation() {
        let transport = transport();
        transport.fail_next(
            &Locator::parse(MAPPINGS).unwrap(),
            MetaError::Fetch("HTTP 500".into()),
        );
        let provider = LoaderKind::Quilt.provider(transport, &Endpoints::default());

        let report = lookup(provider.as_ref(), Some("1.20.1"), false)
            .await
            .unwrap_err();
        assert_eq!(report.operation, "fabric versions");
    }
}
