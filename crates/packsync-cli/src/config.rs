use std::path::{Path, PathBuf};
use std::time::Duration;

use packsync::debounce::DEFAULT_DEBOUNCE_MS;
use packsync::{Endpoints, Locator, MetaError};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Quiet period after the last edit before a locator is fetched.
    pub debounce_ms: u64,
    pub stable_only: bool,
    /// Tracing filter, e.g. `info` or `packsync=debug`.
    pub log_level: Option<String>,
    pub timeout_secs: Option<u64>,
    pub endpoints: EndpointConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            stable_only: false,
            log_level: None,
            timeout_secs: None,
            endpoints: EndpointConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Base URLs of the upstream version indexes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub fabric_meta: String,
    pub quilt_meta: String,
    pub forge_maven: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        let defaults = Endpoints::default();
        Self {
            fabric_meta: defaults.fabric_meta.to_string(),
            quilt_meta: defaults.quilt_meta.to_string(),
            forge_maven: defaults.forge_maven.to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn to_endpoints(&self) -> Result<Endpoints, MetaError> {
        Ok(Endpoints {
            fabric_meta: Locator::parse(&self.fabric_meta)?,
            quilt_meta: Locator::parse(&self.quilt_meta)?,
            forge_maven: Locator::parse(&self.forge_maven)?,
        })
    }
}

/// A loaded configuration plus any problem met while reading it. The
/// warning is reported once logging is up.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub warning: Option<String>,
}

/// Config file path: `~/.config/packsync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("packsync").join("config.toml"))
}

/// Load config from the default path, falling back to defaults if missing.
pub fn load_config() -> LoadedConfig {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => LoadedConfig {
            config: AppConfig::default(),
            warning: None,
        },
    }
}

pub fn load_config_from(path: &Path) -> LoadedConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return LoadedConfig {
            config: AppConfig::default(),
            warning: None,
        };
    };

    match toml::from_str::<AppConfig>(&contents) {
        Ok(config) => LoadedConfig {
            config,
            warning: None,
        },
        Err(e) => LoadedConfig {
            config: AppConfig::default(),
            warning: Some(format!(
                "failed to parse config at {}, using defaults: {e}",
                path.display()
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_installer_behavior() {
        let config = AppConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(4000));
        assert!(!config.stable_only);
        assert!(config.log_level.is_none());
        assert!(config.timeout().is_none());
        assert_eq!(config.endpoints.fabric_meta, "https://meta.fabricmc.net");
        assert_eq!(config.endpoints.quilt_meta, "https://meta.quiltmc.org");
        assert_eq!(config.endpoints.forge_maven, "https://maven.minecraftforge.net");
    }

    #[test]
    fn parse_full_config_from_toml() {
        let toml_str = r#"
debounce_ms = 250
stable_only = true
log_level = "packsync=debug"
timeout_secs = 30

[endpoints]
fabric_meta = "http://localhost:8080/fabric"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert!(config.stable_only);
        assert_eq!(config.log_level.as_deref(), Some("packsync=debug"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.endpoints.fabric_meta, "http://localhost:8080/fabric");
        assert_eq!(config.endpoints.quilt_meta, "https://meta.quiltmc.org");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn endpoints_convert_to_locators() {
        let endpoints = EndpointConfig::default().to_endpoints().unwrap();
        assert_eq!(endpoints, Endpoints::default());
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let config = EndpointConfig {
            forge_maven: "maven.example.com".into(),
            ..EndpointConfig::default()
        };
        assert!(matches!(
            config.to_endpoints(),
            Err(MetaError::InvalidLocator(_))
        ));
    }

    #[test]
    fn missing_file_uses_defaults_silently() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("config.toml"));
        assert_eq!(loaded.config, AppConfig::default());
        assert!(loaded.warning.is_none());
    }

    #[test]
    fn malformed_file_warns_and_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "debounce_ms = \"soon\"").unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded.config, AppConfig::default());
        assert!(loaded.warning.unwrap().contains("config.toml"));
    }
}
