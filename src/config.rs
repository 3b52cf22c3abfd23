use anyhow::Context;
use serde::Deserialize;
use std::{path::Path, time::Duration};

use crate::annotate::correlate::Strategy;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "deezer-avail.toml";

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub selectors: Selectors,
    pub annotate: AnnotateConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }

    /// Loads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// An explicitly given path has to exist. Without one, the default path
    /// is tried and the built-in defaults are used when it is absent.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Config> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Pause after every track request.
    pub delay_ms: u64,
}

impl ApiConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deezer.com".to_string(),
            delay_ms: 1000,
        }
    }
}

/// Where things live in the album page markup. The class names are the
/// minified ones Deezer ships and change with their frontend builds.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Selectors {
    pub meta: String,
    pub track_list: String,
    pub row: String,
    pub disk_separator: String,
    pub label: String,
    pub title: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            meta: r#"meta[property="music:song"]"#.to_string(),
            track_list: r#"div[role="rowgroup"].ZOZXb"#.to_string(),
            row: r#"div[role="row"].JR0qJ"#.to_string(),
            disk_separator: r#"div[role="row"].nqfmm"#.to_string(),
            label: r#"div[role="gridcell"] div.A0Vbi"#.to_string(),
            title: r#"div.XrQj3 span[data-testid="title"]"#.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnnotateConfig {
    pub strategy: Strategy,
    pub license_country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
[api]
base_url = "http://127.0.0.1:9000"
delay_ms = 250

[selectors]
row = 'div[role="row"].new-row'

[annotate]
strategy = "title"
license_country = "FR"
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert_eq!(cfg.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.api.delay(), Duration::from_millis(250));
        assert_eq!(cfg.selectors.row, r#"div[role="row"].new-row"#);
        // untouched selectors keep their defaults
        assert_eq!(cfg.selectors.title, Selectors::default().title);
        assert_eq!(cfg.annotate.strategy, Strategy::Title);
        assert_eq!(cfg.annotate.license_country.as_deref(), Some("FR"));

        Ok(())
    }

    #[test]
    fn test_empty_config_uses_defaults() -> anyhow::Result<()> {
        let cfg: Config = toml::from_str("")?;

        assert_eq!(cfg.api.base_url, "https://api.deezer.com");
        assert_eq!(cfg.api.delay_ms, 1000);
        assert_eq!(cfg.selectors, Selectors::default());
        assert_eq!(cfg.annotate.strategy, Strategy::Coordinate);
        assert!(cfg.annotate.license_country.is_none());

        Ok(())
    }

    #[test]
    fn test_load_or_default_reads_existing_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[api]\ndelay_ms = 5")?;

        let cfg = Config::load_or_default(file.path())?;
        assert_eq!(cfg.api.delay_ms, 5);

        let missing = file.path().with_extension("missing");
        let cfg = Config::load_or_default(&missing)?;
        assert_eq!(cfg.api.delay_ms, 1000);

        Ok(())
    }

    #[test]
    fn test_resolve_rejects_missing_explicit_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let typo = dir.path().join("typo.toml");

        let err = Config::resolve(Some(&typo)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));

        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[annotate]\nlicense_country = \"DE\"")?;
        let cfg = Config::resolve(Some(file.path()))?;
        assert_eq!(cfg.annotate.license_country.as_deref(), Some("DE"));
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_an_error() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[api\ndelay_ms = ")?;

        assert!(Config::load(file.path()).is_err());
        Ok(())
    }
}
