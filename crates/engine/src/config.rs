use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use kts_storage::SqliteStorage;

use crate::error::EngineError;
use crate::request::DEFAULT_AUTHORITY;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// `None` keeps the store in memory.
    pub database_path: Option<PathBuf>,
    /// Authority of issued resource references and the change channel name.
    pub authority: String,
    /// Apply the missing/malformed id checks to `artist/albums` queries.
    pub artist_albums_strict: bool,
    pub notify_capacity: usize,
    pub generator: GeneratorConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            authority: DEFAULT_AUTHORITY.to_string(),
            artist_albums_strict: false,
            notify_capacity: 64,
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub interval_secs: u64,
    pub new_artists: bool,
    pub new_albums: bool,
    pub shuffle_albums: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            new_artists: true,
            new_albums: true,
            shuffle_albums: true,
        }
    }
}

impl ProviderConfig {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.authority.trim().is_empty() {
            return Err(EngineError::Config("authority must not be empty".into()));
        }
        if self.notify_capacity == 0 {
            return Err(EngineError::Config("notify_capacity must be at least 1".into()));
        }
        if self.generator.interval_secs == 0 {
            return Err(EngineError::Config("generator.interval_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn open_storage(&self) -> Result<SqliteStorage, EngineError> {
        let storage = match &self.database_path {
            Some(path) => SqliteStorage::open(path)?,
            None => SqliteStorage::open_in_memory()?,
        };
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ProviderConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.authority, "com.lasley.provider");
        assert!(!config.artist_albums_strict);
        assert!(config.generator.shuffle_albums);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = ProviderConfig::from_toml_str(
            r#"
            database_path = "/tmp/kts.db"
            artist_albums_strict = true

            [generator]
            interval_secs = 10
            shuffle_albums = false
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/kts.db")));
        assert!(config.artist_albums_strict);
        assert_eq!(config.notify_capacity, 64);
        assert_eq!(config.generator.interval_secs, 10);
        assert!(config.generator.new_albums);
        assert!(!config.generator.shuffle_albums);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ProviderConfig::from_toml_str("notify_capacity = 0"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            ProviderConfig::from_toml_str("authority = \" \""),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            ProviderConfig::from_toml_str("notify_capacity = \"lots\""),
            Err(EngineError::Toml(_))
        ));
    }

    #[test]
    fn load_reads_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("provider.toml");
        std::fs::write(&path, "authority = \"org.example.kts\"\n")?;
        let config = ProviderConfig::load(&path)?;
        assert_eq!(config.authority, "org.example.kts");
        assert!(matches!(
            ProviderConfig::load(&dir.path().join("missing.toml")),
            Err(EngineError::Io(_))
        ));
        Ok(())
    }
}
