//! Service configuration (TOML file plus environment overrides)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::DEFAULT_VERIFICATION_TTL_SECS;
use crate::error::{PrivmapError, Result};
use crate::registry::{MappingTableBuilder, PrivilegeMappingTable};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind: String,
    /// tracing-subscriber filter directive
    pub log_filter: String,
    /// Added on top of the built-in required privileges
    pub required_privileges: Vec<String>,
    pub verification_ttl_secs: u64,
    /// JSON files with mapping entries, registered in order
    pub mapping_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/privmap"),
            bind: "127.0.0.1:3000".to_string(),
            log_filter: "info".to_string(),
            required_privileges: Vec::new(),
            verification_ttl_secs: DEFAULT_VERIFICATION_TTL_SECS,
            mapping_files: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| PrivmapError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Load from `PRIVMAP_CONFIG` if set, then apply `PRIVMAP_DB`,
    /// `PRIVMAP_BIND` and `PRIVMAP_LOG`
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("PRIVMAP_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        if let Ok(db) = std::env::var("PRIVMAP_DB") {
            config.db_path = PathBuf::from(db);
        }
        if let Ok(bind) = std::env::var("PRIVMAP_BIND") {
            config.bind = bind;
        }
        if let Ok(filter) = std::env::var("PRIVMAP_LOG") {
            config.log_filter = filter;
        }
        Ok(config)
    }

    /// Register every configured mapping file and freeze the table
    pub fn build_mapping_table(&self) -> Result<Arc<PrivilegeMappingTable>> {
        let mut builder = MappingTableBuilder::new();
        for file in &self.mapping_files {
            let n = builder.add_entries_from_file(file)?;
            info!(file = %file.display(), entries = n, "loaded privilege mappings");
        }
        Ok(Arc::new(builder.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = toml::from_str(r#"bind = "0.0.0.0:8080""#).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.verification_ttl_secs, DEFAULT_VERIFICATION_TTL_SECS);
        assert_eq!(config.db_path, PathBuf::from("data/privmap"));
    }

    #[test]
    fn load_save_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.required_privileges = vec!["currency:read".into()];
        config.save(file.path()).unwrap();
        assert_eq!(Config::load(file.path()).unwrap(), config);
    }

    #[test]
    fn mapping_files_are_registered() {
        let mut mappings = NamedTempFile::new().unwrap();
        mappings
            .write_all(
                br#"[{"category": "additional_permissions", "key": "system",
                      "roles": {"clear_cache": {"privileges": ["system:clear:cache"]}}}]"#,
            )
            .unwrap();
        let config = Config { mapping_files: vec![mappings.path().to_path_buf()], ..Config::default() };
        let table = config.build_mapping_table().unwrap();
        assert!(table.contains_role("system.clear_cache"));
    }
}
