//! Creator configuration model and file store.
//!
//! Each creator has one YAML file in the config directory:
//!
//! ```yaml
//! server_id: 111222333444555666
//! roles:
//!   - sourceServerRole: 10
//!     destServerRole: 20
//! ```
//!
//! Files are named `<creator>.yaml` (lower case); lookups are
//! case-insensitive. The reserved [`TEMPLATE_FILE`] ships with the config
//! directory as documentation and is excluded from enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rolesync_directory::{GuildId, RoleId};

/// Reserved non-functional template file name.
pub const TEMPLATE_FILE: &str = "example.yaml";

/// A pairing of one source role with one destination role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    /// Role in the creator's own server that signals entitlement.
    #[serde(rename = "sourceServerRole")]
    pub source_role: RoleId,
    /// Role mirrored onto the shared destination server.
    #[serde(rename = "destServerRole")]
    pub dest_role: RoleId,
}

/// Parsed per-creator configuration.
///
/// Loaded fresh on every reconciliation; never cached across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorConfig {
    /// Creator name, taken from the file name.
    #[serde(skip)]
    pub creator_name: String,
    /// The creator's source server.
    #[serde(rename = "server_id")]
    pub source_server_id: GuildId,
    /// Mapping sequence. Order is significant only for readability; both
    /// phases run over the full sequence before the next phase starts.
    #[serde(rename = "roles")]
    pub mappings: Vec<RoleMapping>,
}

/// Errors loading creator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file exists for the creator.
    #[error("no configuration found for creator '{creator}'")]
    UnknownCreator { creator: String },

    /// The config directory could not be read.
    #[error("failed to read config directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The creator's file could not be read.
    #[error("failed to read configuration for '{creator}': {source}")]
    Io {
        creator: String,
        #[source]
        source: std::io::Error,
    },

    /// The creator's file is not valid YAML or misses required fields.
    #[error("malformed configuration for '{creator}': {source}")]
    Parse {
        creator: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// File-backed store of per-creator configurations.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Create a store over the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store reads from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load one creator's configuration by case-insensitive name.
    ///
    /// The file name's own casing does not matter either: `Alice.yaml` is
    /// found for any casing of "alice".
    pub fn load(&self, creator_name: &str) -> Result<CreatorConfig, ConfigError> {
        let name = creator_name.to_lowercase();
        let path = self
            .resolve(&name)?
            .ok_or_else(|| ConfigError::UnknownCreator {
                creator: creator_name.to_string(),
            })?;

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            creator: creator_name.to_string(),
            source,
        })?;

        let mut config: CreatorConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                creator: creator_name.to_string(),
                source,
            })?;
        config.creator_name = name;
        Ok(config)
    }

    /// Find the config file for a lowercased creator name, trying the exact
    /// lowercase path first and falling back to a case-insensitive scan of
    /// the directory.
    fn resolve(&self, name: &str) -> Result<Option<PathBuf>, ConfigError> {
        let direct = self.dir.join(format!("{name}.yaml"));
        if direct.is_file() {
            return Ok(Some(direct));
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Directory {
                    path: self.dir.clone(),
                    source,
                })
            }
        };
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Directory {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".yaml"))
            else {
                continue;
            };
            if stem.to_lowercase() == name {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Enumerate configured creators, excluding the reserved template.
    ///
    /// Returns creator names (file stems), sorted for deterministic ticks.
    pub fn list_creators(&self) -> Result<Vec<String>, ConfigError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| ConfigError::Directory {
            path: self.dir.clone(),
            source,
        })?;

        let mut creators = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Directory {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name == TEMPLATE_FILE {
                continue;
            }
            if let Some(stem) = file_name.strip_suffix(".yaml") {
                creators.push(stem.to_string());
            }
        }

        creators.sort();
        Ok(creators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    const VALID: &str = "server_id: 111\nroles:\n  - sourceServerRole: 10\n    destServerRole: 20\n  - sourceServerRole: 11\n    destServerRole: 21\n";

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let mut f = File::create(dir.path().join(name)).unwrap();
            f.write_all(body.as_bytes()).unwrap();
        }
        let store = ConfigStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_parse_wire_format() {
        let config: CreatorConfig = serde_yaml::from_str(VALID).unwrap();
        assert_eq!(config.source_server_id, GuildId::new(111));
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].source_role, RoleId::new(10));
        assert_eq!(config.mappings[0].dest_role, RoleId::new(20));
    }

    #[test]
    fn test_load_is_case_insensitive() {
        let (_dir, store) = store_with(&[("somecreator.yaml", VALID)]);
        let config = store.load("SomeCreator").unwrap();
        assert_eq!(config.creator_name, "somecreator");
        assert_eq!(config.source_server_id, GuildId::new(111));
    }

    #[test]
    fn test_load_resolves_mixed_case_file_name() {
        let (_dir, store) = store_with(&[("SomeCreator.yaml", VALID)]);
        let config = store.load("somecreator").unwrap();
        assert_eq!(config.creator_name, "somecreator");
        assert_eq!(config.source_server_id, GuildId::new(111));

        let config = store.load("SOMECREATOR").unwrap();
        assert_eq!(config.creator_name, "somecreator");
    }

    #[test]
    fn test_enumerated_names_load_back() {
        let (_dir, store) = store_with(&[("Alice.yaml", VALID), ("bob.yaml", VALID)]);
        for creator in store.list_creators().unwrap() {
            assert!(store.load(&creator).is_ok(), "failed to load {creator}");
        }
    }

    #[test]
    fn test_load_unknown_creator() {
        let (_dir, store) = store_with(&[]);
        let err = store.load("ghost").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCreator { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let (_dir, store) = store_with(&[("bad.yaml", "server_id: [not an id")]);
        let err = store.load("bad").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_list_excludes_template() {
        let (_dir, store) = store_with(&[
            ("example.yaml", VALID),
            ("alice.yaml", VALID),
            ("bob.yaml", VALID),
            ("notes.txt", "not a config"),
        ]);
        assert_eq!(store.list_creators().unwrap(), vec!["alice", "bob"]);
    }
}
