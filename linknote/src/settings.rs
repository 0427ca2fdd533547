use serde::Deserialize;
use std::path::PathBuf;

/// Which backend to try first.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Try the SQLite database, fall back to the flat store if it can't be opened.
    #[default]
    Indexed,
    /// Use the flat store only.
    Flat,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: BackendPreference,
    #[serde(default = "default_database_path")]
    pub databasepath: PathBuf,
    #[serde(default = "default_flat_dir")]
    pub flatdir: PathBuf,
    /// Keep everything in memory: in-memory SQLite and a memory flat medium.
    #[serde(default)]
    pub inmemory: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("linknote.db")
}

fn default_flat_dir() -> PathBuf {
    PathBuf::from("linknote-data")
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            backend: BackendPreference::default(),
            databasepath: default_database_path(),
            flatdir: default_flat_dir(),
            inmemory: false,
        }
    }
}

impl StorageSettings {
    /// Settings that never touch the filesystem.
    pub fn in_memory(backend: BackendPreference) -> Self {
        StorageSettings {
            backend,
            inmemory: true,
            ..Default::default()
        }
    }
}
