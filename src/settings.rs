//! `drydock.toml`: where state lives, host paths, tool names and the
//! operator options.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use drydock_events::DEFAULT_MAX_PASSES;
use drydock_workflow::system::Commands;
use drydock_workflow::{ConfigOption, Layout};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/drydock/drydock.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Owner given to data directories created on attached storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub const ROOT: Self = Self { uid: 0, gid: 0 };
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the fact store.
    pub state_dir: PathBuf,
    /// Directory searched for operator-supplied resources.
    pub resources_dir: PathBuf,
    /// Cap on evaluation passes per trigger.
    pub max_passes: usize,
    /// Owner of created data directories, root by default.
    pub data_owner: Owner,
    pub layout: Layout,
    pub commands: Commands,
    /// Operator options, keyed by option name.
    pub options: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/drydock"),
            resources_dir: PathBuf::from("/var/lib/drydock/resources"),
            max_passes: DEFAULT_MAX_PASSES,
            data_owner: Owner::ROOT,
            layout: Layout::default(),
            commands: Commands::default(),
            options: default_options(),
        }
    }
}

fn default_options() -> BTreeMap<String, String> {
    BTreeMap::from([
        (ConfigOption::RegistryPort.key().to_string(), "5000".to_string()),
        (ConfigOption::RegistryTag.key().to_string(), "2".to_string()),
    ])
}

impl Settings {
    /// Parse settings from TOML text. Options not mentioned keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text does not describe settings.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Self = toml::from_str(text)?;
        for (key, value) in default_options() {
            settings.options.entry(key).or_insert(value);
        }
        Ok(settings)
    }

    /// Load settings from `path`. A missing file at the default location
    /// yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Read` if an explicitly given file cannot be
    /// read and `SettingsError::Parse` if it is not valid.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text).map_err(|source| SettingsError::Parse { path, source }),
            Err(source) if !explicit && source.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Read { path, source }),
        }
    }

    /// Location of the fact store.
    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join("facts")
    }
}
