//! Operator configuration: the current option values and the values seen by
//! the previous invocation.

use std::collections::BTreeMap;
use std::fmt;

use drydock_events::FactStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::flags::facts;

/// Options the operator can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigOption {
    RegistryPort,
    RegistryTag,
    /// Base64 PEM certificate.
    RegistryCert,
    /// Base64 PEM private key.
    RegistryKey,
    /// Base64 htpasswd file.
    RegistryHtpasswd,
    /// Base64 registry configuration file.
    RegistryConfig,
}

impl ConfigOption {
    pub const ALL: [Self; 6] = [
        Self::RegistryPort,
        Self::RegistryTag,
        Self::RegistryCert,
        Self::RegistryKey,
        Self::RegistryHtpasswd,
        Self::RegistryConfig,
    ];

    /// Name of the option as the operator writes it.
    pub const fn key(self) -> &'static str {
        match self {
            Self::RegistryPort => "registry_port",
            Self::RegistryTag => "registry_tag",
            Self::RegistryCert => "registry_cert",
            Self::RegistryKey => "registry_key",
            Self::RegistryHtpasswd => "registry_htpasswd",
            Self::RegistryConfig => "registry_config",
        }
    }

    /// Name of the trigger raised when this option changes.
    pub fn changed_trigger(self) -> String {
        format!("config.changed.{}", self.key())
    }

    /// Look an option up by key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.key() == key)
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Immutable view of the configuration for one invocation.
///
/// An empty string counts as "not supplied", the same as a missing key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    current: BTreeMap<String, String>,
    previous: BTreeMap<String, String>,
}

impl ConfigSnapshot {
    pub fn new(current: BTreeMap<String, String>, previous: BTreeMap<String, String>) -> Self {
        Self { current, previous }
    }

    /// Snapshot whose previous values are those committed by the last
    /// completed invocation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store cannot be read or the recorded
    /// values are not valid JSON.
    pub async fn load(store: &dyn FactStore, current: BTreeMap<String, String>) -> Result<Self> {
        let previous = match store.get(facts::CONFIG_PREVIOUS).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(drydock_events::Error::from)?,
            None => BTreeMap::new(),
        };
        debug!(options = current.len(), "Loaded configuration snapshot");
        Ok(Self { current, previous })
    }

    /// Record the current values as the previous ones for the next
    /// invocation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the store write fails.
    pub async fn commit(&self, store: &dyn FactStore) -> Result<()> {
        let raw = serde_json::to_string(&self.current).map_err(drydock_events::Error::from)?;
        store.set(facts::CONFIG_PREVIOUS, raw).await?;
        Ok(())
    }

    /// Current value of `option`, if supplied.
    pub fn current(&self, option: ConfigOption) -> Option<&str> {
        supplied(&self.current, option)
    }

    /// Value of `option` at the previous invocation, if one existed.
    pub fn previous(&self, option: ConfigOption) -> Option<&str> {
        supplied(&self.previous, option)
    }

    /// Whether `option` currently has a value.
    pub fn is_supplied(&self, option: ConfigOption) -> bool {
        self.current(option).is_some()
    }

    /// Options whose value differs from the previous invocation.
    pub fn changed(&self) -> Vec<ConfigOption> {
        ConfigOption::ALL
            .into_iter()
            .filter(|option| self.current(*option) != self.previous(*option))
            .collect()
    }

    /// Configured port.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the port is missing or not a valid
    /// TCP port.
    pub fn port(&self) -> Result<u16> {
        self.current(ConfigOption::RegistryPort)
            .ok_or_else(|| Error::invalid_config(ConfigOption::RegistryPort.key(), "not set"))
            .and_then(parse_port)
    }

    /// Port configured at the previous invocation, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the recorded port is not valid.
    pub fn previous_port(&self) -> Result<Option<u16>> {
        self.previous(ConfigOption::RegistryPort)
            .map(parse_port)
            .transpose()
    }

    /// Configured image tag.
    pub fn tag(&self) -> Option<&str> {
        self.current(ConfigOption::RegistryTag)
    }
}

fn supplied(values: &BTreeMap<String, String>, option: ConfigOption) -> Option<&str> {
    values
        .get(option.key())
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| {
            Error::invalid_config(
                ConfigOption::RegistryPort.key(),
                format!("'{raw}' is not a TCP port"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_events::InMemoryFactStore;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_value_is_not_supplied() {
        let snapshot = ConfigSnapshot::new(values(&[("registry_cert", "")]), BTreeMap::new());
        assert!(!snapshot.is_supplied(ConfigOption::RegistryCert));
    }

    #[test]
    fn test_changed_lists_differing_options() {
        let snapshot = ConfigSnapshot::new(
            values(&[("registry_port", "5001"), ("registry_tag", "2")]),
            values(&[("registry_port", "5000"), ("registry_tag", "2")]),
        );
        assert_eq!(snapshot.changed(), vec![ConfigOption::RegistryPort]);
    }

    #[test]
    fn test_port_parsing() -> Result<()> {
        let snapshot = ConfigSnapshot::new(values(&[("registry_port", "5000")]), BTreeMap::new());
        assert_eq!(snapshot.port()?, 5000);
        assert_eq!(snapshot.previous_port()?, None);

        let bad = ConfigSnapshot::new(values(&[("registry_port", "http")]), BTreeMap::new());
        assert!(matches!(bad.port(), Err(Error::InvalidConfig { .. })));
        Ok(())
    }

    #[test]
    fn test_option_keys_round_trip() {
        for option in ConfigOption::ALL {
            assert_eq!(ConfigOption::from_key(option.key()), Some(option));
        }
        assert_eq!(
            ConfigOption::RegistryHtpasswd.changed_trigger(),
            "config.changed.registry_htpasswd"
        );
    }

    #[tokio::test]
    async fn test_commit_becomes_next_previous() -> Result<()> {
        let store = InMemoryFactStore::new();
        let first = ConfigSnapshot::load(&store, values(&[("registry_port", "5000")])).await?;
        assert_eq!(first.previous(ConfigOption::RegistryPort), None);
        first.commit(&store).await?;

        let second = ConfigSnapshot::load(&store, values(&[("registry_port", "5001")])).await?;
        assert_eq!(second.previous(ConfigOption::RegistryPort), Some("5000"));
        assert_eq!(second.previous_port()?, Some(5000));
        Ok(())
    }
}
