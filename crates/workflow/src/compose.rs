//! Launch specification for the registry service.
//!
//! The compose document is derived from the configuration snapshot alone, so
//! rendering twice from the same snapshot yields the same bytes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ConfigOption, ConfigSnapshot};
use crate::error::{Error, Result};
use crate::layout::Layout;

const SERVICE: &str = "registry";
const CONTAINER_PORT: u16 = 5000;
const DEFAULT_TAG: &str = "2";

const CERT_MOUNT: &str = "/certs/docker-registry.crt";
const KEY_MOUNT: &str = "/certs/docker-registry.key";
const HTPASSWD_MOUNT: &str = "/auth/htpasswd";
const CONFIG_MOUNT: &str = "/etc/docker/registry/config.yml";
const STORAGE_MOUNT: &str = "/var/lib/registry";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeFile {
    version: String,
    services: BTreeMap<String, Service>,
    volumes: BTreeMap<String, Volume>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    image: String,
    restart: String,
    ports: Vec<String>,
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Volume {}

impl ComposeFile {
    /// Build the document for the given snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the port is missing or invalid.
    pub fn from_snapshot(layout: &Layout, snapshot: &ConfigSnapshot) -> Result<Self> {
        let port = snapshot.port()?;
        let tag = snapshot.tag().unwrap_or(DEFAULT_TAG);

        let mut volumes = vec![format!("{}:{STORAGE_MOUNT}", layout.registry_volume)];
        let mut environment = BTreeMap::new();

        let tls = snapshot.is_supplied(ConfigOption::RegistryCert)
            && snapshot.is_supplied(ConfigOption::RegistryKey);
        if tls {
            volumes.push(read_only(&layout.tls_cert.display().to_string(), CERT_MOUNT));
            volumes.push(read_only(&layout.tls_key.display().to_string(), KEY_MOUNT));
            environment.insert("REGISTRY_HTTP_TLS_CERTIFICATE".into(), CERT_MOUNT.into());
            environment.insert("REGISTRY_HTTP_TLS_KEY".into(), KEY_MOUNT.into());
        }

        if tls && snapshot.is_supplied(ConfigOption::RegistryHtpasswd) {
            volumes.push(read_only(&layout.htpasswd.display().to_string(), HTPASSWD_MOUNT));
            environment.insert("REGISTRY_AUTH".into(), "htpasswd".into());
            environment.insert("REGISTRY_AUTH_HTPASSWD_REALM".into(), "Registry Realm".into());
            environment.insert("REGISTRY_AUTH_HTPASSWD_PATH".into(), HTPASSWD_MOUNT.into());
        }

        if snapshot.is_supplied(ConfigOption::RegistryConfig) {
            volumes.push(read_only(
                &layout.registry_config.display().to_string(),
                CONFIG_MOUNT,
            ));
        }

        let service = Service {
            image: format!("registry:{tag}"),
            restart: "always".into(),
            ports: vec![format!("{port}:{CONTAINER_PORT}")],
            volumes,
            environment,
        };

        Ok(Self {
            version: "2".into(),
            services: BTreeMap::from([(SERVICE.to_string(), service)]),
            volumes: BTreeMap::from([(layout.registry_volume.clone(), Volume::default())]),
        })
    }

    /// YAML rendering of the document.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if serialisation fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::invalid_config("launch specification", e.to_string()))
    }

    pub fn service(&self) -> Option<&Service> {
        self.services.get(SERVICE)
    }
}

impl Service {
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn volumes(&self) -> &[String] {
        &self.volumes
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

fn read_only(host: &str, container: &str) -> String {
    format!("{host}:{container}:ro")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> ConfigSnapshot {
        ConfigSnapshot::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_plain_registry() -> Result<()> {
        let compose = ComposeFile::from_snapshot(
            &Layout::default(),
            &snapshot(&[("registry_port", "5001"), ("registry_tag", "2.8")]),
        )?;
        let service = compose.service().ok_or_else(|| Error::missing_resource("service"))?;
        assert_eq!(service.image(), "registry:2.8");
        assert_eq!(service.ports(), ["5001:5000".to_string()]);
        assert_eq!(service.volumes(), ["registry:/var/lib/registry".to_string()]);
        assert!(service.environment().is_empty());

        let yaml = compose.to_yaml()?;
        assert!(yaml.contains("registry:2.8"));
        assert!(!yaml.contains("environment"));
        Ok(())
    }

    #[test]
    fn test_tls_and_auth_mounts() -> Result<()> {
        let compose = ComposeFile::from_snapshot(
            &Layout::default(),
            &snapshot(&[
                ("registry_port", "443"),
                ("registry_cert", "Y2VydA=="),
                ("registry_key", "a2V5"),
                ("registry_htpasswd", "dXNlcjpwdw=="),
            ]),
        )?;
        let service = compose.service().ok_or_else(|| Error::missing_resource("service"))?;
        assert_eq!(service.image(), "registry:2");
        assert_eq!(service.volumes().len(), 4);
        assert_eq!(
            service.environment().get("REGISTRY_AUTH").map(String::as_str),
            Some("htpasswd")
        );
        Ok(())
    }

    #[test]
    fn test_missing_port_is_invalid() {
        let result = ComposeFile::from_snapshot(&Layout::default(), &snapshot(&[]));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
