//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drydock_events::Trigger;

/// drydock - docker registry lifecycle controller
#[derive(Parser, Debug)]
#[command(name = "drydock")]
#[command(version)]
#[command(about = "Lifecycle controller for a containerized docker registry")]
#[command(
    long_about = "drydock reacts to hook invocations (configuration changes, storage attach and detach, runtime availability) and keeps the registry service, its artifacts and its data directory consistent."
)]
pub struct Cli {
    /// Settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Operator options changed
    ConfigChanged,

    /// Durable storage was attached
    StorageAttached {
        /// Mount point of the storage
        #[arg(short, long)]
        mount: PathBuf,
    },

    /// Durable storage is about to detach
    StorageDetaching,

    /// The unit is stopping
    Stop,

    /// The container runtime became available
    RuntimeAvailable,

    /// A reverse proxy joined the website relation
    WebsiteJoined,

    /// The reverse proxy left the website relation
    WebsiteDeparted,

    /// Periodic re-evaluation
    UpdateStatus,

    /// Print the flags currently set
    Flags,

    /// Print the last reported status
    Status,
}

impl Commands {
    /// Trigger for hook commands. Configuration changes need the option
    /// diff and are built by the caller; inspection commands have none.
    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            Self::StorageAttached { mount } => Some(Trigger::StorageAttached {
                mount: mount.clone(),
            }),
            Self::StorageDetaching => Some(Trigger::StorageDetaching),
            Self::Stop => Some(Trigger::Stop),
            Self::RuntimeAvailable => Some(Trigger::RuntimeAvailable),
            Self::WebsiteJoined => Some(Trigger::WebsiteJoined),
            Self::WebsiteDeparted => Some(Trigger::WebsiteDeparted),
            Self::UpdateStatus => Some(Trigger::Update),
            Self::ConfigChanged | Self::Flags | Self::Status => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_attached() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["drydock", "storage-attached", "--mount", "/srv/data"])?;
        assert_eq!(
            cli.command.trigger(),
            Some(Trigger::StorageAttached {
                mount: PathBuf::from("/srv/data")
            })
        );
        Ok(())
    }

    #[test]
    fn test_global_config_flag() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["drydock", "flags", "--config", "/tmp/drydock.toml"])?;
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/drydock.toml")));
        assert_eq!(cli.command, Commands::Flags);
        assert_eq!(cli.command.trigger(), None);
        Ok(())
    }

    #[test]
    fn test_mount_is_required() {
        assert!(Cli::try_parse_from(["drydock", "storage-attached"]).is_err());
    }
}
