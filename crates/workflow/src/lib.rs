//! Lifecycle workflows for a containerized docker registry.
//!
//! Each workflow is a reaction registered on a
//! [`drydock_events::EventBus`]:
//!
//! - **Standalone start**: loads the supplied image and starts the service
//!   once the container runtime is available.
//! - **Reconfiguration**: rewrites TLS, auth and config artifacts when an
//!   option changes and leaves the service down for the standalone start to
//!   bring back.
//! - **Storage attachment**: records the mount and gates migration on free
//!   space.
//! - **Migration**: moves the runtime's data directory onto attached storage
//!   with a journaled cutover.
//!
//! Collaborators (container runtime, ports, filesystem, ...) are traits in
//! [`ports`]. [`system`] implements them against the host; `fakes` (behind
//! the `test-util` feature) records calls for tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use drydock_events::{EventBusBuilder, InMemoryFactStore, Trigger};
//! use drydock_workflow::{register_reactions, ConfigSnapshot, Deployment, Layout};
//! use drydock_workflow::fakes::Fakes;
//!
//! let fakes = Fakes::new();
//! let deployment = Arc::new(Deployment::new(fakes.host(), Layout::default(), ConfigSnapshot::default()));
//! let bus = register_reactions(EventBusBuilder::new(), &deployment)
//!     .with_store(InMemoryFactStore::new_arc())
//!     .build()?;
//! bus.dispatch(Trigger::RuntimeAvailable).await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod compose;
pub mod config;
pub mod controller;
pub mod deployment;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fakes;
pub mod flags;
pub mod layout;
pub mod migration;
pub mod packages;
pub mod ports;
pub mod reconfigure;
pub mod relations;
pub mod standalone;
pub mod storage;
pub mod system;

pub use compose::ComposeFile;
pub use config::{ConfigOption, ConfigSnapshot};
pub use controller::ServiceController;
pub use deployment::{register_reactions, Deployment};
pub use error::{Error, Result};
pub use layout::Layout;
pub use migration::CutoverJournal;
pub use ports::{EntryKind, Host, SpaceUsage, Status};
