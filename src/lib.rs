//! # drydock
//!
//! Lifecycle controller for a containerized docker registry.
//!
//! Each invocation handles one hook: it opens the durable fact store,
//! dispatches the matching trigger through the reaction engine and records
//! the configuration it saw.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app;
pub mod cli;
pub mod settings;

pub use drydock_core;
pub use drydock_events;
pub use drydock_workflow;
