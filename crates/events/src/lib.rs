//! Flag-driven reaction engine.
//!
//! This crate provides the rule engine the lifecycle workflows run on:
//!
//! - **Flags**: durable named booleans ("storage attached", "migrated")
//! - **Triggers**: discrete external occurrences ("config changed")
//! - **Guards**: conjunctions of required/forbidden flags plus an optional
//!   trigger filter
//! - **Reactions**: (guard, action) pairs registered on the bus
//! - **Fact store**: durable key-value storage for flags and scalar facts
//!
//! A pass snapshots the flags, runs every reaction whose guard holds in
//! registration order, and applies their buffered flag mutations in one
//! atomic write when the pass ends.
//!
//! # Example
//!
//! ```ignore
//! use drydock_events::{EventBusBuilder, InMemoryFactStore, Trigger};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryFactStore::new_arc();
//!     let bus = EventBusBuilder::new()
//!         .with_store(store)
//!         .register(my_reaction())
//!         .build()
//!         .unwrap();
//!
//!     let report = bus.dispatch(Trigger::RuntimeAvailable).await.unwrap();
//!     println!("ran: {:?}", report.executed());
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod bus;
pub mod durable_store;
pub mod error;
pub mod guard;
pub mod reaction;
pub mod store;
pub mod types;

// Re-export main types
pub use bus::{DispatchReport, EventBus, EventBusBuilder, PassReport, DEFAULT_MAX_PASSES};
pub use durable_store::SurrealFactStore;
pub use error::{ConnectionError, Error, Result};
pub use guard::Guard;
pub use reaction::{Reaction, ReactionContext};
pub use store::{FactStore, InMemoryFactStore, TracingFactStore};
pub use types::{Flag, FlagMutation, FlagSet, Trigger};
