//! Core types shared by the drydock crates.
//!
//! Everything that talks to the host (processes, files, the filesystem
//! statistics) reports failures through [`Error`], so the workflow layer can
//! classify them without caring which tool produced them.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
