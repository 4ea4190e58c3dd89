//! Shared building blocks for the FeTS orchestrator:
//! error taxonomy, typed process invocation, and installation layout.

pub mod error;
pub mod layout;
pub mod process;

pub use crate::error::{Error, Result};
