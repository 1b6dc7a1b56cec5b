//! Configuration management for the directory sync job.
//!
//! Provides environment detection, configuration loading from YAML files,
//! secret handling, and the shared configuration types consumed by the
//! syncer binary.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::*;
pub use load::*;
pub use secret::*;
