//! Model Management Module
//!
//! Provides the registry of model families the service can train.

pub mod registry;

// Re-export key types
pub use registry::{list_all, resolve, ModelClassInfo, ModelFamily};
