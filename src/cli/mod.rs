//! CLI module
//!
//! Provides:
//! - Argument parsing (`serve`, `prepare-data`, `classes`)
//! - Command dispatch onto the service crates
//! - Sample dataset generation

pub mod args;
pub mod dispatch;
pub mod prepare_data;

// Re-exports
pub use args::{Cli, Command, ServeArgs};
pub use dispatch::{apply_overrides, build_facade, run};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
