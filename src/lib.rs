//! ModelHub: train, catalog and serve classification models
//!
//! The binary wires the service crates together:
//! - `modelhub-core`: normalization, training, tracking, facade
//! - `modelhub-databases`: SQLite model catalog
//! - `modelhub-api`: REST and JSON-RPC transports

pub mod cli;
pub mod logging;
pub mod settings;

pub use settings::Settings;
