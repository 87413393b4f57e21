//! Training Module
//!
//! Runs the full train-score-track pipeline for a single model.

pub mod orchestrator;

pub use orchestrator::TrainingOrchestrator;
