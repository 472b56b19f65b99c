//! SmartDiff library
//!
//! Document version management with AI-assisted changelogs: line diffing,
//! embedded history metadata, the patch workflow, and the local stores.

pub mod backend;
pub mod config;
pub mod constant;
pub mod diff;
pub mod export;
pub mod history;
pub mod metadata;
pub mod repository;
pub mod types;
pub mod workflow;
