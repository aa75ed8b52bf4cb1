//! IAP CLI - run the allocation engine over scenario files.
//!
//! This crate provides:
//! - scenario: JSON scenario loading, per-entity runs and result output
//! - demo: seeded scenario generator
//! - config: process settings from the environment

pub mod config;
pub mod demo;
pub mod scenario;

pub use config::Config;
pub use scenario::{EntityReport, Scenario};
