// Multi-tier cache load-test harness

pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod models;
pub mod report;
pub mod runner;
pub mod stats;
pub mod worker;

pub use error::{HarnessError, Result};
