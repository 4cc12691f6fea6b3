// Library exports for the rsswarden memory watchdog

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod process;
