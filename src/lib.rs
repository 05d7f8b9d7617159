//! Common functionality for elecplan, a least-cost electrification planner.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod finance;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod scenario;
pub mod settings;
pub mod settlement;
pub mod simulation;
pub mod technology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the folder where program configuration files are stored.
///
/// Falls back to the current directory on platforms with no config folder.
pub fn get_elecplan_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("elecplan");
    path
}
