//! Library half of the `kota` binary: command runner, build orchestration, staging and upload.

pub mod artifact;
pub mod commands;
pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod runner;
pub mod upload;
