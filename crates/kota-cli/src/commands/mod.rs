use clap::{Parser, Subcommand};
use std::path::PathBuf;
use crate::logging::LogFormat;

pub mod ota;
pub mod publish;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(name = "kota", version, about = "Build, publish and over-the-air bundle tooling")]
pub struct Cli {
    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    /// Log format: auto|text|json
    #[arg(long, global = true, default_value = "auto")]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the app for a platform, stage the artifacts and publish them
    Publish {
        /// android|ios
        platform: String,
        /// Build flavor, e.g. prod (Android task assemble<Flavor>Release); omit for plain assembleRelease
        flavor: Option<String>,
        /// Publish config file [default: kota.config.json]; `publish <platform> <file>.json` also works
        config: Option<PathBuf>,
        /// Print the build commands without running anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Inspect or exercise the over-the-air bundle cache
    Ota {
        #[command(subcommand)]
        command: OtaCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum OtaCommands {
    /// Check the worker for a newer bundle and download it, as the app does at boot
    Check {
        #[arg(long)]
        platform: String,
        /// Version of the running build
        #[arg(long)]
        version: String,
        /// Version code of the running build
        #[arg(long)]
        version_code: String,
        /// Worker base URL (defaults to KOTA_WORKER_URL)
        #[arg(long)]
        worker_url: Option<String>,
        /// Document directory holding index.ota.bundle
        #[arg(long)]
        bundle_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the override bundle path, or nothing when the packaged bundle applies
    BundlePath {
        #[arg(long)]
        bundle_dir: Option<PathBuf>,
    },
    /// Remove the override bundle
    Clear {
        #[arg(long)]
        bundle_dir: Option<PathBuf>,
    },
}
