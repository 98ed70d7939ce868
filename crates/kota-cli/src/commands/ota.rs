use anyhow::Result;
use kota_core::Platform;
use kota_ota::{BundleStore, InstalledVersion, OtaClient, OtaConfig, OtaOutcome};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use crate::commands::OutputFormat;
use crate::config::default_bundle_dir;
use crate::errors::{CliError, CliErrorKind};

#[derive(Debug)]
pub struct OtaCheckOptions {
    pub platform: String,
    pub version: String,
    pub version_code: String,
    pub worker_url: Option<String>,
    pub bundle_dir: Option<PathBuf>,
    pub format: OutputFormat,
}

fn store(bundle_dir: Option<PathBuf>) -> BundleStore { BundleStore::new(bundle_dir.unwrap_or_else(default_bundle_dir)) }

pub async fn check(opts: OtaCheckOptions) -> Result<()> {
    let platform: Platform = opts.platform.parse().map_err(|e| CliError::with_source(CliErrorKind::Usage("unknown platform".into()), e))?;
    let worker_url = opts.worker_url
        .or_else(|| std::env::var("KOTA_WORKER_URL").ok())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CliError::new(CliErrorKind::Usage("--worker-url or KOTA_WORKER_URL is required".into())))?;
    let running = InstalledVersion { platform, version: opts.version, version_code: opts.version_code.into() };
    let client = OtaClient::new(OtaConfig { worker_url, running }, store(opts.bundle_dir), reqwest::Client::new());
    let outcome = client.run().await;
    let boot = client.store().bundle_path();
    info!(event="ota.cli.outcome", installed=outcome.is_installed(), boot=?boot);

    #[derive(Serialize)]
    struct Out { outcome: &'static str, detail: Option<String>, bundle_path: Option<String> }
    let (label, detail) = match &outcome {
        OtaOutcome::Installed(p) => ("installed", Some(p.display().to_string())),
        OtaOutcome::NoUpdate(r) => ("no_update", Some(r.to_string())),
        OtaOutcome::Failed(e) => ("failed", Some(error_chain(e))),
    };
    match opts.format {
        OutputFormat::Json => {
            let o = Out { outcome: label, detail, bundle_path: boot.as_ref().map(|p| p.display().to_string()) };
            println!("{}", serde_json::to_string_pretty(&o)?);
        }
        OutputFormat::Text => {
            match &outcome {
                OtaOutcome::Installed(p) => println!("Installed bundle: {}", p.display()),
                OtaOutcome::NoUpdate(r) => println!("No update: {r}"),
                OtaOutcome::Failed(_) => {}
            }
            match &boot { Some(p) => println!("Boot bundle: {}", p.display()), None => println!("Boot bundle: packaged") }
        }
    }
    if let OtaOutcome::Failed(e) = outcome {
        return Err(CliError::with_source(CliErrorKind::Network("update check failed".into()), e).into());
    }
    Ok(())
}

fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(e), |e| e.source()).map(|e| e.to_string()).collect::<Vec<_>>().join(": ")
}

pub fn bundle_path(bundle_dir: Option<PathBuf>) -> Result<()> {
    if let Some(p) = store(bundle_dir).bundle_path() { println!("{}", p.display()); }
    Ok(())
}

pub fn clear(bundle_dir: Option<PathBuf>) -> Result<()> {
    let store = store(bundle_dir);
    if store.clear().map_err(CliError::from)? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No override bundle at {}", store.path().display());
    }
    Ok(())
}
