use crate::error::OtaError;
use crate::link::direct_download_link;
use crate::store::BundleStore;
use futures_util::StreamExt;
use kota_core::{ManifestEntry, Platform, VersionCode, VersionManifest};
use reqwest::StatusCode;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// The build that is currently running on the device.
#[derive(Debug, Clone)]
pub struct InstalledVersion {
    pub platform: Platform,
    pub version: String,
    pub version_code: VersionCode,
}

#[derive(Debug, Clone)]
pub struct OtaConfig {
    pub worker_url: String,
    pub running: InstalledVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoUpdateReason {
    /// The manifest has no record for the running platform.
    PlatformMissing,
    NotNewer { remote_version: String, remote_code: VersionCode },
    /// A newer release exists but ships as a full binary, which is out of reach for OTA.
    NotABundle { kind: String },
}

impl fmt::Display for NoUpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoUpdateReason::PlatformMissing => f.write_str("manifest has no entry for this platform"),
            NoUpdateReason::NotNewer { remote_version, remote_code } => write!(f, "remote {remote_version} ({remote_code}) is not newer"),
            NoUpdateReason::NotABundle { kind } => write!(f, "newer release is of type '{kind}', not a bundle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    Download(ManifestEntry),
    NoUpdate(NoUpdateReason),
}

#[derive(Debug)]
pub enum OtaOutcome {
    Installed(PathBuf),
    NoUpdate(NoUpdateReason),
    Failed(OtaError),
}

impl OtaOutcome {
    pub fn is_installed(&self) -> bool { matches!(self, OtaOutcome::Installed(_)) }
}

pub struct OtaClient {
    http: reqwest::Client,
    config: OtaConfig,
    store: BundleStore,
}

impl OtaClient {
    pub fn new(config: OtaConfig, store: BundleStore, http: reqwest::Client) -> Self { Self { http, config, store } }

    pub fn store(&self) -> &BundleStore { &self.store }

    fn endpoint(&self, path: &str) -> String { format!("{}/{}", self.config.worker_url.trim_end_matches('/'), path) }

    pub async fn fetch_manifest(&self) -> Result<VersionManifest, OtaError> {
        let url = self.endpoint("check-version");
        debug!(%url, "ota.manifest.request");
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() { return Err(OtaError::Status { stage: "check-version", status: resp.status() }); }
        let body = resp.bytes().await?;
        VersionManifest::from_slice(&body).map_err(OtaError::Manifest)
    }

    /// Pure decision over an already fetched manifest.
    pub fn decide(&self, manifest: &VersionManifest) -> UpdateDecision {
        let running = &self.config.running;
        let Some(entry) = manifest.entry(running.platform) else { return UpdateDecision::NoUpdate(NoUpdateReason::PlatformMissing) };
        if !entry.is_newer_than(&running.version, &running.version_code) {
            return UpdateDecision::NoUpdate(NoUpdateReason::NotNewer { remote_version: entry.version.clone(), remote_code: entry.version_code.clone() });
        }
        if !entry.is_bundle() { return UpdateDecision::NoUpdate(NoUpdateReason::NotABundle { kind: entry.kind.clone() }); }
        UpdateDecision::Download(entry.clone())
    }

    pub async fn check(&self) -> Result<UpdateDecision, OtaError> {
        let manifest = self.fetch_manifest().await?;
        let decision = self.decide(&manifest);
        info!(event="ota.check", platform=%self.config.running.platform, local_version=%self.config.running.version, local_code=%self.config.running.version_code, decision=?decision);
        Ok(decision)
    }

    /// Downloads the entry's bundle over the override path. Only a complete HTTP 200 body
    /// replaces the previous bundle.
    pub async fn download(&self, entry: &ManifestEntry) -> Result<PathBuf, OtaError> {
        let link = entry.bundle_link.as_deref().ok_or(OtaError::MissingBundleLink)?;
        let url = direct_download_link(link);
        info!(event="ota.download.start", %url, version=%entry.version, code=%entry.version_code);
        let resp = self.http.get(&url).send().await?;
        if resp.status() != StatusCode::OK { return Err(OtaError::Status { stage: "bundle download", status: resp.status() }); }
        let partial = self.store.partial_path();
        if let Some(dir) = partial.parent() { tokio::fs::create_dir_all(dir).await?; }
        let written = match write_body(resp, &partial).await {
            Ok(n) => n,
            Err(e) => { let _ = tokio::fs::remove_file(&partial).await; return Err(e); }
        };
        let path = self.store.commit(&partial).await?;
        info!(event="ota.download.done", path=%path.display(), bytes=written);
        Ok(path)
    }

    /// Runs check and download once. Never returns an error: failures are logged and reported
    /// as [`OtaOutcome::Failed`] so the caller can always boot the packaged bundle.
    pub async fn run(&self) -> OtaOutcome {
        let decision = match self.check().await {
            Ok(d) => d,
            Err(e) => { warn!(event="ota.failed", stage="check", error=?e); return OtaOutcome::Failed(e); }
        };
        match decision {
            UpdateDecision::NoUpdate(reason) => OtaOutcome::NoUpdate(reason),
            UpdateDecision::Download(entry) => match self.download(&entry).await {
                Ok(path) => OtaOutcome::Installed(path),
                Err(e) => { warn!(event="ota.failed", stage="download", error=?e); OtaOutcome::Failed(e) }
            },
        }
    }
}

async fn write_body(resp: reqwest::Response, partial: &Path) -> Result<u64, OtaError> {
    let expected = resp.content_length();
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    if let Some(expected) = expected {
        if expected != written { return Err(OtaError::Truncated { expected, received: written }); }
    }
    Ok(written)
}
