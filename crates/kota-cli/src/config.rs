use kota_core::{ReleaseType, VersionCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "kota.config.json";
const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse config {}", .path.display())]
    Parse { path: PathBuf, #[source] source: serde_json::Error },
    #[error("config needs either workerUrl or repo")]
    MissingTarget,
    #[error("config field {0} must not be empty")]
    Empty(&'static str),
}

/// On-disk shape of `kota.config.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub worker_url: Option<String>,
    pub version: Option<String>,
    pub version_code: Option<VersionCode>,
    #[serde(rename = "type")]
    pub release_type: Option<ReleaseType>,
    pub app_name: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
}

/// Where staged artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    WorkerUpload { worker_url: String },
    /// Older flow: commit the staging directory into a git branch.
    LegacyGitPublish { repo: String, branch: String },
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub output_dir: PathBuf,
    /// Required for worker uploads, where it tags every artifact; optional for git publishing.
    pub version: Option<String>,
    pub version_code: Option<VersionCode>,
    pub release_type: Option<ReleaseType>,
    pub app_name: Option<String>,
    pub target: PublishTarget,
}

impl PublishConfig {
    /// Reads the JSON config and applies `KOTA_WORKER_URL`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path=%path.display(), exists=path.exists(), "config.load.attempt");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut file_cfg: FileConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        if let Ok(url) = std::env::var("KOTA_WORKER_URL") { if !url.is_empty() { file_cfg.worker_url = Some(url); } }
        Self::resolve(file_cfg)
    }

    pub fn resolve(file_cfg: FileConfig) -> Result<Self, ConfigError> {
        let FileConfig { output_dir, worker_url, version, version_code, release_type, app_name, repo, branch } = file_cfg;
        let version = version.filter(|v| !v.trim().is_empty());
        let version_code = version_code.filter(|c| !c.as_str().trim().is_empty());
        let output_dir = output_dir.ok_or(ConfigError::Empty("outputDir"))?;
        if output_dir.as_os_str().is_empty() { return Err(ConfigError::Empty("outputDir")); }
        let target = match (worker_url.filter(|u| !u.trim().is_empty()), repo.filter(|r| !r.trim().is_empty())) {
            (Some(worker_url), _) => {
                if version.is_none() { return Err(ConfigError::Empty("version")); }
                if version_code.is_none() { return Err(ConfigError::Empty("versionCode")); }
                PublishTarget::WorkerUpload { worker_url }
            }
            (None, Some(repo)) => PublishTarget::LegacyGitPublish { repo, branch: branch.filter(|b| !b.is_empty()).unwrap_or_else(|| DEFAULT_BRANCH.to_string()) },
            (None, None) => return Err(ConfigError::MissingTarget),
        };
        debug!(?target, "config.resolved");
        Ok(Self { output_dir, version, version_code, release_type, app_name: app_name.filter(|n| !n.is_empty()), target })
    }
}

/// Default document directory for the OTA bundle cache used by `kota ota`.
pub fn default_bundle_dir() -> PathBuf { dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("kota") }

#[derive(Debug, Deserialize)]
struct PackageJson { name: Option<String> }

/// `appName` from config, else the `name` in `package.json` (scope stripped), else `app`.
pub fn app_name(cfg: &PublishConfig, root: &Path) -> String {
    if let Some(n) = &cfg.app_name { return n.clone(); }
    std::fs::read(root.join("package.json")).ok()
        .and_then(|b| serde_json::from_slice::<PackageJson>(&b).ok())
        .and_then(|p| p.name)
        .map(|n| n.rsplit('/').next().unwrap_or_default().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "app".into())
}
