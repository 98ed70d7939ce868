use kota_core::{ArtifactKind, Platform, VersionCode};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A file produced by a build, tagged with the release it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub path: PathBuf,
    pub platform: Platform,
    pub kind: ArtifactKind,
    pub version: String,
    pub version_code: VersionCode,
}

impl BuildArtifact {
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| format!("artifact.{}", self.kind.label()))
    }

    /// Same artifact at another location (after staging).
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self { Self { path: path.into(), ..self.clone() } }
}

pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut h = Sha256::new();
    std::io::copy(&mut file, &mut h)?;
    Ok(format!("{:x}", h.finalize()))
}
