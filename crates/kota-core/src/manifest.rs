use crate::platform::Platform;
use crate::version::{is_new_version, VersionCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest `type` value that marks an over-the-air JS bundle release.
pub const BUNDLE_KIND: &str = "bundle";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub version: String,
    #[serde(rename = "versionCode")]
    pub version_code: VersionCode,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "bundleLink", default, skip_serializing_if = "Option::is_none")]
    pub bundle_link: Option<String>,
}

impl ManifestEntry {
    pub fn is_bundle(&self) -> bool { self.kind == BUNDLE_KIND }

    pub fn is_newer_than(&self, version: &str, version_code: &VersionCode) -> bool {
        is_new_version(&self.version, self.version_code.as_str(), version, version_code.as_str())
    }
}

/// Latest release per platform, as published by the worker's `check-version` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl VersionManifest {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> { serde_json::from_slice(bytes) }

    pub fn entry(&self, platform: Platform) -> Option<&ManifestEntry> { self.entries.get(platform.as_str()) }

    pub fn insert(&mut self, platform: Platform, entry: ManifestEntry) { self.entries.insert(platform.as_str().to_string(), entry); }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_worker_manifest() {
        let body = br#"{"android":{"version":"1.2.0","versionCode":5,"type":"bundle","bundleLink":"https://x/y?dl=0"},
                        "ios":{"version":"1.1.0","versionCode":"2","type":"binary"}}"#;
        let m = VersionManifest::from_slice(body).unwrap();
        let android = m.entry(Platform::Android).unwrap();
        assert!(android.is_bundle());
        assert_eq!(android.version_code.as_str(), "5");
        assert_eq!(android.bundle_link.as_deref(), Some("https://x/y?dl=0"));
        let ios = m.entry(Platform::Ios).unwrap();
        assert!(!ios.is_bundle());
        assert!(ios.bundle_link.is_none());
    }

    #[test]
    fn missing_platform_yields_none() {
        let m = VersionManifest::from_slice(br#"{"ios":{"version":"1","versionCode":"1","type":"bundle"}}"#).unwrap();
        assert!(m.entry(Platform::Android).is_none());
    }

    #[test]
    fn bundle_kind_is_exact() {
        let entry = ManifestEntry { version: "1".into(), version_code: "1".into(), kind: "Bundle".into(), bundle_link: None };
        assert!(!entry.is_bundle());
    }
}
