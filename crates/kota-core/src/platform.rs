use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform { Android, Ios }

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown platform '{0}' (expected android|ios)")]
pub struct UnknownPlatform(pub String);

impl Platform {
    pub fn as_str(self) -> &'static str { match self { Platform::Android => "android", Platform::Ios => "ios" } }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// What a build produced. The label is what the worker receives in the `type` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind { Apk, Ipa, Bundle, ExportManifest }

impl ArtifactKind {
    pub fn label(self) -> &'static str {
        match self { ArtifactKind::Apk => "apk", ArtifactKind::Ipa => "ipa", ArtifactKind::Bundle => "bundle", ArtifactKind::ExportManifest => "manifest" }
    }
    pub fn is_binary(self) -> bool { matches!(self, ArtifactKind::Apk | ArtifactKind::Ipa) }
    /// Kinds that are shipped to the worker. The iOS export manifest is staged only.
    pub fn is_uploadable(self) -> bool { !matches!(self, ArtifactKind::ExportManifest) }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Restricts which artifacts a publish run ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType { Binary, Bundle }

impl ReleaseType {
    pub fn includes(self, kind: ArtifactKind) -> bool {
        match self {
            ReleaseType::Binary => kind.is_binary() || kind == ArtifactKind::ExportManifest,
            ReleaseType::Bundle => kind == ArtifactKind::Bundle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platforms_case_insensitively() {
        assert_eq!("android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("iOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("windows".parse::<Platform>().unwrap_err(), UnknownPlatform("windows".into()));
    }

    #[test]
    fn release_type_filters_kinds() {
        assert!(ReleaseType::Binary.includes(ArtifactKind::Apk));
        assert!(ReleaseType::Binary.includes(ArtifactKind::Ipa));
        assert!(!ReleaseType::Binary.includes(ArtifactKind::Bundle));
        assert!(ReleaseType::Bundle.includes(ArtifactKind::Bundle));
        assert!(!ReleaseType::Bundle.includes(ArtifactKind::Apk));
        assert!(ReleaseType::Binary.includes(ArtifactKind::ExportManifest));
        assert!(!ReleaseType::Bundle.includes(ArtifactKind::ExportManifest));
    }

    #[test]
    fn export_manifest_is_not_uploaded() {
        assert!(!ArtifactKind::ExportManifest.is_uploadable());
        assert!(ArtifactKind::Bundle.is_uploadable());
    }
}
