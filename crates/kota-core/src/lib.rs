//! Release domain shared by the publish tooling and the OTA client.

pub mod manifest;
pub mod platform;
pub mod time;
pub mod version;

pub use manifest::{ManifestEntry, VersionManifest, BUNDLE_KIND};
pub use platform::{ArtifactKind, Platform, ReleaseType, UnknownPlatform};
pub use time::{day_of_month, sanitized_timestamp, DateParseError};
pub use version::{compare_versions, is_new_version, VersionCode, VersionError};
