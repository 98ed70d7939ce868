use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version code '{0}' is not an integer")]
    InvalidCode(String),
}

/// Build number that distinguishes releases sharing a version string.
///
/// Workers report it either as a JSON string or a JSON number, so the raw text is kept and
/// only interpreted when compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionCode(String);

impl VersionCode {
    pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn as_number(&self) -> Result<i64, VersionError> {
        self.0.trim().parse::<i64>().map_err(|_| VersionError::InvalidCode(self.0.clone()))
    }
}

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for VersionCode { fn from(s: &str) -> Self { Self::new(s) } }
impl From<String> for VersionCode { fn from(s: String) -> Self { Self(s) } }
impl From<u64> for VersionCode { fn from(n: u64) -> Self { Self(n.to_string()) } }

impl Serialize for VersionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> { serializer.serialize_str(&self.0) }
}

impl<'de> Deserialize<'de> for VersionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw { Text(String), Number(serde_json::Number) }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => VersionCode(s),
            Raw::Number(n) => VersionCode(n.to_string()),
        })
    }
}

fn numeric_segments(v: &str) -> Option<Vec<u64>> {
    let v = v.trim();
    if v.is_empty() { return None; }
    v.split('.').map(|seg| seg.parse::<u64>().ok()).collect()
}

/// Orders two version strings. Dotted numeric versions compare segment by segment
/// (missing trailing segments count as zero); anything else falls back to plain string order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (numeric_segments(a), numeric_segments(b)) {
        (Some(mut x), Some(mut y)) => {
            let len = x.len().max(y.len());
            x.resize(len, 0);
            y.resize(len, 0);
            x.cmp(&y)
        }
        _ => a.cmp(b),
    }
}

/// True when the remote release supersedes the running one.
///
/// A strictly greater version wins outright. Equal versions fall back to the version code,
/// and a code that does not parse as an integer never counts as an update.
pub fn is_new_version(remote_version: &str, remote_code: &str, local_version: &str, local_code: &str) -> bool {
    match compare_versions(remote_version, local_version) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            let remote = VersionCode::new(remote_code).as_number();
            let local = VersionCode::new(local_code).as_number();
            matches!((remote, local), (Ok(r), Ok(l)) if r > l)
        }
    }
}
