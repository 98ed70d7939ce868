use thiserror::Error;

#[derive(Debug, Error)]
pub enum OtaError {
    #[error("request to worker failed")]
    Request(#[from] reqwest::Error),
    #[error("{stage} returned status {status}")]
    Status { stage: &'static str, status: reqwest::StatusCode },
    #[error("invalid version manifest")]
    Manifest(#[source] serde_json::Error),
    #[error("manifest entry of type bundle has no bundleLink")]
    MissingBundleLink,
    #[error("bundle download truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },
    #[error("bundle storage error")]
    Io(#[from] std::io::Error),
}
