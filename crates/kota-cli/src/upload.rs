use crate::artifact::{sha256_file, BuildArtifact};
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

const BUFFER_LIMIT: u64 = 512 * 1024;

/// What the worker reported for one accepted artifact.
#[derive(Debug, Clone)]
pub struct UploadReceipt { pub url: String, pub body: serde_json::Value }

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("artifact {} does not exist", .0.display())]
    MissingArtifact(PathBuf),
    #[error("cannot read artifact {}", .path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("upload request failed")]
    Request(#[from] reqwest::Error),
    #[error("upload failed with status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("invalid upload response")]
    InvalidResponse(#[source] serde_json::Error),
    #[error("upload response has no url: {body}")]
    MissingUrl { body: String },
}

/// Posts artifacts to `{worker_url}/upload`. One call is one attempt.
#[derive(Debug, Clone)]
pub struct ArtifactUploader { client: reqwest::Client, worker_url: String, trace_id: String }

impl ArtifactUploader {
    pub fn new(worker_url: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), worker_url, trace_id)
    }

    pub fn with_client(client: reqwest::Client, worker_url: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self { client, worker_url: worker_url.into(), trace_id: trace_id.into() }
    }

    pub fn endpoint(&self) -> String { format!("{}/upload", self.worker_url.trim_end_matches('/')) }

    pub async fn upload(&self, artifact: &BuildArtifact) -> Result<UploadReceipt, UploadError> {
        let path = &artifact.path;
        let io_err = |source: std::io::Error| UploadError::Io { path: path.clone(), source };
        let len = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m.len(),
            _ => return Err(UploadError::MissingArtifact(path.clone())),
        };
        let digest = sha256_file(path).map_err(io_err)?;
        let part = if len <= BUFFER_LIMIT {
            Part::bytes(tokio::fs::read(path).await.map_err(io_err)?)
        } else {
            let file = tokio::fs::File::open(path).await.map_err(io_err)?;
            Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), len)
        };
        let part = part.file_name(artifact.file_name()).mime_str("application/octet-stream")?;
        let form = Form::new()
            .part("file", part)
            .text("platform", artifact.platform.as_str())
            .text("version", artifact.version.clone())
            .text("versionCode", artifact.version_code.to_string())
            .text("type", artifact.kind.label());
        let url = self.endpoint();
        debug!(event="upload.request", %url, kind=%artifact.kind, size_bytes=len);
        let resp = self.client.post(&url).multipart(form).header("X-Trace-Id", &self.trace_id).header("X-Artifact-Digest", &digest).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if !status.is_success() { return Err(UploadError::Status { status, body: text }); }
        let body: serde_json::Value = serde_json::from_slice(&bytes).map_err(UploadError::InvalidResponse)?;
        let Some(remote) = body.get("url").and_then(|u| u.as_str()).map(str::to_string) else { return Err(UploadError::MissingUrl { body: text }) };
        info!(event="upload.done", kind=%artifact.kind, platform=%artifact.platform, size_bytes=len, sha256=%digest, url=%remote);
        Ok(UploadReceipt { url: remote, body })
    }
}
