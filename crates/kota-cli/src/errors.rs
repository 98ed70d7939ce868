//! Failure classes of a `kota` run and the exit code each one maps to.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use crate::runner::{tail_lines, RunError};

pub const EXIT_USAGE: i32 = 1;
pub const EXIT_CONFIG: i32 = 10;
pub const EXIT_BUILD: i32 = 20;
pub const EXIT_IO: i32 = 30;
pub const EXIT_NETWORK: i32 = 40;

#[derive(Error, Debug)]
pub enum CliErrorKind {
    /// Bad arguments or an unknown platform.
    #[error("invalid invocation: {0}")]
    Usage(String),
    #[error("bad publish config: {0}")]
    Config(String),
    /// An external tool (gradle, metro, xcodebuild, git) failed.
    #[error("step failed: {0}")]
    Runtime(String),
    #[error("filesystem: {0}")]
    Io(String),
    /// The worker could not be reached or refused the request.
    #[error("worker request failed: {0}")]
    Network(String),
}

impl CliErrorKind {
    pub fn code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::Config(_) => EXIT_CONFIG,
            Self::Runtime(_) => EXIT_BUILD,
            Self::Io(_) => EXIT_IO,
            Self::Network(_) => EXIT_NETWORK,
        }
    }
}

/// A classified failure with the error that caused it.
#[derive(Debug)]
pub struct CliError { pub kind: CliErrorKind, pub source: Option<anyhow::Error> }

impl CliError {
    pub fn new(kind: CliErrorKind) -> Self { Self { kind, source: None } }
    pub fn with_source<E: Into<anyhow::Error>>(kind: CliErrorKind, err: E) -> Self { Self { kind, source: Some(err.into()) } }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.kind, f) }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> { self.source.as_deref().map(|e| e as &(dyn StdError + 'static)) }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self { Self::with_source(CliErrorKind::Io(e.kind().to_string()), e) }
}

/// Exit code for a failed run: the first [`CliError`] in the chain decides, a bare io error
/// means [`EXIT_IO`], anything else is a failed step.
pub fn classify_exit_code(e: &anyhow::Error) -> i32 {
    for cause in e.chain() {
        if let Some(cli) = cause.downcast_ref::<CliError>() {
            tracing::debug!(kind=?cli.kind, code=cli.kind.code(), "exit.classified");
            return cli.kind.code();
        }
        if cause.is::<std::io::Error>() { return EXIT_IO; }
    }
    EXIT_BUILD
}

/// Log file of the external command behind this failure, if any.
pub fn failure_log(e: &anyhow::Error) -> Option<PathBuf> {
    e.chain().find_map(|c| c.downcast_ref::<RunError>()).map(|r| r.log_file().to_path_buf())
}

/// Operator-facing diagnostic: the error chain, then the tail of the failing command's log.
pub fn failure_report(e: &anyhow::Error, tail: usize) -> Vec<String> {
    let mut lines = vec![format!("error: {e:#}")];
    if let Some(log) = failure_log(e) {
        match tail_lines(&log, tail) {
            Ok(t) => { lines.push(format!("last {} lines of {}:", t.len(), log.display())); lines.extend(t); }
            Err(err) => lines.push(format!("could not read {}: {err}", log.display())),
        }
    }
    lines
}
