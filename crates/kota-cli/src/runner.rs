//! Runs external build and version-control tools with their output captured in per-step logs.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tracing::{info, warn};

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Log file stem; output lands in `<logs_dir>/<log_name>.log`.
    pub log_name: String,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, log_name: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: PathBuf::from("."), log_name: log_name.into() }
    }
    pub fn arg(mut self, a: impl Into<String>) -> Self { self.args.push(a.into()); self }
    pub fn args<I, S>(mut self, args: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.args.extend(args.into_iter().map(Into::into)); self }
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self { self.cwd = dir.into(); self }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str)).collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} (in {})", self.command_line(), self.cwd.display()) }
}

#[derive(Debug, Error)]
#[error("`{command_line}` exited with {} (log: {})", .code.map(|c| c.to_string()).unwrap_or_else(|| "a signal".into()), .log_file.display())]
pub struct CommandFailure {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub log_file: PathBuf,
    pub command_line: String,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Failed(#[from] CommandFailure),
    #[error("failed to start `{command_line}` (log: {})", .log_file.display())]
    Spawn { command_line: String, log_file: PathBuf, #[source] source: io::Error },
    #[error("cannot open log file {}", .log_file.display())]
    Log { log_file: PathBuf, #[source] source: io::Error },
}

impl RunError {
    pub fn log_file(&self) -> &Path {
        match self {
            RunError::Failed(f) => &f.log_file,
            RunError::Spawn { log_file, .. } | RunError::Log { log_file, .. } => log_file,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandRunner { logs_dir: PathBuf }

impl CommandRunner {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self { Self { logs_dir: logs_dir.into() } }

    /// `KOTA_LOGS_DIR` when set, otherwise `<cwd>/logs`.
    pub fn from_env() -> Self {
        match std::env::var("KOTA_LOGS_DIR") {
            Ok(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("logs")),
        }
    }

    pub fn logs_dir(&self) -> &Path { &self.logs_dir }

    pub fn log_path(&self, log_name: &str) -> PathBuf { self.logs_dir.join(format!("{log_name}.log")) }

    /// Runs the command to completion. The log file is truncated first and always exists afterwards.
    pub async fn run(&self, spec: &CommandSpec) -> Result<PathBuf, RunError> {
        let log_file = self.log_path(&spec.log_name);
        let command_line = spec.command_line();
        let log_err = |source: io::Error| RunError::Log { log_file: log_file.clone(), source };
        std::fs::create_dir_all(&self.logs_dir).map_err(log_err)?;
        let mut out = File::create(&log_file).map_err(log_err)?;
        let err = out.try_clone().map_err(log_err)?;
        let program = match resolve_program(spec) {
            Ok(p) => p,
            Err(source) => {
                let _ = writeln!(out, "failed to start {command_line}: {source}");
                return Err(RunError::Spawn { command_line, log_file, source });
            }
        };
        info!(event="runner.start", command=%command_line, cwd=%spec.cwd.display(), log=%log_file.display());
        let status = tokio::process::Command::new(&program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .status()
            .await;
        let status = match status {
            Ok(s) => s,
            Err(source) => {
                if let Ok(mut f) = std::fs::OpenOptions::new().append(true).open(&log_file) { let _ = writeln!(f, "failed to start {command_line}: {source}"); }
                return Err(RunError::Spawn { command_line, log_file, source });
            }
        };
        if status.success() {
            info!(event="runner.exit", command=%command_line, code=0);
            Ok(log_file)
        } else {
            warn!(event="runner.exit", command=%command_line, code=?status.code(), log=%log_file.display());
            Err(CommandFailure { code: status.code(), log_file, command_line }.into())
        }
    }
}

// Paths with a separator are taken relative to the command's working directory; bare names go through PATH.
fn resolve_program(spec: &CommandSpec) -> io::Result<PathBuf> {
    let program = Path::new(&spec.program);
    if program.components().count() > 1 || program.is_absolute() {
        let p = if program.is_absolute() { program.to_path_buf() } else { spec.cwd.join(program) };
        // absolute, since the child resolves relative program paths against its own cwd
        p.canonicalize().map_err(|e| io::Error::new(e.kind(), format!("{} does not exist", p.display())))
    } else {
        which::which(&spec.program).map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{} not found in PATH: {e}", spec.program)))
    }
}

/// Last `n` lines of a log file.
pub fn tail_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut tail = std::collections::VecDeque::with_capacity(n);
    for line in reader.split(b'\n') {
        let line = String::from_utf8_lossy(&line?).trim_end_matches('\r').to_string();
        if tail.len() == n { tail.pop_front(); }
        if n > 0 { tail.push_back(line); }
    }
    Ok(tail.into())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, log: &str) -> CommandSpec { CommandSpec::new("sh", log).args(["-c", script]) }

    #[tokio::test]
    async fn success_captures_stdout_and_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let log = runner.run(&sh("echo out; echo err 1>&2", "step")).await.unwrap();
        assert_eq!(log, tmp.path().join("logs/step.log"));
        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("out"));
        assert!(content.contains("err"));
    }

    #[tokio::test]
    async fn failure_carries_code_log_and_command() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(tmp.path());
        let err = runner.run(&sh("echo boom; exit 3", "fail")).await.unwrap_err();
        match err {
            RunError::Failed(f) => {
                assert_eq!(f.code, Some(3));
                assert_eq!(f.command_line, "sh -c echo boom; exit 3");
                assert_eq!(std::fs::read_to_string(&f.log_file).unwrap(), "boom\n");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn log_is_truncated_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(tmp.path());
        runner.run(&sh("echo first", "same")).await.unwrap();
        let log = runner.run(&sh("echo second", "same")).await.unwrap();
        assert_eq!(std::fs::read_to_string(log).unwrap(), "second\n");
    }

    #[tokio::test]
    async fn missing_program_still_writes_log() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(tmp.path());
        let err = runner.run(&CommandSpec::new("kota-no-such-tool", "missing")).await.unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
        assert!(err.log_file().exists());
        assert!(std::fs::read_to_string(err.log_file()).unwrap().contains("kota-no-such-tool"));
    }

    #[tokio::test]
    async fn relative_programs_resolve_against_cwd() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("tool");
        std::fs::write(&script, "#!/bin/sh\necho from-tool\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let log = runner.run(&CommandSpec::new("./tool", "tool").current_dir(tmp.path())).await.unwrap();
        assert_eq!(std::fs::read_to_string(log).unwrap(), "from-tool\n");
    }

    #[test]
    fn tail_returns_last_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("t.log");
        std::fs::write(&p, (1..=15).map(|i| format!("line {i}\n")).collect::<String>()).unwrap();
        let t = tail_lines(&p, 10).unwrap();
        assert_eq!(t.len(), 10);
        assert_eq!(t.first().unwrap(), "line 6");
        assert_eq!(t.last().unwrap(), "line 15");
        assert_eq!(tail_lines(&p, 0).unwrap().len(), 0);
    }
}
