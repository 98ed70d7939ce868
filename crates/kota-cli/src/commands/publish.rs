use anyhow::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use kota_core::{sanitized_timestamp, ArtifactKind, Platform, ReleaseType, VersionCode};
use serde::Serialize;
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use crate::artifact::BuildArtifact;
use crate::commands::OutputFormat;
use crate::config::{app_name, PublishConfig, PublishTarget, DEFAULT_CONFIG_FILE};
use crate::errors::{CliError, CliErrorKind};
use crate::orchestrator::{BuildOrchestrator, BuildPlan, BuildRequest, Toolchain};
use crate::runner::{CommandRunner, CommandSpec, RunError};
use crate::upload::ArtifactUploader;

pub const USAGE: &str = "usage: kota publish <android|ios> [flavor] [config]";

#[derive(Debug)]
pub struct PublishOptions {
    pub platform: String,
    pub flavor: Option<String>,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct PublishedArtifact { pub kind: ArtifactKind, pub path: String, pub url: Option<String> }

#[derive(Debug, Serialize)]
struct Summary<'a> {
    platform: Platform,
    flavor: Option<&'a str>,
    version: Option<&'a str>,
    version_code: Option<&'a VersionCode>,
    target: &'static str,
    artifacts: Vec<PublishedArtifact>,
}

/// Splits the optional positionals. A lone second argument ending in `.json` is the config of the
/// flavor-less form `kota publish <platform> <config>`.
pub fn resolve_positionals(flavor: Option<String>, config: Option<PathBuf>) -> (Option<String>, PathBuf) {
    match (flavor, config) {
        (Some(f), None) if f.ends_with(".json") => (None, PathBuf::from(f)),
        (flavor, config) => (flavor, config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))),
    }
}

pub async fn handle(opts: PublishOptions) -> Result<()> {
    let PublishOptions { platform, flavor, config, dry_run, format } = opts;
    let platform: Platform = platform.parse().map_err(|e| CliError::with_source(CliErrorKind::Usage(format!("unknown platform\n{USAGE}")), e))?;
    let (flavor, config) = resolve_positionals(flavor, config);
    if flavor.as_deref().is_some_and(|f| f.trim().is_empty()) { return Err(CliError::new(CliErrorKind::Usage(format!("flavor must not be empty\n{USAGE}"))).into()); }
    let variant = flavor.as_deref().unwrap_or("release");
    let cfg = PublishConfig::load(&config).map_err(|e| CliError::with_source(CliErrorKind::Config(format!("cannot load {}", config.display())), e))?;
    let root = PathBuf::from(".");
    let req = BuildRequest {
        platform,
        flavor: flavor.clone(),
        app_name: app_name(&cfg, &root),
        root,
        version: cfg.version.clone().unwrap_or_default(),
        version_code: cfg.version_code.clone().unwrap_or_default(),
        toolchain: Toolchain::from_env(),
    };
    let plan = BuildPlan::for_request(&req);
    if dry_run {
        for cmd in plan.commands() { println!("{cmd}"); }
        return Ok(());
    }

    let runner = CommandRunner::from_env();
    let trace_id = uuid::Uuid::new_v4().to_string();
    let stamp = sanitized_timestamp(Utc::now());
    info!(event="publish.start", %platform, %variant, version=?cfg.version, version_code=?cfg.version_code, %trace_id, logs=%runner.logs_dir().display());

    if let PublishTarget::LegacyGitPublish { repo, branch } = &cfg.target {
        sync_checkout(&runner, repo, branch, &cfg.output_dir).await.map_err(|e| CliError::with_source(CliErrorKind::Runtime("git checkout failed".into()), e))?;
    }

    let artifacts = with_spinner(format!("building {platform} {variant}"), BuildOrchestrator::new(&runner).build(&plan, &req))
        .await
        .map_err(|e| CliError::with_source(CliErrorKind::Runtime(format!("{platform} build failed")), e))?;
    let staged = stage(&artifacts, &cfg.output_dir, cfg.release_type, &req.app_name, flavor.as_deref(), &stamp)
        .map_err(|e| CliError::with_source(CliErrorKind::Io(format!("cannot stage artifacts into {}", cfg.output_dir.display())), e))?;

    let mut published = Vec::with_capacity(staged.len());
    let target = match &cfg.target {
        PublishTarget::WorkerUpload { worker_url } => {
            let uploader = ArtifactUploader::new(worker_url, &trace_id);
            // strictly one at a time, binaries before the bundle
            for artifact in &staged {
                let url = if artifact.kind.is_uploadable() {
                    let receipt = uploader.upload(artifact).await.map_err(|e| CliError::with_source(CliErrorKind::Network(format!("{} upload failed", artifact.kind)), e))?;
                    info!(event="publish.upload", kind=%artifact.kind, url=%receipt.url);
                    if format == OutputFormat::Text { println!("Uploaded {} {}: {}", artifact.kind, artifact.file_name(), receipt.url); }
                    Some(receipt.url)
                } else { None };
                published.push(PublishedArtifact { kind: artifact.kind, path: artifact.path.display().to_string(), url });
            }
            "worker"
        }
        PublishTarget::LegacyGitPublish { branch, .. } => {
            let message = match flavor.as_deref() {
                Some(f) => format!("publish {platform} {f} {stamp}"),
                None => format!("publish {platform} {stamp}"),
            };
            commit_and_push(&runner, &cfg.output_dir, branch, &message).await.map_err(|e| CliError::with_source(CliErrorKind::Runtime("git publish failed".into()), e))?;
            if format == OutputFormat::Text { println!("Pushed {} artifact(s) to {branch}", staged.len()); }
            published.extend(staged.iter().map(|a| PublishedArtifact { kind: a.kind, path: a.path.display().to_string(), url: None }));
            "git"
        }
    };
    if format == OutputFormat::Json {
        let summary = Summary { platform, flavor: flavor.as_deref(), version: cfg.version.as_deref(), version_code: cfg.version_code.as_ref(), target, artifacts: published };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    info!(event="publish.finished", %platform, %variant, publish_target=target);
    Ok(())
}

/// File name an artifact gets in the staging directory.
pub fn staged_name(kind: ArtifactKind, app: &str, platform: Platform, flavor: Option<&str>, stamp: &str) -> String {
    let base = match flavor { Some(f) => format!("{app}-{platform}-{f}"), None => format!("{app}-{platform}") };
    match kind {
        ArtifactKind::Apk => format!("{base}.apk"),
        ArtifactKind::Ipa => format!("{base}.ipa"),
        ArtifactKind::Bundle => format!("{base}-{stamp}.bundle"),
        ArtifactKind::ExportManifest => format!("{base}-manifest.plist"),
    }
}

/// Copies the artifacts selected by the release type into `output_dir`. Build outputs are left in place.
pub fn stage(artifacts: &[BuildArtifact], output_dir: &Path, release_type: Option<ReleaseType>, app: &str, flavor: Option<&str>, stamp: &str) -> std::io::Result<Vec<BuildArtifact>> {
    std::fs::create_dir_all(output_dir)?;
    let mut staged = Vec::new();
    for a in artifacts {
        if !release_type.map_or(true, |t| t.includes(a.kind)) {
            info!(event="publish.skip", kind=%a.kind, release_type=?release_type);
            continue;
        }
        let dest = output_dir.join(staged_name(a.kind, app, a.platform, flavor, stamp));
        std::fs::copy(&a.path, &dest)?;
        info!(event="publish.stage", kind=%a.kind, from=%a.path.display(), to=%dest.display());
        staged.push(a.relocated(dest));
    }
    Ok(staged)
}

async fn sync_checkout(runner: &CommandRunner, repo: &str, branch: &str, dir: &Path) -> Result<(), RunError> {
    if dir.join(".git").is_dir() {
        runner.run(&CommandSpec::new("git", "git-pull").args(["pull", "origin", branch]).current_dir(dir)).await?;
    } else {
        let target = dir.display().to_string();
        runner.run(&CommandSpec::new("git", "git-clone").args(["clone", "--branch", branch, repo, target.as_str()])).await?;
    }
    Ok(())
}

async fn commit_and_push(runner: &CommandRunner, dir: &Path, branch: &str, message: &str) -> Result<(), RunError> {
    runner.run(&CommandSpec::new("git", "git-add").args(["add", "-A"]).current_dir(dir)).await?;
    runner.run(&CommandSpec::new("git", "git-commit").args(["commit", "-m", message]).current_dir(dir)).await?;
    runner.run(&CommandSpec::new("git", "git-push").args(["push", "origin", branch]).current_dir(dir)).await?;
    Ok(())
}

async fn with_spinner<F: Future>(msg: String, fut: F) -> F::Output {
    let pb = std::io::stderr().is_terminal().then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") { pb.set_style(style); }
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });
    let out = fut.await;
    if let Some(pb) = pb { pb.finish_and_clear(); }
    out
}
