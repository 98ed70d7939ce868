//! Platform build sequences. Each plan is a fixed set of external commands plus the files they
//! are expected to leave behind.

use crate::artifact::BuildArtifact;
use crate::runner::{CommandRunner, CommandSpec, RunError};
use kota_core::{ArtifactKind, Platform, VersionCode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build step failed")]
    Step(#[from] RunError),
    #[error("build finished but {kind} output {} is missing", .path.display())]
    MissingOutput { kind: ArtifactKind, path: PathBuf },
    #[error("cannot prepare build directory {}", .path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

/// Programs used by the plans; `KOTA_GRADLEW`, `KOTA_NPX` and `KOTA_XCODEBUILD` override the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain { pub gradlew: String, pub npx: String, pub xcodebuild: String }

impl Default for Toolchain {
    fn default() -> Self { Self { gradlew: "./gradlew".into(), npx: "npx".into(), xcodebuild: "xcodebuild".into() } }
}

impl Toolchain {
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.is_empty());
        let d = Self::default();
        Self { gradlew: var("KOTA_GRADLEW").unwrap_or(d.gradlew), npx: var("KOTA_NPX").unwrap_or(d.npx), xcodebuild: var("KOTA_XCODEBUILD").unwrap_or(d.xcodebuild) }
    }
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub platform: Platform,
    /// `None` builds the default release variant (`assembleRelease`).
    pub flavor: Option<String>,
    /// Project root (the directory holding `android/`, `ios/` and `index.js`).
    pub root: PathBuf,
    pub app_name: String,
    pub version: String,
    pub version_code: VersionCode,
    pub toolchain: Toolchain,
}

/// `prod` → `assembleProdRelease`.
pub fn gradle_task(flavor: &str) -> String {
    let mut chars = flavor.chars();
    let variant: String = match chars.next() { Some(first) => first.to_uppercase().chain(chars).collect(), None => String::new() };
    format!("assemble{variant}Release")
}

#[derive(Debug, Clone)]
pub struct AndroidPlan { pub assemble: CommandSpec, pub bundle: CommandSpec, pub apk: PathBuf, pub bundle_file: PathBuf }

#[derive(Debug, Clone)]
pub struct IosPlan { pub archive: CommandSpec, pub export: CommandSpec, pub ipa: PathBuf, pub export_manifest: PathBuf }

#[derive(Debug, Clone)]
pub enum BuildPlan { Android(AndroidPlan), Ios(IosPlan) }

impl BuildPlan {
    pub fn for_request(req: &BuildRequest) -> Self {
        match req.platform {
            Platform::Android => BuildPlan::Android(android_plan(req)),
            Platform::Ios => BuildPlan::Ios(ios_plan(req)),
        }
    }

    pub fn commands(&self) -> Vec<&CommandSpec> {
        match self {
            BuildPlan::Android(p) => vec![&p.assemble, &p.bundle],
            BuildPlan::Ios(p) => vec![&p.archive, &p.export],
        }
    }

    pub fn outputs(&self) -> Vec<(ArtifactKind, &Path)> {
        match self {
            BuildPlan::Android(p) => vec![(ArtifactKind::Apk, p.apk.as_path()), (ArtifactKind::Bundle, p.bundle_file.as_path())],
            BuildPlan::Ios(p) => vec![(ArtifactKind::Ipa, p.ipa.as_path()), (ArtifactKind::ExportManifest, p.export_manifest.as_path())],
        }
    }
}

fn android_plan(req: &BuildRequest) -> AndroidPlan {
    let flavor = req.flavor.as_deref();
    // gradle nests outputs under the flavor only when one is configured
    let (variant_dir, apk_name) = match flavor {
        Some(f) => (format!("{f}/release"), format!("app-{f}-release.apk")),
        None => ("release".to_string(), "app-release.apk".to_string()),
    };
    let bundle_dir = format!("build/bundles/android/{variant_dir}");
    let bundle_rel = format!("{bundle_dir}/index.android.bundle");
    let assemble = CommandSpec::new(&req.toolchain.gradlew, "android-assemble")
        .arg(gradle_task(flavor.unwrap_or_default()))
        .current_dir(req.root.join("android"));
    let bundle = CommandSpec::new(&req.toolchain.npx, "android-bundle")
        .args(["react-native", "bundle", "--platform", "android", "--dev", "false", "--entry-file", "index.js"])
        .args(["--bundle-output".to_string(), bundle_rel.clone(), "--assets-dest".to_string(), format!("{bundle_dir}/assets")])
        .current_dir(&req.root);
    AndroidPlan {
        assemble,
        bundle,
        apk: req.root.join(format!("android/app/build/outputs/apk/{variant_dir}/{apk_name}")),
        bundle_file: req.root.join(bundle_rel),
    }
}

fn ios_plan(req: &BuildRequest) -> IosPlan {
    let app = &req.app_name;
    let archive_path = format!("build/ios/{app}.xcarchive");
    let export_dir = "build/ios/export";
    let archive = CommandSpec::new(&req.toolchain.xcodebuild, "ios-archive")
        .args(["-workspace".to_string(), format!("ios/{app}.xcworkspace"), "-scheme".to_string(), app.clone()])
        .args(["-configuration", "Release", "-archivePath", archive_path.as_str(), "archive"])
        .current_dir(&req.root);
    let export = CommandSpec::new(&req.toolchain.xcodebuild, "ios-export")
        .args(["-exportArchive", "-archivePath", archive_path.as_str(), "-exportOptionsPlist", "ios/ExportOptions.plist", "-exportPath", export_dir])
        .current_dir(&req.root);
    IosPlan {
        archive,
        export,
        ipa: req.root.join(format!("{export_dir}/{app}.ipa")),
        export_manifest: req.root.join(format!("{export_dir}/manifest.plist")),
    }
}

pub struct BuildOrchestrator<'a> { runner: &'a CommandRunner }

impl<'a> BuildOrchestrator<'a> {
    pub fn new(runner: &'a CommandRunner) -> Self { Self { runner } }

    /// Runs the plan and returns its artifacts. Any failing step aborts the whole build.
    pub async fn build(&self, plan: &BuildPlan, req: &BuildRequest) -> Result<Vec<BuildArtifact>, BuildError> {
        match plan {
            BuildPlan::Android(p) => {
                if let Some(dir) = p.bundle_file.parent() {
                    std::fs::create_dir_all(dir).map_err(|source| BuildError::Io { path: dir.to_path_buf(), source })?;
                }
                info!(event="build.android", task=%gradle_task(req.flavor.as_deref().unwrap_or_default()), flavor=?req.flavor);
                // assemble and bundle are in flight together; bundle is checked first
                let (assembled, bundled) = tokio::join!(self.runner.run(&p.assemble), self.runner.run(&p.bundle));
                bundled?;
                assembled?;
            }
            BuildPlan::Ios(p) => {
                info!(event="build.ios", app=%req.app_name);
                self.runner.run(&p.archive).await?;
                self.runner.run(&p.export).await?;
            }
        }
        plan.outputs()
            .into_iter()
            .map(|(kind, path)| {
                if !path.is_file() { return Err(BuildError::MissingOutput { kind, path: path.to_path_buf() }); }
                Ok(BuildArtifact { path: path.to_path_buf(), platform: req.platform, kind, version: req.version.clone(), version_code: req.version_code.clone() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(platform: Platform, root: &Path, toolchain: Toolchain) -> BuildRequest {
        BuildRequest { platform, flavor: Some("prod".into()), root: root.to_path_buf(), app_name: "Salon".into(), version: "1.2.0".into(), version_code: "5".into(), toolchain }
    }

    #[test]
    fn gradle_task_capitalizes_flavor() {
        assert_eq!(gradle_task("prod"), "assembleProdRelease");
        assert_eq!(gradle_task("staging"), "assembleStagingRelease");
        assert_eq!(gradle_task("Qa"), "assembleQaRelease");
        assert_eq!(gradle_task(""), "assembleRelease");
    }

    #[test]
    fn android_plan_targets_flavor_paths() {
        let plan = BuildPlan::for_request(&request(Platform::Android, Path::new("/proj"), Toolchain::default()));
        let BuildPlan::Android(p) = plan else { panic!("expected android plan") };
        assert_eq!(p.assemble.command_line(), "./gradlew assembleProdRelease");
        assert_eq!(p.assemble.cwd, PathBuf::from("/proj/android"));
        assert!(p.bundle.command_line().starts_with("npx react-native bundle --platform android --dev false"));
        assert!(p.bundle.args.contains(&"build/bundles/android/prod/release/index.android.bundle".to_string()));
        assert_eq!(p.apk, PathBuf::from("/proj/android/app/build/outputs/apk/prod/release/app-prod-release.apk"));
        assert_eq!(p.bundle_file, PathBuf::from("/proj/build/bundles/android/prod/release/index.android.bundle"));
    }

    #[test]
    fn android_plan_without_flavor_uses_default_variant() {
        let mut req = request(Platform::Android, Path::new("/proj"), Toolchain::default());
        req.flavor = None;
        let BuildPlan::Android(p) = BuildPlan::for_request(&req) else { panic!("expected android plan") };
        assert_eq!(p.assemble.command_line(), "./gradlew assembleRelease");
        assert_eq!(p.apk, PathBuf::from("/proj/android/app/build/outputs/apk/release/app-release.apk"));
        assert_eq!(p.bundle_file, PathBuf::from("/proj/build/bundles/android/release/index.android.bundle"));
    }

    #[test]
    fn ios_plan_archives_then_exports() {
        let plan = BuildPlan::for_request(&request(Platform::Ios, Path::new("/proj"), Toolchain::default()));
        let cmds: Vec<String> = plan.commands().iter().map(|c| c.command_line()).collect();
        assert_eq!(cmds[0], "xcodebuild -workspace ios/Salon.xcworkspace -scheme Salon -configuration Release -archivePath build/ios/Salon.xcarchive archive");
        assert_eq!(cmds[1], "xcodebuild -exportArchive -archivePath build/ios/Salon.xcarchive -exportOptionsPlist ios/ExportOptions.plist -exportPath build/ios/export");
        let outs: Vec<ArtifactKind> = plan.outputs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(outs, vec![ArtifactKind::Ipa, ArtifactKind::ExportManifest]);
    }

    #[cfg(unix)]
    fn script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        if let Some(d) = path.parent() { std::fs::create_dir_all(d).unwrap(); }
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ios_export_is_skipped_when_archive_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let xcode = tmp.path().join("bin/xcodebuild");
        let marker = tmp.path().join("export-ran");
        script(&xcode, &format!("case \"$1\" in -exportArchive) touch {} ;; *) echo archive broke; exit 65 ;; esac", marker.display()));
        let toolchain = Toolchain { xcodebuild: xcode.display().to_string(), ..Toolchain::default() };
        let req = request(Platform::Ios, tmp.path(), toolchain);
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let err = BuildOrchestrator::new(&runner).build(&BuildPlan::for_request(&req), &req).await.unwrap_err();
        match err {
            BuildError::Step(RunError::Failed(f)) => { assert_eq!(f.code, Some(65)); assert!(f.log_file.ends_with("ios-archive.log")); }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn android_build_collects_apk_and_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        script(&tmp.path().join("android/gradlew"), "mkdir -p app/build/outputs/apk/prod/release && printf apk > app/build/outputs/apk/prod/release/app-prod-release.apk");
        let npx = tmp.path().join("bin/npx");
        script(&npx, "while [ $# -gt 0 ]; do if [ \"$1\" = --bundle-output ]; then out=\"$2\"; fi; shift; done; printf js > \"$out\"");
        let req = request(Platform::Android, tmp.path(), Toolchain { npx: npx.display().to_string(), ..Toolchain::default() });
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let artifacts = BuildOrchestrator::new(&runner).build(&BuildPlan::for_request(&req), &req).await.unwrap();
        let kinds: Vec<ArtifactKind> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArtifactKind::Apk, ArtifactKind::Bundle]);
        assert_eq!(std::fs::read_to_string(&artifacts[1].path).unwrap(), "js");
        assert!(tmp.path().join("logs/android-assemble.log").exists());
        assert!(tmp.path().join("logs/android-bundle.log").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn android_build_fails_when_bundling_fails() {
        let tmp = tempfile::tempdir().unwrap();
        script(&tmp.path().join("android/gradlew"), "mkdir -p app/build/outputs/apk/prod/release && printf apk > app/build/outputs/apk/prod/release/app-prod-release.apk");
        let npx = tmp.path().join("bin/npx");
        script(&npx, "echo metro exploded; exit 1");
        let req = request(Platform::Android, tmp.path(), Toolchain { npx: npx.display().to_string(), ..Toolchain::default() });
        let runner = CommandRunner::new(tmp.path().join("logs"));
        let err = BuildOrchestrator::new(&runner).build(&BuildPlan::for_request(&req), &req).await.unwrap_err();
        assert!(matches!(err, BuildError::Step(ref e) if e.log_file().ends_with("android-bundle.log")));
    }
}
