#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One multipart request as the fake worker saw it.
#[derive(Debug, Clone, Default)]
pub struct Received {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub version_code: Option<String>,
    pub kind: Option<String>,
    pub trace_id: Option<String>,
    pub digest: Option<String>,
}

#[derive(Clone)]
pub struct Worker {
    pub received: Arc<Mutex<Vec<Received>>>,
    /// Status and body returned for every upload.
    pub reply: Arc<(StatusCode, serde_json::Value)>,
}

impl Worker {
    pub fn ok() -> Self { Self::replying(StatusCode::OK, json!({"ok": true})) }
    pub fn replying(status: StatusCode, body: serde_json::Value) -> Self {
        Self { received: Arc::new(Mutex::new(Vec::new())), reply: Arc::new((status, body)) }
    }
    pub fn received(&self) -> Vec<Received> { self.received.lock().unwrap().clone() }
}

async fn upload(State(w): State<Worker>, headers: HeaderMap, mut mp: Multipart) -> (StatusCode, Json<serde_json::Value>) {
    let header = |k: &str| headers.get(k).and_then(|v| v.to_str().ok()).map(str::to_string);
    let mut r = Received { trace_id: header("x-trace-id"), digest: header("x-artifact-digest"), ..Default::default() };
    while let Ok(Some(field)) = mp.next_field().await {
        match field.name().unwrap_or_default().to_string().as_str() {
            "file" => { r.file_name = field.file_name().map(str::to_string); r.bytes = field.bytes().await.unwrap().to_vec(); }
            "platform" => r.platform = field.text().await.ok(),
            "version" => r.version = field.text().await.ok(),
            "versionCode" => r.version_code = field.text().await.ok(),
            "type" => r.kind = field.text().await.ok(),
            _ => {}
        }
    }
    let mut body = w.reply.1.clone();
    if w.reply.0.is_success() && body.get("ok").is_some() {
        body = json!({"url": format!("https://cdn.example.test/{}", r.file_name.clone().unwrap_or_default())});
    }
    w.received.lock().unwrap().push(r);
    (w.reply.0, Json(body))
}

/// Serves the fake worker from its own runtime thread so blocking tests can drive the binary.
pub fn spawn_worker(worker: Worker) -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let app = Router::new().route("/upload", post(upload)).with_state(worker);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

#[cfg(unix)]
pub fn script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    if let Some(dir) = path.parent() { std::fs::create_dir_all(dir).unwrap(); }
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// React Native project skeleton with fake gradlew and npx. Returns the npx path.
#[cfg(unix)]
pub fn android_project(root: &Path, gradlew_body: &str) -> std::path::PathBuf {
    std::fs::write(root.join("package.json"), r#"{"name": "@acme/salon", "version": "1.2.0"}"#).unwrap();
    std::fs::write(root.join("index.js"), "export default null;\n").unwrap();
    script(&root.join("android/gradlew"), gradlew_body);
    let npx = root.join("tools/npx");
    script(&npx, r#"while [ $# -gt 0 ]; do
  if [ "$1" = "--bundle-output" ]; then out="$2"; fi
  shift
done
echo "writing $out"
printf 'var app=1;' > "$out""#);
    npx
}

pub const GRADLEW_OK: &str = r#"echo "> Task :app:$1"
mkdir -p app/build/outputs/apk/prod/release
printf 'APK-BYTES' > app/build/outputs/apk/prod/release/app-prod-release.apk
echo "BUILD SUCCESSFUL""#;
