use std::io;
use std::path::{Path, PathBuf};

pub const BUNDLE_FILE_NAME: &str = "index.ota.bundle";

/// Location of the downloaded override bundle inside the app's document directory.
#[derive(Debug, Clone)]
pub struct BundleStore { dir: PathBuf }

impl BundleStore {
    pub fn new(documents_dir: impl Into<PathBuf>) -> Self { Self { dir: documents_dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Fixed path of the override bundle, whether or not it exists.
    pub fn path(&self) -> PathBuf { self.dir.join(BUNDLE_FILE_NAME) }

    pub(crate) fn partial_path(&self) -> PathBuf { self.dir.join(format!("{BUNDLE_FILE_NAME}.part")) }

    /// The override bundle to boot, or `None` to boot the packaged bundle.
    pub fn bundle_path(&self) -> Option<PathBuf> {
        let path = self.path();
        path.is_file().then_some(path)
    }

    pub(crate) async fn commit(&self, partial: &Path) -> io::Result<PathBuf> {
        let target = self.path();
        tokio::fs::rename(partial, &target).await?;
        Ok(target)
    }

    /// Removes the override bundle. Returns whether one was present.
    pub fn clear(&self) -> io::Result<bool> {
        match std::fs::remove_file(self.path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
