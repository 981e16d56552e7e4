//! Filesystem-backed asset retrieval.

use std::io;
use std::path::{Component, Path, PathBuf};

use ferry_core::{AssetError, AssetSource};

/// Serves assets from files under a root directory.
///
/// Asset names are relative paths; names that would leave the root
/// (absolute paths, `..` components) are refused.
#[derive(Clone, Debug)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    /// A source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(AssetError::Transport {
                name: name.to_string(),
                reason: "asset names must be relative paths inside the root".into(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for FsAssetSource {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(name)?;
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AssetError::NotFound {
                name: name.to_string(),
            },
            _ => AssetError::Transport {
                name: name.to_string(),
                reason: format!("{}: {e}", path.display()),
            },
        })?;
        tracing::debug!(asset = name, bytes = bytes.len(), "fetched asset");
        Ok(bytes)
    }
}
