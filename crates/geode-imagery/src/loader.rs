//! Sources of raw tile bytes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::FetchError;

/// Fetches the bytes behind a tile locator. Called from worker threads.
pub trait ResourceLoader: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Resolves locators as paths under a root directory.
#[derive(Clone, Debug)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let relative = url.strip_prefix("file://").unwrap_or(url).trim_start_matches('/');
        self.root.join(relative)
    }
}

impl ResourceLoader for FileSystemLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(url);
        std::fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => FetchError::NotFound(url.to_owned()),
            _ => FetchError::Io {
                url: url.to_owned(),
                source,
            },
        })
    }
}
