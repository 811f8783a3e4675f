// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Fetching the raw bytes behind a source location.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Why a location could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Reading from disk failed.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The resolver cannot serve this kind of location.
    #[error("unsupported location '{0}'")]
    UnsupportedLocation(String),
}

/// Resolves the main file of an asset and the external files it references
/// (buffers, images).
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Fetches the bytes at `location`.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, ResolveError>;
}

/// Resolves locations from the local filesystem.
///
/// Relative locations are joined to the base path. `file://` locations are
/// read as absolute paths. Any other scheme is rejected.
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    base_path: PathBuf,
}

impl FileSystemResolver {
    /// Creates a resolver rooted at `base_path`.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, location: &str) -> Result<PathBuf, ResolveError> {
        if let Some(path) = location.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if location.contains("://") {
            return Err(ResolveError::UnsupportedLocation(location.to_string()));
        }
        Ok(self.base_path.join(location))
    }
}

impl Default for FileSystemResolver {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl SourceResolver for FileSystemResolver {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, ResolveError> {
        let path = self.path_for(location)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| ResolveError::Io { path, source })
    }
}
