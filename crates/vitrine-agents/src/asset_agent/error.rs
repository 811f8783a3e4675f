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


use vitrine_core::asset::AssetKey;
use vitrine_core::decoder::DecodeError;
use vitrine_data::CacheError;

/// Why an asset could not be handed out.
///
/// Cloneable so that every waiter of a failed load receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The decoder failed. Failures are never cached; the next request decodes
    /// again.
    #[error("failed to decode '{key}': {source}")]
    Decode {
        /// The asset that failed.
        key: AssetKey,
        /// The decoder's error.
        #[source]
        source: DecodeError,
    },
    /// The asset is not cached.
    #[error("asset '{0}' is not cached")]
    NotFound(AssetKey),
    /// A canonical entry already existed when a decode finished.
    #[error("asset '{0}' was already cached")]
    AlreadyPresent(AssetKey),
    /// The caller's timeout elapsed. The decode itself keeps running.
    #[error("timed out waiting for '{0}'")]
    TimedOut(AssetKey),
    /// The decode task ended without producing an outcome.
    #[error("load of '{0}' was abandoned")]
    Abandoned(AssetKey),
}

impl LoadError {
    /// The asset the error is about.
    pub fn key(&self) -> &AssetKey {
        match self {
            LoadError::Decode { key, .. }
            | LoadError::NotFound(key)
            | LoadError::AlreadyPresent(key)
            | LoadError::TimedOut(key)
            | LoadError::Abandoned(key) => key,
        }
    }
}

impl From<CacheError> for LoadError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::NotFound(key) => LoadError::NotFound(key),
            CacheError::AlreadyPresent(key) => LoadError::AlreadyPresent(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_errors_convert_by_kind() {
        let key = AssetKey::new("a.glb");
        assert_eq!(
            LoadError::from(CacheError::NotFound(key.clone())),
            LoadError::NotFound(key.clone())
        );
        assert_eq!(
            LoadError::from(CacheError::AlreadyPresent(key.clone())),
            LoadError::AlreadyPresent(key)
        );
    }

    #[test]
    fn test_decode_error_keeps_its_source() {
        let key = AssetKey::new("broken.glb");
        let error = LoadError::Decode {
            key: key.clone(),
            source: DecodeError::malformed(&key, "bad header"),
        };

        assert_eq!(error.key(), &key);
        assert!(error.to_string().contains("bad header"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
