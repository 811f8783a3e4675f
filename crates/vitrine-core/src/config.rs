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

//! Settings for the asset cache and the asset manager.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_MAX_ENTRIES: usize = 32;
const DEFAULT_MAX_CONCURRENT_DECODES: usize = 4;

/// An invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    /// The settings document is not valid RON for this structure.
    #[error("failed to parse settings: {0}")]
    Parse(String),
    /// A value is out of range.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Capacity settings of the asset cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetCacheConfig {
    /// Number of canonical entries kept before least-recently-used,
    /// unreferenced entries are evicted.
    pub max_entries: usize,
}

impl AssetCacheConfig {
    /// A configuration with the given capacity.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.max_entries",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Top-level settings of the asset manager.
///
/// ```ron
/// (
///     cache: (max_entries: 32),
///     max_concurrent_decodes: 4,
///     default_timeout_ms: None,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManagerSettings {
    /// Cache capacity.
    pub cache: AssetCacheConfig,
    /// Upper bound on decodes running at the same time.
    pub max_concurrent_decodes: usize,
    /// Timeout applied to `acquire` calls that do not set their own.
    pub default_timeout_ms: Option<u64>,
}

impl AssetManagerSettings {
    /// Parses and validates a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            ron::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a RON file.
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        if self.max_concurrent_decodes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_decodes",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// The default `acquire` timeout as a `Duration`.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for AssetManagerSettings {
    fn default() -> Self {
        Self {
            cache: AssetCacheConfig::default(),
            max_concurrent_decodes: DEFAULT_MAX_CONCURRENT_DECODES,
            default_timeout_ms: None,
        }
    }
}
