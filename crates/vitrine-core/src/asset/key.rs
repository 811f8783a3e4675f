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

use std::fmt;
use std::sync::Arc;

const SCHEME_SEPARATOR: &str = "://";

/// A normalized source location that uniquely identifies one logical asset.
///
/// Keys are cheap to clone: the normalized string is shared behind an `Arc`.
/// Comparison, ordering and hashing all operate on the normalized form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey(Arc<str>);

impl AssetKey {
    /// Normalizes `location` and wraps it as a key.
    ///
    /// Surrounding whitespace is trimmed, backslashes become forward slashes,
    /// `.` segments are dropped, `..` segments cancel the segment before them
    /// and repeated separators are collapsed. The authority part of a
    /// `scheme://authority/...` location is never popped by `..`.
    pub fn new(location: impl AsRef<str>) -> Self {
        Self(Arc::from(normalize(location.as_ref())))
    }

    /// Returns the normalized location.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the scheme of the location (`https`, `sample`, ...), if any.
    pub fn scheme(&self) -> Option<&str> {
        self.0
            .find(SCHEME_SEPARATOR)
            .map(|idx| &self.0[..idx])
            .filter(|scheme| !scheme.is_empty())
    }

    /// Returns the location without its `scheme://` prefix.
    pub fn path(&self) -> &str {
        match self.0.find(SCHEME_SEPARATOR) {
            Some(idx) => &self.0[idx + SCHEME_SEPARATOR.len()..],
            None => &self.0,
        }
    }

    /// Returns the final path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.path().rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Returns the lowercase extension of the final path segment.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Debug for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetKey({:?})", self.as_str())
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AssetKey {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<String> for AssetKey {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

fn normalize(location: &str) -> String {
    let unified = location.trim().replace('\\', "/");

    let (prefix, path) = match unified.find(SCHEME_SEPARATOR) {
        Some(idx) if idx > 0 => unified.split_at(idx + SCHEME_SEPARATOR.len()),
        _ => ("", unified.as_str()),
    };

    let absolute = path.starts_with('/');
    // The authority of a URL is not a directory. `file:///` has none.
    let floor = usize::from(!prefix.is_empty() && !absolute);

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                let can_pop = segments.len() > floor && segments.last() != Some(&"..");
                if can_pop {
                    segments.pop();
                } else if !absolute && prefix.is_empty() {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(unified.len());
    normalized.push_str(prefix);
    if absolute {
        normalized.push('/');
    }
    normalized.push_str(&segments.join("/"));
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_spellings_share_a_key() {
        let a = AssetKey::new("models/./hero.glb");
        let b = AssetKey::new("  models\\hero.glb ");
        let c = AssetKey::new("models//scenes/../hero.glb");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.as_str(), "models/hero.glb");
    }

    #[test]
    fn test_url_authority_is_preserved() {
        let key = AssetKey::new("https://cdn.example.com/../assets/./a.glb");
        assert_eq!(key.as_str(), "https://cdn.example.com/assets/a.glb");
        assert_eq!(key.scheme(), Some("https"));
        assert_eq!(key.path(), "cdn.example.com/assets/a.glb");
    }

    #[test]
    fn test_absolute_paths_do_not_escape_root() {
        assert_eq!(AssetKey::new("/../a.glb").as_str(), "/a.glb");
        assert_eq!(AssetKey::new("../a.glb").as_str(), "../a.glb");
        assert_eq!(
            AssetKey::new("file:///srv/models/../a.glb").as_str(),
            "file:///srv/a.glb"
        );
        assert_eq!(AssetKey::new("file:///srv/a.glb").path(), "/srv/a.glb");
    }

    #[test]
    fn test_file_name_and_extension() {
        let key = AssetKey::new("sample://sphere");
        assert_eq!(key.scheme(), Some("sample"));
        assert_eq!(key.file_name(), Some("sphere"));
        assert_eq!(key.extension(), None);

        let key = AssetKey::new("scenes/Robot.GLB");
        assert_eq!(key.file_name(), Some("Robot.GLB"));
        assert_eq!(key.extension().as_deref(), Some("glb"));
        assert_eq!(key.scheme(), None);
    }
}
