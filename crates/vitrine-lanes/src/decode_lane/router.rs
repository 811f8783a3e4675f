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


//! Dispatch of decode requests by location scheme.

use super::gltf_decoder_lane::GltfDecoderLane;
use super::sample_decoder_lane::{SampleSceneDecoder, SAMPLE_SCHEME};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use vitrine_core::asset::AssetKey;
use vitrine_core::decoder::{DecodeError, ProgressSink, SceneDecoder};
use vitrine_core::gpu::GpuAllocator;
use vitrine_core::scene::SceneGraph;

/// A decoder that forwards each request to the decoder registered for the
/// key's scheme, or to a fallback when no route matches.
#[derive(Clone)]
pub struct DecoderRouter {
    routes: HashMap<String, Arc<dyn SceneDecoder>>,
    fallback: Arc<dyn SceneDecoder>,
}

impl DecoderRouter {
    /// Creates a router that sends everything to `fallback`.
    pub fn new(fallback: Arc<dyn SceneDecoder>) -> Self {
        Self {
            routes: HashMap::new(),
            fallback,
        }
    }

    /// The standard setup: `sample://` keys go to the [`SampleSceneDecoder`],
    /// everything else to a [`GltfDecoderLane`] reading from `base_path`.
    pub fn with_defaults(base_path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(GltfDecoderLane::from_directory(base_path)))
            .route(SAMPLE_SCHEME, Arc::new(SampleSceneDecoder::new()))
    }

    /// Routes keys with `scheme` to `decoder`, replacing any previous route.
    pub fn route(mut self, scheme: impl Into<String>, decoder: Arc<dyn SceneDecoder>) -> Self {
        self.routes.insert(scheme.into(), decoder);
        self
    }

    fn select(&self, source: &AssetKey) -> &dyn SceneDecoder {
        let decoder = source
            .scheme()
            .and_then(|scheme| self.routes.get(scheme))
            .unwrap_or(&self.fallback);
        &**decoder
    }
}

#[async_trait]
impl SceneDecoder for DecoderRouter {
    async fn decode(
        &self,
        source: &AssetKey,
        allocator: &dyn GpuAllocator,
        progress: &ProgressSink,
    ) -> Result<SceneGraph, DecodeError> {
        let decoder = self.select(source);
        log::debug!("Routing '{}' to {}", source, decoder.name());
        decoder.decode(source, allocator, progress).await
    }

    fn name(&self) -> &'static str {
        "DecoderRouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::gpu::TrackingAllocator;

    #[tokio::test]
    async fn test_routes_by_scheme_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let router = DecoderRouter::with_defaults(dir.path());
        let allocator = TrackingAllocator::new();
        let progress = ProgressSink::noop();

        let sample = router
            .decode(&AssetKey::new("sample://cube"), &allocator, &progress)
            .await
            .unwrap();
        assert!(sample.find_node("cube").is_some());

        // Falls through to the glTF decoder, which cannot find the file.
        let missing = router
            .decode(&AssetKey::new("models/none.glb"), &allocator, &progress)
            .await;
        assert!(matches!(missing, Err(DecodeError::Unreachable { .. })));
    }
}
