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


//! Procedural sample models, addressed as `sample://<type>`.

use async_trait::async_trait;
use vitrine_core::asset::AssetKey;
use vitrine_core::decoder::{DecodeError, ProgressSink, SceneDecoder};
use vitrine_core::gpu::GpuAllocator;
use vitrine_core::scene::{
    Geometry, Material, MaterialKind, MeshNode, NodeKind, Primitive, PrimitiveTopology,
    SceneGraph, SceneNode,
};

/// The scheme handled by [`SampleSceneDecoder`].
pub const SAMPLE_SCHEME: &str = "sample";

/// Showcase blue, `#2563eb`.
const SAMPLE_COLOR: u32 = 0x2563eb;
const SAMPLE_METALNESS: f32 = 0.7;
const SAMPLE_ROUGHNESS: f32 = 0.1;
/// Position, normal and one UV set.
const SAMPLE_VERTEX_STRIDE: u32 = 32;

/// The built-in sample shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShape {
    /// Unit-radius UV sphere with 32 width and height segments.
    Sphere,
    /// Unit cube.
    Cube,
    /// 2x2 plane.
    Plane,
}

impl SampleShape {
    /// Parses a shape name (`sphere`, `cube`, `plane`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sphere" => Some(Self::Sphere),
            "cube" => Some(Self::Cube),
            "plane" => Some(Self::Plane),
            _ => None,
        }
    }

    /// Vertex and index counts of the generated geometry.
    pub fn counts(self) -> (u32, u32) {
        match self {
            Self::Sphere => {
                let (width, height) = (32, 32);
                let vertices = (width + 1) * (height + 1);
                // The pole rows contribute one triangle per quad instead of two.
                let triangles = 2 * width * (height - 1);
                (vertices, triangles * 3)
            }
            Self::Cube => (24, 36),
            Self::Plane => (4, 6),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Cube => "cube",
            Self::Plane => "plane",
        }
    }
}

/// Produces sample models without touching the filesystem or the network.
///
/// Each sample is a group holding one mesh shaded with the showcase material.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSceneDecoder;

impl SampleSceneDecoder {
    /// Creates the decoder.
    pub fn new() -> Self {
        Self
    }

    /// Builds the graph for `shape`.
    pub fn build(&self, shape: SampleShape, allocator: &dyn GpuAllocator) -> SceneGraph {
        let mut graph = SceneGraph::new(Some(format!("sample-{}", shape.name())));
        let (vertex_count, index_count) = shape.counts();
        let geometry = graph.add_geometry(Geometry::new(
            allocator,
            Some(shape.name().to_owned()),
            vertex_count,
            index_count,
            SAMPLE_VERTEX_STRIDE,
            PrimitiveTopology::TriangleList,
        ));
        let material = graph.add_material(Material::new(
            allocator,
            Some("sample".to_owned()),
            MaterialKind::Standard,
            srgb_hex_to_linear(SAMPLE_COLOR),
            SAMPLE_METALNESS,
            SAMPLE_ROUGHNESS,
        ));
        let mesh = MeshNode::new(vec![Primitive {
            geometry,
            material: material.ok(),
        }]);
        let root = graph.root();
        if let Err(e) = graph.add_node(
            root,
            SceneNode::new(Some(shape.name().to_owned()), NodeKind::Mesh(mesh)),
        ) {
            log::error!("Sample '{}' produced an invalid mesh: {}", shape.name(), e);
        }
        graph
    }
}

#[async_trait]
impl SceneDecoder for SampleSceneDecoder {
    async fn decode(
        &self,
        source: &AssetKey,
        allocator: &dyn GpuAllocator,
        progress: &ProgressSink,
    ) -> Result<SceneGraph, DecodeError> {
        if source.scheme() != Some(SAMPLE_SCHEME) {
            return Err(DecodeError::unsupported(source, "not a sample:// location"));
        }
        let shape = SampleShape::from_name(source.path()).ok_or_else(|| {
            DecodeError::unsupported(source, format!("unknown sample model type '{}'", source.path()))
        })?;
        let graph = self.build(shape, allocator);
        progress.report(1.0);
        Ok(graph)
    }

    fn name(&self) -> &'static str {
        "SampleSceneDecoder"
    }
}

/// Converts a `0xRRGGBB` sRGB color to linear RGBA.
fn srgb_hex_to_linear(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0), 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::gpu::TrackingAllocator;

    #[tokio::test]
    async fn test_sphere_sample_has_one_styled_mesh() {
        let allocator = TrackingAllocator::new();
        let graph = SampleSceneDecoder::new()
            .decode(&AssetKey::new("sample://sphere"), &allocator, &ProgressSink::noop())
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        let mesh = graph
            .node(graph.find_node("sphere").unwrap())
            .unwrap()
            .as_mesh()
            .unwrap();
        let geometry = graph.geometry(mesh.primitives[0].geometry).unwrap();
        assert_eq!((geometry.vertex_count, geometry.index_count), (1089, 5952));

        let material = graph.material(mesh.primitives[0].material.unwrap()).unwrap();
        assert_eq!(material.metalness, 0.7);
        assert_eq!(material.roughness, 0.1);
        assert!(material.base_color[2] > material.base_color[0]);
        assert_eq!(allocator.live_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_sample_type_is_unsupported() {
        let allocator = TrackingAllocator::new();
        let decoder = SampleSceneDecoder::new();

        let result = decoder
            .decode(&AssetKey::new("sample://teapot"), &allocator, &ProgressSink::noop())
            .await;
        assert!(matches!(result, Err(DecodeError::Unsupported { .. })));

        let result = decoder
            .decode(&AssetKey::new("models/cube.glb"), &allocator, &ProgressSink::noop())
            .await;
        assert!(matches!(result, Err(DecodeError::Unsupported { .. })));
        assert_eq!(allocator.live_count(), 0);
    }

    #[test]
    fn test_shape_counts() {
        assert_eq!(SampleShape::Cube.counts(), (24, 36));
        assert_eq!(SampleShape::Plane.counts(), (4, 6));
        assert_eq!(SampleShape::from_name("cube"), Some(SampleShape::Cube));
        assert_eq!(SampleShape::from_name("Cube"), None);
    }
}
