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


//! glTF / GLB scene decoder with support for embedded and external resources.

use super::source_resolver::{FileSystemResolver, SourceResolver};
use crate::resource_lane::dispose_graph;
use async_trait::async_trait;
use base64::Engine;
use gltf::Buffer;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use vitrine_core::asset::AssetKey;
use vitrine_core::decoder::{DecodeError, ProgressSink, SceneDecoder};
use vitrine_core::gpu::GpuAllocator;
use vitrine_core::scene::{
    CameraNode, Geometry, Material, MaterialId, MaterialKind, MeshNode, NodeId, NodeKind,
    Primitive, PrimitiveTopology, Projection, SceneGraph, SceneNode, Texture, TextureId,
    TextureSlot, Transform,
};

const POSITION_BYTES: u32 = 12;
const NORMAL_BYTES: u32 = 12;
const TEX_COORD_BYTES: u32 = 8;
const TANGENT_BYTES: u32 = 16;
const COLOR_BYTES: u32 = 16;

/// Decodes glTF 2.0 files (`.gltf` with external or embedded buffers, and
/// binary `.glb`) into scene graphs.
///
/// The default scene (or the first scene when none is marked default) becomes
/// the node tree. Every glTF mesh primitive becomes one geometry, every glTF
/// material one material, and every glTF texture one texture. Primitives
/// without a material share a single default material.
#[derive(Clone)]
pub struct GltfDecoderLane {
    resolver: Arc<dyn SourceResolver>,
}

impl GltfDecoderLane {
    /// Creates a decoder that fetches through `resolver`.
    pub fn new(resolver: Arc<dyn SourceResolver>) -> Self {
        Self { resolver }
    }

    /// Creates a decoder reading files relative to `base_path`.
    pub fn from_directory(base_path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileSystemResolver::new(base_path)))
    }

    async fn fetch_relative(&self, source: &AssetKey, uri: &str) -> Result<Vec<u8>, DecodeError> {
        let location = sibling_location(source, uri);
        self.resolver
            .fetch(location.as_str())
            .await
            .map_err(|e| DecodeError::unreachable(source, format!("'{}': {}", uri, e)))
    }

    async fn load_buffers(
        &self,
        source: &AssetKey,
        gltf: &gltf::Gltf,
    ) -> Result<Vec<Vec<u8>>, DecodeError> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            let bytes = match buffer.source() {
                gltf::buffer::Source::Bin => gltf.blob.clone().ok_or_else(|| {
                    DecodeError::malformed(source, "GLB file references a missing binary chunk")
                })?,
                gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                    decode_data_uri(uri).map_err(|reason| DecodeError::malformed(source, reason))?
                }
                gltf::buffer::Source::Uri(uri) => self.fetch_relative(source, uri).await?,
            };
            if bytes.len() < buffer.length() {
                return Err(DecodeError::malformed(
                    source,
                    format!(
                        "buffer {} holds {} bytes but declares {}",
                        buffer.index(),
                        bytes.len(),
                        buffer.length()
                    ),
                ));
            }
            buffer_data.push(bytes);
        }
        Ok(buffer_data)
    }

    async fn load_image_sizes(
        &self,
        source: &AssetKey,
        gltf: &gltf::Gltf,
    ) -> Result<Vec<u64>, DecodeError> {
        let mut sizes = Vec::new();
        for image in gltf.images() {
            let size = match image.source() {
                gltf::image::Source::View { view, .. } => view.length(),
                gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                    decode_data_uri(uri)
                        .map_err(|reason| DecodeError::malformed(source, reason))?
                        .len()
                }
                gltf::image::Source::Uri { uri, .. } => self.fetch_relative(source, uri).await?.len(),
            };
            sizes.push(size as u64);
        }
        Ok(sizes)
    }
}

#[async_trait]
impl SceneDecoder for GltfDecoderLane {
    async fn decode(
        &self,
        source: &AssetKey,
        allocator: &dyn GpuAllocator,
        progress: &ProgressSink,
    ) -> Result<SceneGraph, DecodeError> {
        let bytes = self
            .resolver
            .fetch(source.as_str())
            .await
            .map_err(|e| DecodeError::unreachable(source, e))?;
        progress.report(0.25);

        let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| DecodeError::malformed(source, e))?;
        progress.report(0.5);

        let buffers = self.load_buffers(source, &gltf).await?;
        let image_sizes = self.load_image_sizes(source, &gltf).await?;
        progress.report(0.75);

        let scene = gltf
            .document
            .default_scene()
            .or_else(|| gltf.document.scenes().next());
        let mut graph = SceneGraph::new(scene.as_ref().and_then(|s| s.name()).map(str::to_owned));

        let mut builder = GraphBuilder {
            source,
            buffers: &buffers,
            allocator,
            default_material: None,
        };
        if let Err(e) = builder.populate(&mut graph, &gltf.document, scene, &image_sizes) {
            dispose_graph(&mut graph, allocator);
            return Err(e);
        }

        log::debug!(
            "Decoded glTF '{}': {} node(s), {} resource(s)",
            source,
            graph.node_count(),
            graph.resource_count()
        );
        progress.report(1.0);
        Ok(graph)
    }

    fn name(&self) -> &'static str {
        "GltfDecoder"
    }
}

struct GraphBuilder<'a> {
    source: &'a AssetKey,
    buffers: &'a [Vec<u8>],
    allocator: &'a dyn GpuAllocator,
    default_material: Option<MaterialId>,
}

impl GraphBuilder<'_> {
    fn populate(
        &mut self,
        graph: &mut SceneGraph,
        document: &gltf::Document,
        scene: Option<gltf::Scene<'_>>,
        image_sizes: &[u64],
    ) -> Result<(), DecodeError> {
        let textures: Vec<TextureId> = document
            .textures()
            .map(|texture| {
                let byte_size = image_sizes
                    .get(texture.source().index())
                    .copied()
                    .unwrap_or_default();
                graph.add_texture(Texture::new(
                    self.allocator,
                    texture.name().map(str::to_owned),
                    byte_size,
                ))
            })
            .collect();

        let mut materials = Vec::new();
        for material in document.materials() {
            materials.push(self.add_material(graph, &material, &textures)?);
        }

        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            let mut primitives = Vec::new();
            for primitive in mesh.primitives() {
                primitives.push(self.add_primitive(graph, &primitive, &materials)?);
            }
            meshes.push(primitives);
        }

        let Some(scene) = scene else {
            log::warn!("glTF '{}' has no scene; decoded graph is empty", self.source);
            return Ok(());
        };

        let mut stack: Vec<(gltf::Node<'_>, NodeId)> =
            scene.nodes().map(|node| (node, graph.root())).collect();
        stack.reverse();
        // Node hierarchies are disjoint trees.
        let mut visited = HashSet::new();
        while let Some((node, parent)) = stack.pop() {
            if !visited.insert(node.index()) {
                let reason = format!(
                    "node {} is reachable twice; the node hierarchy must be a tree",
                    node.index()
                );
                return Err(DecodeError::malformed(self.source, reason));
            }
            let id = graph
                .add_node(parent, convert_node(&node, &meshes))
                .map_err(|e| DecodeError::malformed(self.source, e))?;
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, id)));
        }
        Ok(())
    }

    fn add_material(
        &self,
        graph: &mut SceneGraph,
        material: &gltf::Material<'_>,
        textures: &[TextureId],
    ) -> Result<MaterialId, DecodeError> {
        let pbr = material.pbr_metallic_roughness();
        let metallic_roughness = pbr.metallic_roughness_texture().map(|info| info.texture().index());
        let slots = [
            (
                TextureSlot::BaseColor,
                pbr.base_color_texture().map(|info| info.texture().index()),
            ),
            (TextureSlot::Metalness, metallic_roughness),
            (TextureSlot::Roughness, metallic_roughness),
            (
                TextureSlot::Normal,
                material.normal_texture().map(|normal| normal.texture().index()),
            ),
            (
                TextureSlot::AmbientOcclusion,
                material.occlusion_texture().map(|occlusion| occlusion.texture().index()),
            ),
            (
                TextureSlot::Emissive,
                material.emissive_texture().map(|info| info.texture().index()),
            ),
        ];

        let mut converted = Material::new(
            self.allocator,
            material.name().map(str::to_owned),
            MaterialKind::Standard,
            pbr.base_color_factor(),
            pbr.metallic_factor(),
            pbr.roughness_factor(),
        );
        for (slot, index) in slots {
            if let Some(texture) = index.and_then(|index| textures.get(index)) {
                converted = converted.with_texture(slot, *texture);
            }
        }
        graph
            .add_material(converted)
            .map_err(|e| DecodeError::malformed(self.source, e))
    }

    fn add_primitive(
        &mut self,
        graph: &mut SceneGraph,
        primitive: &gltf::Primitive<'_>,
        materials: &[MaterialId],
    ) -> Result<Primitive, DecodeError> {
        let buffers = self.buffers;
        let get_buffer_data =
            |buffer: Buffer<'_>| buffers.get(buffer.index()).map(Vec::as_slice);
        let reader = primitive.reader(get_buffer_data);

        let vertex_count = reader
            .read_positions()
            .ok_or_else(|| DecodeError::malformed(self.source, "vertex positions attribute not found"))?
            .count();
        let mut vertex_stride = POSITION_BYTES;
        if reader.read_normals().is_some() {
            vertex_stride += NORMAL_BYTES;
        }
        if reader.read_tex_coords(0).is_some() {
            vertex_stride += TEX_COORD_BYTES;
        }
        if reader.read_tangents().is_some() {
            vertex_stride += TANGENT_BYTES;
        }
        if reader.read_colors(0).is_some() {
            vertex_stride += COLOR_BYTES;
        }
        let index_count = reader
            .read_indices()
            .map(|indices| indices.into_u32().count())
            .unwrap_or(0);

        let geometry = graph.add_geometry(Geometry::new(
            self.allocator,
            None,
            vertex_count as u32,
            index_count as u32,
            vertex_stride,
            map_primitive_type(primitive.mode()),
        ));

        let material = match primitive.material().index() {
            Some(index) => materials.get(index).copied(),
            None => Some(self.default_material(graph)?),
        };
        Ok(Primitive { geometry, material })
    }

    fn default_material(&mut self, graph: &mut SceneGraph) -> Result<MaterialId, DecodeError> {
        if let Some(id) = self.default_material {
            return Ok(id);
        }
        let material = Material::new(
            self.allocator,
            Some("default".to_owned()),
            MaterialKind::Standard,
            [1.0; 4],
            1.0,
            1.0,
        );
        let id = graph
            .add_material(material)
            .map_err(|e| DecodeError::malformed(self.source, e))?;
        self.default_material = Some(id);
        Ok(id)
    }
}

fn convert_node(node: &gltf::Node<'_>, meshes: &[Vec<Primitive>]) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let kind = if let Some(mesh) = node.mesh() {
        let primitives = meshes.get(mesh.index()).cloned().unwrap_or_default();
        NodeKind::Mesh(MeshNode::new(primitives))
    } else if let Some(camera) = node.camera() {
        NodeKind::Camera(CameraNode {
            projection: map_projection(camera.projection()),
        })
    } else {
        NodeKind::Group
    };
    SceneNode::new(node.name().map(str::to_owned), kind).with_transform(Transform {
        translation,
        rotation,
        scale,
    })
}

fn map_projection(projection: gltf::camera::Projection<'_>) -> Projection {
    match projection {
        gltf::camera::Projection::Perspective(perspective) => Projection::Perspective {
            fov_y: perspective.yfov(),
            near: perspective.znear(),
            far: perspective.zfar(),
        },
        gltf::camera::Projection::Orthographic(orthographic) => Projection::Orthographic {
            zoom: 1.0,
            near: orthographic.znear(),
            far: orthographic.zfar(),
        },
    }
}

fn map_primitive_type(mode: gltf::mesh::Mode) -> PrimitiveTopology {
    match mode {
        gltf::mesh::Mode::Triangles => PrimitiveTopology::TriangleList,
        gltf::mesh::Mode::TriangleStrip => PrimitiveTopology::TriangleStrip,
        gltf::mesh::Mode::Lines => PrimitiveTopology::LineList,
        gltf::mesh::Mode::LineStrip => PrimitiveTopology::LineStrip,
        gltf::mesh::Mode::Points => PrimitiveTopology::PointList,
        _ => PrimitiveTopology::TriangleList,
    }
}

/// Resolves `uri` against the directory of `source`.
fn sibling_location(source: &AssetKey, uri: &str) -> AssetKey {
    match source.as_str().rfind('/') {
        Some(idx) => AssetKey::new(format!("{}/{}", &source.as_str()[..idx], uri)),
        None => AssetKey::new(uri),
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err(format!("unsupported data URI encoding: {}", header));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64 payload: {}", e))
}
