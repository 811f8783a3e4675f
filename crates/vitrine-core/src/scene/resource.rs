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

//! GPU-backed resources owned by a scene graph.

use crate::gpu::{GpuAllocator, GpuHandle, ResourceKind};
use std::collections::BTreeMap;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Returns the position of the item in its arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Index of a [`Geometry`] in its scene graph.
    GeometryId
);
arena_id!(
    /// Index of a [`Material`] in its scene graph.
    MaterialId
);
arena_id!(
    /// Index of a [`Texture`] in its scene graph.
    TextureId
);

/// A reference to one disposable resource of a scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceRef {
    /// A geometry buffer.
    Geometry(GeometryId),
    /// A material.
    Material(MaterialId),
    /// A texture.
    Texture(TextureId),
}

impl ResourceRef {
    /// Returns the kind of resource referenced.
    pub fn kind(self) -> ResourceKind {
        match self {
            ResourceRef::Geometry(_) => ResourceKind::Geometry,
            ResourceRef::Material(_) => ResourceKind::Material,
            ResourceRef::Texture(_) => ResourceKind::Texture,
        }
    }
}

/// How the vertices of a geometry are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    /// Every vertex is a point.
    PointList,
    /// Vertex pairs form segments.
    LineList,
    /// Consecutive vertices form a polyline.
    LineStrip,
    /// Vertex triples form triangles.
    #[default]
    TriangleList,
    /// Consecutive vertices form a triangle strip.
    TriangleStrip,
}

/// Vertex and index buffers of one mesh primitive.
#[derive(Debug)]
pub struct Geometry {
    /// Optional debug label.
    pub name: Option<String>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices, zero for non-indexed geometry.
    pub index_count: u32,
    /// Size of one vertex in bytes.
    pub vertex_stride: u32,
    /// Primitive assembly mode.
    pub topology: PrimitiveTopology,
    pub(crate) gpu: GpuHandle,
}

impl Geometry {
    /// Describes a geometry and allocates its buffers.
    pub fn new(
        allocator: &dyn GpuAllocator,
        name: Option<String>,
        vertex_count: u32,
        index_count: u32,
        vertex_stride: u32,
        topology: PrimitiveTopology,
    ) -> Self {
        let byte_size =
            u64::from(vertex_count) * u64::from(vertex_stride) + u64::from(index_count) * 4;
        Self {
            name,
            vertex_count,
            index_count,
            vertex_stride,
            topology,
            gpu: GpuHandle::allocate(allocator, ResourceKind::Geometry, byte_size),
        }
    }

    /// Returns the GPU handle backing the buffers.
    pub fn gpu(&self) -> &GpuHandle {
        &self.gpu
    }

    fn duplicate(&self, allocator: &dyn GpuAllocator) -> Self {
        Self {
            name: self.name.clone(),
            vertex_count: self.vertex_count,
            index_count: self.index_count,
            vertex_stride: self.vertex_stride,
            topology: self.topology,
            gpu: self.gpu.duplicate(allocator),
        }
    }
}

/// The shading model of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialKind {
    /// Metallic-roughness physically based shading.
    #[default]
    Standard,
    /// Unlit, flat color shading.
    Basic,
}

/// The texture inputs a material can sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    /// Albedo / base color.
    BaseColor,
    /// Baked lighting.
    Light,
    /// Height-based bump.
    Bump,
    /// Tangent-space normals.
    Normal,
    /// Specular intensity.
    Specular,
    /// Environment reflections.
    Environment,
    /// Ambient occlusion.
    AmbientOcclusion,
    /// Vertex displacement.
    Displacement,
    /// Metalness channel.
    Metalness,
    /// Roughness channel.
    Roughness,
    /// Opacity.
    Alpha,
    /// Emission.
    Emissive,
}

/// Surface description of a mesh primitive.
#[derive(Debug)]
pub struct Material {
    /// Optional debug label.
    pub name: Option<String>,
    /// Shading model.
    pub kind: MaterialKind,
    /// Linear RGBA base color.
    pub base_color: [f32; 4],
    /// Metalness factor in `[0, 1]`.
    pub metalness: f32,
    /// Roughness factor in `[0, 1]`.
    pub roughness: f32,
    /// Textures bound to this material, by slot.
    pub textures: BTreeMap<TextureSlot, TextureId>,
    pub(crate) gpu: GpuHandle,
}

/// Size of a material's uniform block.
const MATERIAL_UNIFORM_BYTES: u64 = 64;

impl Material {
    /// Creates a material with no textures and allocates its uniform block.
    pub fn new(
        allocator: &dyn GpuAllocator,
        name: Option<String>,
        kind: MaterialKind,
        base_color: [f32; 4],
        metalness: f32,
        roughness: f32,
    ) -> Self {
        Self {
            name,
            kind,
            base_color,
            metalness: metalness.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            textures: BTreeMap::new(),
            gpu: GpuHandle::allocate(allocator, ResourceKind::Material, MATERIAL_UNIFORM_BYTES),
        }
    }

    /// Binds `texture` to `slot`, replacing any previous binding.
    pub fn with_texture(mut self, slot: TextureSlot, texture: TextureId) -> Self {
        self.textures.insert(slot, texture);
        self
    }

    /// Returns the GPU handle backing the uniform block.
    pub fn gpu(&self) -> &GpuHandle {
        &self.gpu
    }

    fn duplicate(&self, allocator: &dyn GpuAllocator) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            base_color: self.base_color,
            metalness: self.metalness,
            roughness: self.roughness,
            textures: self.textures.clone(),
            gpu: self.gpu.duplicate(allocator),
        }
    }
}

/// An image uploaded for sampling.
#[derive(Debug)]
pub struct Texture {
    /// Optional debug label.
    pub name: Option<String>,
    /// Encoded or decoded size of the image data in bytes.
    pub byte_size: u64,
    pub(crate) gpu: GpuHandle,
}

impl Texture {
    /// Describes a texture and allocates its storage.
    pub fn new(allocator: &dyn GpuAllocator, name: Option<String>, byte_size: u64) -> Self {
        Self {
            name,
            byte_size,
            gpu: GpuHandle::allocate(allocator, ResourceKind::Texture, byte_size),
        }
    }

    /// Returns the GPU handle backing the image.
    pub fn gpu(&self) -> &GpuHandle {
        &self.gpu
    }

    fn duplicate(&self, allocator: &dyn GpuAllocator) -> Self {
        Self {
            name: self.name.clone(),
            byte_size: self.byte_size,
            gpu: self.gpu.duplicate(allocator),
        }
    }
}

/// The per-graph storage of every disposable resource.
#[derive(Debug, Default)]
pub(crate) struct ResourceArenas {
    pub(crate) geometries: Vec<Geometry>,
    pub(crate) materials: Vec<Material>,
    pub(crate) textures: Vec<Texture>,
}

impl ResourceArenas {
    pub(crate) fn duplicate(&self, allocator: &dyn GpuAllocator) -> Self {
        Self {
            geometries: self.geometries.iter().map(|g| g.duplicate(allocator)).collect(),
            materials: self.materials.iter().map(|m| m.duplicate(allocator)).collect(),
            textures: self.textures.iter().map(|t| t.duplicate(allocator)).collect(),
        }
    }

    pub(crate) fn handle_mut(&mut self, resource: ResourceRef) -> Option<&mut GpuHandle> {
        match resource {
            ResourceRef::Geometry(id) => self.geometries.get_mut(id.index()).map(|g| &mut g.gpu),
            ResourceRef::Material(id) => self.materials.get_mut(id.index()).map(|m| &mut m.gpu),
            ResourceRef::Texture(id) => self.textures.get_mut(id.index()).map(|t| &mut t.gpu),
        }
    }

    pub(crate) fn handle(&self, resource: ResourceRef) -> Option<&GpuHandle> {
        match resource {
            ResourceRef::Geometry(id) => self.geometries.get(id.index()).map(|g| &g.gpu),
            ResourceRef::Material(id) => self.materials.get(id.index()).map(|m| &m.gpu),
            ResourceRef::Texture(id) => self.textures.get(id.index()).map(|t| &t.gpu),
        }
    }
}
