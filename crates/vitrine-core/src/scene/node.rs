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

//! The closed set of node variants a scene graph is made of.

use super::resource::{GeometryId, MaterialId};

/// Index of a [`SceneNode`] in its scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the position of the node in the node arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Local transform of a node, decomposed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation.
    pub translation: [f32; 3],
    /// Rotation quaternion, `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Non-uniform scale.
    pub scale: [f32; 3],
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One drawable part of a mesh: a geometry and the material it is shaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    /// Vertex data.
    pub geometry: GeometryId,
    /// Surface; `None` draws with the renderer's fallback material.
    pub material: Option<MaterialId>,
}

/// A renderable node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshNode {
    /// The parts drawn for this mesh.
    pub primitives: Vec<Primitive>,
    /// Whether the mesh occludes light for other surfaces.
    pub cast_shadow: bool,
    /// Whether the mesh is darkened by other shadow casters.
    pub receive_shadow: bool,
    /// Whether the mesh may be skipped when outside the view frustum.
    pub frustum_culled: bool,
}

impl MeshNode {
    /// Creates a mesh with the given primitives and every render flag off.
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self {
            primitives,
            ..Default::default()
        }
    }
}

/// The emission model of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Uniform light from every direction.
    Ambient,
    /// Parallel rays, like the sun.
    Directional,
    /// Omnidirectional from a point.
    Point,
    /// A cone from a point.
    Spot,
}

/// A light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightNode {
    /// Emission model.
    pub kind: LightKind,
    /// Linear RGB color.
    pub color: [f32; 3],
    /// Intensity multiplier.
    pub intensity: f32,
}

/// Camera projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance; `None` for an infinite projection.
        far: Option<f32>,
    },
    /// Orthographic projection.
    Orthographic {
        /// Zoom factor applied to the view volume.
        zoom: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
}

/// A viewpoint embedded in the asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraNode {
    /// Projection parameters.
    pub projection: Projection,
}

/// What a node is. Every traversal matches on this exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A pure transform node.
    Group,
    /// A renderable mesh.
    Mesh(MeshNode),
    /// A light source.
    Light(LightNode),
    /// A camera.
    Camera(CameraNode),
}

/// A node of a scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Optional name from the source asset.
    pub name: Option<String>,
    /// Local transform relative to the parent.
    pub transform: Transform,
    /// Node variant.
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    /// Creates a detached node.
    pub fn new(name: Option<String>, kind: NodeKind) -> Self {
        Self {
            name,
            transform: Transform::IDENTITY,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Sets the local transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Returns the parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the mesh payload if this is a mesh node.
    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group | NodeKind::Light(_) | NodeKind::Camera(_) => None,
        }
    }

    /// Returns the mesh payload mutably if this is a mesh node.
    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group | NodeKind::Light(_) | NodeKind::Camera(_) => None,
        }
    }
}
