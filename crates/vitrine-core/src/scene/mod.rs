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

//! The decoded scene graph of a 3D asset.
//!
//! A [`SceneGraph`] stores its nodes and its GPU-backed resources in arenas.
//! Nodes refer to geometries and materials, and materials to textures, through
//! typed ids. A resource used by several meshes of the same asset therefore
//! exists exactly once and is disposed exactly once, and two graphs can never
//! alias each other's resources: [`SceneGraph::deep_clone`] duplicates every
//! allocation.

mod node;
mod resource;

pub use node::*;
pub use resource::*;

use crate::gpu::{GpuAllocator, GpuHandle};
use resource::ResourceArenas;

/// An invalid reference passed while building a scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The node does not exist in this graph.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// The geometry does not exist in this graph.
    #[error("unknown geometry {0:?}")]
    UnknownGeometry(GeometryId),
    /// The material does not exist in this graph.
    #[error("unknown material {0:?}")]
    UnknownMaterial(MaterialId),
    /// The texture does not exist in this graph.
    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),
}

/// A decoded 3D scene: a node tree plus the resources it draws with.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    resources: ResourceArenas,
}

impl SceneGraph {
    /// Creates a graph holding a single root group.
    pub fn new(root_name: Option<String>) -> Self {
        Self {
            nodes: vec![SceneNode::new(root_name, NodeKind::Group)],
            resources: ResourceArenas::default(),
        }
    }

    /// The root node. Always present.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Attaches `node` under `parent` and returns its id.
    ///
    /// Mesh primitives must reference geometries and materials already added.
    pub fn add_node(&mut self, parent: NodeId, mut node: SceneNode) -> Result<NodeId, SceneError> {
        if parent.index() >= self.nodes.len() {
            return Err(SceneError::UnknownNode(parent));
        }
        if let Some(mesh) = node.as_mesh() {
            for primitive in &mesh.primitives {
                if primitive.geometry.index() >= self.resources.geometries.len() {
                    return Err(SceneError::UnknownGeometry(primitive.geometry));
                }
                if let Some(material) = primitive.material {
                    if material.index() >= self.resources.materials.len() {
                        return Err(SceneError::UnknownMaterial(material));
                    }
                }
            }
        }

        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// Stores a geometry.
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.resources.geometries.push(geometry);
        GeometryId((self.resources.geometries.len() - 1) as u32)
    }

    /// Stores a material. Its textures must already be added.
    pub fn add_material(&mut self, material: Material) -> Result<MaterialId, SceneError> {
        if let Some(texture) = material
            .textures
            .values()
            .find(|texture| texture.index() >= self.resources.textures.len())
        {
            return Err(SceneError::UnknownTexture(*texture));
        }
        self.resources.materials.push(material);
        Ok(MaterialId((self.resources.materials.len() - 1) as u32))
    }

    /// Stores a texture.
    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.resources.textures.push(texture);
        TextureId((self.resources.textures.len() - 1) as u32)
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    /// Returns a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index())
    }

    /// Iterates over every node with its id, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Finds the first node carrying `name`.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(id, _)| id)
    }

    /// Returns a geometry.
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.resources.geometries.get(id.index())
    }

    /// Returns a material.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.resources.materials.get(id.index())
    }

    /// Returns a material mutably, e.g. to tint a working copy.
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.resources.materials.get_mut(id.index())
    }

    /// Returns a texture.
    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.resources.textures.get(id.index())
    }

    /// All geometries of the graph.
    pub fn geometries(&self) -> &[Geometry] {
        &self.resources.geometries
    }

    /// All materials of the graph.
    pub fn materials(&self) -> &[Material] {
        &self.resources.materials
    }

    /// All textures of the graph.
    pub fn textures(&self) -> &[Texture] {
        &self.resources.textures
    }

    /// Returns the GPU handle of a resource.
    pub fn resource_handle(&self, resource: ResourceRef) -> Option<&GpuHandle> {
        self.resources.handle(resource)
    }

    /// Releases the GPU allocation of one resource.
    ///
    /// Returns `Some(true)` if an allocation was released, `Some(false)` if it
    /// had already been released, and `None` if the resource does not exist.
    pub fn release_resource(
        &mut self,
        resource: ResourceRef,
        allocator: &dyn GpuAllocator,
    ) -> Option<bool> {
        self.resources
            .handle_mut(resource)
            .map(|handle| handle.release(allocator))
    }

    /// Every resource stored in the arenas, reachable or not.
    pub fn resource_refs(&self) -> impl Iterator<Item = ResourceRef> + '_ {
        let geometries = (0..self.resources.geometries.len())
            .map(|index| ResourceRef::Geometry(GeometryId(index as u32)));
        let materials = (0..self.resources.materials.len())
            .map(|index| ResourceRef::Material(MaterialId(index as u32)));
        let textures = (0..self.resources.textures.len())
            .map(|index| ResourceRef::Texture(TextureId(index as u32)));
        geometries.chain(materials).chain(textures)
    }

    /// Total number of resources stored, released or not.
    pub fn resource_count(&self) -> usize {
        self.resources.geometries.len()
            + self.resources.materials.len()
            + self.resources.textures.len()
    }

    /// Number of resources whose allocation is still held.
    pub fn live_resource_count(&self) -> usize {
        self.handles().filter(|handle| handle.is_live()).count()
    }

    /// Bytes held by live allocations.
    pub fn live_bytes(&self) -> u64 {
        self.handles()
            .filter(|handle| handle.is_live())
            .map(GpuHandle::byte_size)
            .sum()
    }

    /// Produces an independent copy with freshly allocated resources.
    ///
    /// Ids stay valid across the copy because the arenas keep their order.
    pub fn deep_clone(&self, allocator: &dyn GpuAllocator) -> SceneGraph {
        SceneGraph {
            nodes: self.nodes.clone(),
            resources: self.resources.duplicate(allocator),
        }
    }

    fn handles(&self) -> impl Iterator<Item = &GpuHandle> {
        let geometries = self.resources.geometries.iter().map(|g| &g.gpu);
        let materials = self.resources.materials.iter().map(|m| &m.gpu);
        let textures = self.resources.textures.iter().map(|t| &t.gpu);
        geometries.chain(materials).chain(textures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::TrackingAllocator;

    fn textured_cube(allocator: &TrackingAllocator) -> SceneGraph {
        let mut graph = SceneGraph::new(Some("cube".into()));
        let texture = graph.add_texture(Texture::new(allocator, None, 4096));
        let material = graph
            .add_material(
                Material::new(allocator, None, MaterialKind::Standard, [1.0; 4], 0.5, 0.5)
                    .with_texture(TextureSlot::BaseColor, texture),
            )
            .unwrap();
        let geometry = graph.add_geometry(Geometry::new(
            allocator,
            None,
            24,
            36,
            32,
            PrimitiveTopology::TriangleList,
        ));
        let mesh = MeshNode::new(vec![Primitive {
            geometry,
            material: Some(material),
        }]);
        graph
            .add_node(graph.root(), SceneNode::new(Some("body".into()), NodeKind::Mesh(mesh)))
            .unwrap();
        graph
    }

    #[test]
    fn test_add_node_links_parent_and_children() {
        let allocator = TrackingAllocator::new();
        let graph = textured_cube(&allocator);
        let body = graph.find_node("body").unwrap();

        assert_eq!(graph.node(body).unwrap().parent(), Some(graph.root()));
        assert_eq!(graph.node(graph.root()).unwrap().children(), &[body]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.resource_count(), 3);
    }

    #[test]
    fn test_dangling_references_are_rejected() {
        let allocator = TrackingAllocator::new();
        let mut graph = SceneGraph::new(None);
        let mut other = SceneGraph::new(None);
        let foreign = other.add_geometry(Geometry::new(
            &allocator,
            None,
            3,
            0,
            12,
            PrimitiveTopology::TriangleList,
        ));

        let mesh = MeshNode::new(vec![Primitive {
            geometry: foreign,
            material: None,
        }]);
        let result = graph.add_node(graph.root(), SceneNode::new(None, NodeKind::Mesh(mesh)));
        assert_eq!(result, Err(SceneError::UnknownGeometry(foreign)));
    }

    #[test]
    fn test_deep_clone_allocates_fresh_resources() {
        let allocator = TrackingAllocator::new();
        let original = textured_cube(&allocator);
        let mut copy = original.deep_clone(&allocator);

        assert_eq!(allocator.live_count(), 6);
        for (a, b) in original.materials().iter().zip(copy.materials()) {
            assert_ne!(a.gpu().allocation(), b.gpu().allocation());
        }

        let material = copy.materials().len() - 1;
        copy.material_mut(MaterialId(material as u32)).unwrap().base_color = [1.0, 0.0, 0.0, 1.0];
        assert_eq!(original.materials()[material].base_color, [1.0; 4]);
    }

    #[test]
    fn test_release_resource_reports_state() {
        let allocator = TrackingAllocator::new();
        let mut graph = textured_cube(&allocator);
        let texture = ResourceRef::Texture(TextureId(0));

        assert_eq!(graph.release_resource(texture, &allocator), Some(true));
        assert_eq!(graph.release_resource(texture, &allocator), Some(false));
        assert_eq!(
            graph.release_resource(ResourceRef::Texture(TextureId(9)), &allocator),
            None
        );
        assert_eq!(graph.live_resource_count(), 2);
    }
}
