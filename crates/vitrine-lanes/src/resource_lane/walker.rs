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

//! Lazy enumeration of the resources reachable from a node.

use std::collections::{HashSet, VecDeque};
use vitrine_core::scene::{NodeId, NodeKind, ResourceRef, SceneGraph, SceneNode};

/// A depth-first, pre-order walk over the resources of a subtree.
///
/// Created by [`walk`]. The walk borrows the graph immutably, so the graph
/// cannot change underneath it; cloning the walk (or calling [`walk`] again)
/// restarts it independently.
#[derive(Debug, Clone)]
pub struct ResourceWalk<'g> {
    graph: &'g SceneGraph,
    stack: Vec<NodeId>,
    pending: VecDeque<ResourceRef>,
    seen: HashSet<ResourceRef>,
}

/// Enumerates every resource reachable from `root`, each exactly once.
///
/// For every mesh primitive the geometry comes first, then its material, then
/// the material's textures in slot order. Nodes are visited depth-first with
/// children in insertion order. An unknown `root` yields nothing.
pub fn walk(graph: &SceneGraph, root: NodeId) -> ResourceWalk<'_> {
    let stack = match graph.node(root) {
        Some(_) => vec![root],
        None => Vec::new(),
    };
    ResourceWalk {
        graph,
        stack,
        pending: VecDeque::new(),
        seen: HashSet::new(),
    }
}

impl Iterator for ResourceWalk<'_> {
    type Item = ResourceRef;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while let Some(resource) = self.pending.pop_front() {
                if self.seen.insert(resource) {
                    return Some(resource);
                }
            }

            let id = self.stack.pop()?;
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            // Reversed so the first child is popped first.
            self.stack.extend(node.children().iter().rev().copied());
            collect_node_resources(self.graph, node, &mut self.pending);
        }
    }
}

/// Appends the resources a single node references directly.
pub(crate) fn collect_node_resources(
    graph: &SceneGraph,
    node: &SceneNode,
    out: &mut impl Extend<ResourceRef>,
) {
    match &node.kind {
        NodeKind::Mesh(mesh) => {
            for primitive in &mesh.primitives {
                out.extend([ResourceRef::Geometry(primitive.geometry)]);
                let Some(material_id) = primitive.material else {
                    continue;
                };
                out.extend([ResourceRef::Material(material_id)]);
                if let Some(material) = graph.material(material_id) {
                    out.extend(material.textures.values().copied().map(ResourceRef::Texture));
                }
            }
        }
        NodeKind::Group | NodeKind::Light(_) | NodeKind::Camera(_) => {}
    }
}

/// Returns `root` and all its descendants, depth-first.
pub(crate) fn subtree(graph: &SceneGraph, root: NodeId) -> Vec<NodeId> {
    let mut visited = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        visited.push(id);
        stack.extend(node.children().iter().rev().copied());
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::gpu::TrackingAllocator;
    use vitrine_core::scene::{
        Geometry, Material, MaterialKind, MeshNode, Primitive, PrimitiveTopology, Texture,
        TextureSlot,
    };

    fn geometry(allocator: &TrackingAllocator) -> Geometry {
        Geometry::new(allocator, None, 3, 3, 12, PrimitiveTopology::TriangleList)
    }

    #[test]
    fn test_walk_orders_geometry_material_textures() {
        // --- 1. ARRANGE ---
        let allocator = TrackingAllocator::new();
        let mut graph = SceneGraph::new(None);
        let normal = graph.add_texture(Texture::new(&allocator, None, 16));
        let albedo = graph.add_texture(Texture::new(&allocator, None, 16));
        let material = graph
            .add_material(
                Material::new(&allocator, None, MaterialKind::Standard, [1.0; 4], 0.0, 1.0)
                    .with_texture(TextureSlot::Normal, normal)
                    .with_texture(TextureSlot::BaseColor, albedo),
            )
            .unwrap();
        let geo = graph.add_geometry(geometry(&allocator));
        let mesh = MeshNode::new(vec![Primitive {
            geometry: geo,
            material: Some(material),
        }]);
        graph
            .add_node(graph.root(), SceneNode::new(None, NodeKind::Mesh(mesh)))
            .unwrap();

        // --- 2. ACT ---
        let resources: Vec<_> = walk(&graph, graph.root()).collect();

        // --- 3. ASSERT ---
        assert_eq!(
            resources,
            vec![
                ResourceRef::Geometry(geo),
                ResourceRef::Material(material),
                ResourceRef::Texture(albedo),
                ResourceRef::Texture(normal),
            ]
        );
    }

    #[test]
    fn test_shared_resources_are_yielded_once() {
        let allocator = TrackingAllocator::new();
        let mut graph = SceneGraph::new(None);
        let geo = graph.add_geometry(geometry(&allocator));
        let material = graph
            .add_material(Material::new(
                &allocator,
                None,
                MaterialKind::Basic,
                [1.0; 4],
                0.0,
                1.0,
            ))
            .unwrap();
        for _ in 0..3 {
            let mesh = MeshNode::new(vec![Primitive {
                geometry: geo,
                material: Some(material),
            }]);
            graph
                .add_node(graph.root(), SceneNode::new(None, NodeKind::Mesh(mesh)))
                .unwrap();
        }

        assert_eq!(walk(&graph, graph.root()).count(), 2);
    }

    #[test]
    fn test_walk_is_restartable_and_scoped_to_subtree() {
        let allocator = TrackingAllocator::new();
        let mut graph = SceneGraph::new(None);
        let left_geo = graph.add_geometry(geometry(&allocator));
        let right_geo = graph.add_geometry(geometry(&allocator));
        let left = graph
            .add_node(graph.root(), SceneNode::new(Some("left".into()), NodeKind::Group))
            .unwrap();
        for (parent, geo) in [(left, left_geo), (graph.root(), right_geo)] {
            let mesh = MeshNode::new(vec![Primitive {
                geometry: geo,
                material: None,
            }]);
            graph
                .add_node(parent, SceneNode::new(None, NodeKind::Mesh(mesh)))
                .unwrap();
        }

        let walker = walk(&graph, left);
        let first: Vec<_> = walker.clone().collect();
        let second: Vec<_> = walker.collect();

        assert_eq!(first, vec![ResourceRef::Geometry(left_geo)]);
        assert_eq!(first, second);
        assert_eq!(walk(&graph, graph.root()).count(), 2);
    }

    #[test]
    fn test_walk_ignores_non_mesh_nodes_and_unknown_roots() {
        let graph = SceneGraph::new(None);
        assert_eq!(walk(&graph, graph.root()).count(), 0);

        let mut other = SceneGraph::new(None);
        let deep = other
            .add_node(other.root(), SceneNode::new(None, NodeKind::Group))
            .unwrap();
        assert_eq!(walk(&graph, deep).count(), 0);
        assert_eq!(subtree(&other, other.root()), vec![other.root(), deep]);
    }
}
