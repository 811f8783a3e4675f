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


//! Post-load render flags.

use super::walker::subtree;
use vitrine_core::scene::{NodeId, SceneGraph};

/// Marks every mesh under `root` as casting and receiving shadows and as
/// eligible for frustum culling. Returns the number of meshes updated.
///
/// Nodes outside the subtree are not touched.
pub fn optimize(graph: &mut SceneGraph, root: NodeId) -> usize {
    let mut meshes = 0;
    for id in subtree(graph, root) {
        if let Some(mesh) = graph.node_mut(id).and_then(|node| node.as_mesh_mut()) {
            mesh.cast_shadow = true;
            mesh.receive_shadow = true;
            mesh.frustum_culled = true;
            meshes += 1;
        }
    }
    log::trace!("Optimized {} mesh node(s) under {:?}", meshes, root);
    meshes
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::gpu::TrackingAllocator;
    use vitrine_core::scene::{Geometry, MeshNode, NodeKind, Primitive, PrimitiveTopology, SceneNode};

    #[test]
    fn test_optimize_flags_only_the_subtree() {
        // --- 1. ARRANGE ---
        let allocator = TrackingAllocator::new();
        let mut graph = SceneGraph::new(None);
        let geometry = graph.add_geometry(Geometry::new(
            &allocator,
            None,
            4,
            6,
            32,
            PrimitiveTopology::TriangleList,
        ));
        let primitive = Primitive {
            geometry,
            material: None,
        };
        let branch = graph
            .add_node(graph.root(), SceneNode::new(None, NodeKind::Group))
            .unwrap();
        let inside = graph
            .add_node(
                branch,
                SceneNode::new(None, NodeKind::Mesh(MeshNode::new(vec![primitive]))),
            )
            .unwrap();
        let outside = graph
            .add_node(
                graph.root(),
                SceneNode::new(None, NodeKind::Mesh(MeshNode::new(vec![primitive]))),
            )
            .unwrap();

        // --- 2. ACT ---
        let updated = optimize(&mut graph, branch);

        // --- 3. ASSERT ---
        assert_eq!(updated, 1);
        let inside = graph.node(inside).unwrap().as_mesh().unwrap();
        assert!(inside.cast_shadow && inside.receive_shadow && inside.frustum_culled);
        let outside = graph.node(outside).unwrap().as_mesh().unwrap();
        assert!(!outside.cast_shadow && !outside.receive_shadow && !outside.frustum_culled);
    }
}
