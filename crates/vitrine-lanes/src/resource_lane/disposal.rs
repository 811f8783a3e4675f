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


//! Deterministic release of GPU resources.

use super::walker::{collect_node_resources, subtree, walk};
use std::collections::HashSet;
use vitrine_core::gpu::{GpuAllocator, GpuHandle, ResourceKind};
use vitrine_core::scene::{NodeId, ResourceRef, SceneGraph};

/// What a disposal pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposalReport {
    /// Geometries whose allocation was released.
    pub geometries: usize,
    /// Materials whose allocation was released.
    pub materials: usize,
    /// Textures whose allocation was released.
    pub textures: usize,
    /// Reachable resources that had already been released earlier.
    pub already_released: usize,
    /// Reachable resources left alone because nodes outside the subtree use them.
    pub retained_shared: usize,
    /// Unreachable arena entries released by [`dispose_graph`].
    pub orphans: usize,
}

impl DisposalReport {
    /// Total allocations released by this pass.
    pub fn released(&self) -> usize {
        self.geometries + self.materials + self.textures
    }

    fn record(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Geometry => self.geometries += 1,
            ResourceKind::Material => self.materials += 1,
            ResourceKind::Texture => self.textures += 1,
        }
    }
}

/// Releases every resource reachable from `root`.
///
/// Safe to call repeatedly: resources already released are counted, not
/// released twice. Resources that nodes outside the subtree still reference
/// are kept.
pub fn dispose_all(
    graph: &mut SceneGraph,
    root: NodeId,
    allocator: &dyn GpuAllocator,
) -> DisposalReport {
    let inside: HashSet<NodeId> = subtree(graph, root).into_iter().collect();
    let mut shared = HashSet::new();
    for (id, node) in graph.nodes() {
        if !inside.contains(&id) {
            collect_node_resources(graph, node, &mut shared);
        }
    }

    let targets: Vec<ResourceRef> = walk(graph, root).collect();
    let mut report = DisposalReport::default();
    for resource in targets {
        if shared.contains(&resource) {
            report.retained_shared += 1;
            continue;
        }
        match graph.release_resource(resource, allocator) {
            Some(true) => report.record(resource.kind()),
            Some(false) => report.already_released += 1,
            None => log::error!("Scene graph references missing resource {:?}", resource),
        }
    }
    report
}

/// Releases everything a graph owns: the resources reachable from its root and
/// any arena entry no node references.
pub fn dispose_graph(graph: &mut SceneGraph, allocator: &dyn GpuAllocator) -> DisposalReport {
    let root = graph.root();
    let mut report = dispose_all(graph, root, allocator);

    let orphans: Vec<ResourceRef> = graph
        .resource_refs()
        .filter(|resource| graph.resource_handle(*resource).is_some_and(GpuHandle::is_live))
        .collect();
    for resource in orphans {
        if graph.release_resource(resource, allocator) == Some(true) {
            report.record(resource.kind());
            report.orphans += 1;
        }
    }

    if report.orphans > 0 {
        log::debug!("Released {} unreferenced resource(s)", report.orphans);
    }
    report
}
