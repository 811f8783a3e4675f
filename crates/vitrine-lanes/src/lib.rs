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

//! # Vitrine Lanes
//!
//! Stateless, hot-path work units of the asset pipeline:
//!
//! - [`resource_lane`]: walks a scene graph to enumerate, optimize and dispose
//!   the GPU-backed resources reachable from a node.
//! - [`decode_lane`]: the built-in [`SceneDecoder`](vitrine_core::SceneDecoder)
//!   implementations (glTF, procedural samples) and a scheme router.

#![warn(missing_docs)]

pub mod decode_lane;
pub mod resource_lane;

pub use decode_lane::{
    DecoderRouter, FileSystemResolver, GltfDecoderLane, ResolveError, SampleSceneDecoder,
    SourceResolver,
};
pub use resource_lane::{dispose_all, dispose_graph, optimize, walk, DisposalReport, ResourceWalk};
