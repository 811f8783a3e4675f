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


//! Scene graph traversal lanes.
//!
//! These functions are the only code that knows how to get from a node to the
//! GPU resources hanging off it. The cache uses them to tune a freshly decoded
//! graph and to tear graphs down when they are released or evicted.

mod disposal;
mod optimize;
mod walker;

pub use disposal::*;
pub use optimize::*;
pub use walker::{walk, ResourceWalk};
