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


//! Built-in scene decoders.

mod gltf_decoder_lane;
mod router;
mod sample_decoder_lane;
mod source_resolver;

pub use gltf_decoder_lane::*;
pub use router::*;
pub use sample_decoder_lane::*;
pub use source_resolver::*;
