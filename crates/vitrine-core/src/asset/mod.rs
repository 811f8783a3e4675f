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

//! Identifiers for logical assets.
//!
//! An asset is addressed by the location it is decoded from. Two requests that
//! spell the same location differently (`models/./a.glb`, `models\a.glb`) must
//! land on the same cache entry, so every location is normalized into an
//! [`AssetKey`] before it reaches the cache or the load coordinator.

mod key;

pub use key::*;
