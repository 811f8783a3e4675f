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


//! # Vitrine Data
//!
//! Owns the canonical copies of decoded assets. The [`cache::AssetCache`] keeps
//! one optimized scene graph per asset key, hands out independent working
//! copies, counts them, and evicts unreferenced entries when it grows past its
//! configured capacity.

#![warn(missing_docs)]

pub mod cache;

pub use cache::{
    AssetCache, CacheError, CacheStats, CanonicalSnapshot, DeferredDisposal, Insertion,
    PreparedGraph, Reservation, WorkingCopy, WorkingCopyId,
};
