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


use super::*;
use vitrine_core::gpu::TrackingAllocator;
use vitrine_core::scene::{
    Geometry, Material, MaterialKind, MeshNode, NodeKind, Primitive,
    PrimitiveTopology, SceneNode, Texture, TextureSlot,
};

/// One textured mesh: a geometry, a material and a texture.
fn model(allocator: &TrackingAllocator) -> SceneGraph {
    let mut graph = SceneGraph::new(Some("model".into()));
    let texture = graph.add_texture(Texture::new(allocator, None, 1024));
    let material = graph
        .add_material(
            Material::new(allocator, None, MaterialKind::Standard, [1.0; 4], 0.5, 0.5)
                .with_texture(TextureSlot::BaseColor, texture),
        )
        .unwrap();
    let geometry = graph.add_geometry(Geometry::new(
        allocator,
        None,
        8,
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

fn cache_with_capacity(max_entries: usize) -> (AssetCache, Arc<TrackingAllocator>) {
    let allocator = Arc::new(TrackingAllocator::new());
    let cache = AssetCache::new(
        AssetCacheConfig::with_max_entries(max_entries),
        allocator.clone(),
    );
    (cache, allocator)
}

#[test]
fn test_insert_optimizes_and_rejects_duplicates() {
    // --- 1. ARRANGE ---
    let (cache, allocator) = cache_with_capacity(4);
    let key = AssetKey::new("a.model");

    // --- 2. ACT ---
    cache.insert(key.clone(), model(&allocator)).unwrap();
    let duplicate = cache.insert(key.clone(), model(&allocator));

    // --- 3. ASSERT ---
    assert_eq!(duplicate, Err(CacheError::AlreadyPresent(key.clone())));
    // The rejected graph was disposed; only the canonical one is alive.
    assert_eq!(allocator.live_count(), 3);

    let copy = cache.checkout(&key).unwrap();
    let body = copy.find_node("body").unwrap();
    let mesh = copy.node(body).unwrap().as_mesh().unwrap();
    assert!(mesh.cast_shadow && mesh.receive_shadow && mesh.frustum_culled);
    cache.release(copy).unwrap();
}

#[test]
fn test_checkout_counts_and_isolates_copies() {
    let (cache, allocator) = cache_with_capacity(4);
    let key = AssetKey::new("a.model");
    cache.insert(key.clone(), model(&allocator)).unwrap();

    let mut first = cache.checkout(&key).unwrap();
    let second = cache.checkout(&key).unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(cache.ref_count(&key), Some(2));
    assert_eq!(allocator.live_count(), 9);

    let body = first.find_node("body").unwrap();
    let material = first.node(body).unwrap().as_mesh().unwrap().primitives[0]
        .material
        .unwrap();
    first.material_mut(material).unwrap().base_color = [1.0, 0.0, 0.0, 1.0];
    assert_eq!(second.materials()[0].base_color, [1.0; 4]);

    cache.release(first).unwrap();
    assert_eq!(cache.ref_count(&key), Some(1));
    assert_eq!(allocator.live_count(), 6);
    assert_eq!(second.live_resource_count(), 3);

    cache.release(second).unwrap();
    assert_eq!(cache.ref_count(&key), Some(0));
    assert_eq!(allocator.live_count(), 3);
    assert_eq!(allocator.stats().invalid_releases, 0);
}

#[test]
fn test_checkout_of_unknown_key_is_not_found() {
    let (cache, _) = cache_with_capacity(4);
    let key = AssetKey::new("missing.model");
    assert_eq!(
        cache.checkout(&key).map(|copy| copy.id()),
        Err(CacheError::NotFound(key))
    );
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_evict_refuses_referenced_entries() {
    let (cache, allocator) = cache_with_capacity(4);
    let key = AssetKey::new("a.model");
    cache.insert(key.clone(), model(&allocator)).unwrap();
    let copy = cache.checkout(&key).unwrap();

    assert_eq!(cache.evict(&key), Ok(false));
    assert!(cache.contains(&key));

    cache.release(copy).unwrap();
    assert_eq!(cache.evict(&key), Ok(true));
    assert!(!cache.contains(&key));
    assert_eq!(allocator.live_count(), 0);
    assert_eq!(cache.evict(&key), Err(CacheError::NotFound(key)));
}

#[test]
fn test_capacity_two_evicts_least_recently_used() {
    // --- 1. ARRANGE ---
    let (cache, allocator) = cache_with_capacity(2);
    let [a, b, c] = ["a", "b", "c"].map(AssetKey::new);

    // --- 2. ACT ---
    let mut evicted = Vec::new();
    for key in [&a, &b, &c] {
        evicted.extend(cache.insert(key.clone(), model(&allocator)).unwrap());
        let copy = cache.checkout(key).unwrap();
        cache.release(copy).unwrap();
    }

    // --- 3. ASSERT ---
    assert_eq!(evicted, vec![a.clone()]);
    assert!(!cache.contains(&a));
    assert_eq!(cache.keys_by_recency(), vec![b, c]);
    assert_eq!(allocator.live_count(), 6);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_referenced_entries_survive_pressure() {
    let (cache, allocator) = cache_with_capacity(1);
    let a = AssetKey::new("a");
    let b = AssetKey::new("b");

    cache.insert(a.clone(), model(&allocator)).unwrap();
    let held = cache.checkout(&a).unwrap();
    let evicted = cache.insert(b.clone(), model(&allocator)).unwrap();

    assert!(evicted.is_empty());
    assert_eq!(cache.len(), 2);

    cache.release(held).unwrap();
    assert_eq!(cache.clear().len(), 2);
    assert!(cache.is_empty());
    assert_eq!(allocator.live_count(), 0);
}

#[test]
fn test_lookup_refreshes_recency() {
    let (cache, allocator) = cache_with_capacity(2);
    let [a, b, c] = ["a", "b", "c"].map(AssetKey::new);
    cache.insert(a.clone(), model(&allocator)).unwrap();
    cache.insert(b.clone(), model(&allocator)).unwrap();

    let snapshot = cache.lookup(&a).unwrap();
    assert_eq!(snapshot.ref_count, 0);
    assert_eq!(snapshot.resource_count, 3);

    let evicted = cache.insert(c, model(&allocator)).unwrap();
    assert_eq!(evicted, vec![b]);
}

#[test]
fn test_reservations_pin_until_used_or_dropped() {
    let (cache, allocator) = cache_with_capacity(4);
    let key = AssetKey::new("a.model");

    let (reservations, _) = cache
        .insert_reserving(key.clone(), model(&allocator), 2)
        .unwrap();
    assert_eq!(cache.ref_count(&key), Some(2));
    assert_eq!(cache.evict(&key), Ok(false));

    let mut reservations = reservations.into_iter();
    let copy = reservations.next().unwrap().into_working_copy();
    drop(reservations);
    assert_eq!(cache.ref_count(&key), Some(1));

    drop(copy);
    assert_eq!(cache.ref_count(&key), Some(0));
    assert_eq!(allocator.live_count(), 3);
}

#[test]
fn test_release_after_cache_is_gone_still_disposes() {
    let (cache, allocator) = cache_with_capacity(4);
    let key = AssetKey::new("a.model");
    cache.insert(key.clone(), model(&allocator)).unwrap();
    let copy = cache.checkout(&key).unwrap();
    let other = cache.clone();
    drop(cache);
    drop(other);

    // The canonical graph went with the cache; the copy is disposed on release.
    let result = copy.release();
    assert_eq!(result, Err(CacheError::NotFound(key)));
    assert_eq!(allocator.live_count(), 0);
    assert_eq!(allocator.stats().invalid_releases, 0);
}

#[test]
fn test_release_into_another_cache_is_refused() {
    // --- 1. ARRANGE ---
    let (origin, allocator) = cache_with_capacity(4);
    let (stranger, _) = cache_with_capacity(4);
    let key = AssetKey::new("a.model");
    origin.insert(key.clone(), model(&allocator)).unwrap();
    stranger.insert(key.clone(), model(&allocator)).unwrap();
    let copy = origin.checkout(&key).unwrap();

    // --- 2. ACT ---
    let result = stranger.release(copy);

    // --- 3. ASSERT ---
    assert_eq!(result, Err(CacheError::NotFound(key.clone())));
    // The copy went back to the cache it came from.
    assert_eq!(origin.ref_count(&key), Some(0));
    assert_eq!(stranger.ref_count(&key), Some(0));
    assert_eq!(allocator.live_count(), 6);
    assert_eq!(allocator.stats().invalid_releases, 0);
}

#[test]
fn test_insert_prepared_defers_disposal() {
    let (cache, allocator) = cache_with_capacity(1);
    cache.insert(AssetKey::new("old"), model(&allocator)).unwrap();

    let prepared = cache.prepare(AssetKey::new("new"), model(&allocator));
    assert_eq!(prepared.key(), &AssetKey::new("new"));
    let insertion = cache.insert_prepared(prepared, 1);

    // "old" left the cache but still holds its resources.
    assert_eq!(cache.keys_by_recency(), vec![AssetKey::new("new")]);
    assert_eq!(insertion.disposal.evicted_keys(), vec![AssetKey::new("old")]);
    assert_eq!(allocator.live_count(), 6);

    assert_eq!(insertion.disposal.dispose(), vec![AssetKey::new("old")]);
    assert_eq!(allocator.live_count(), 3);
    let reservations = insertion.result.unwrap();
    assert_eq!(cache.ref_count(&AssetKey::new("new")), Some(1));
    drop(reservations);
    assert_eq!(cache.ref_count(&AssetKey::new("new")), Some(0));

    let again = cache.prepare(AssetKey::new("new"), model(&allocator));
    let duplicate = cache.insert_prepared(again, 0);
    assert_eq!(
        duplicate.result.map(|reservations| reservations.len()),
        Err(CacheError::AlreadyPresent(AssetKey::new("new")))
    );
    assert!(!duplicate.disposal.is_empty());
    assert_eq!(allocator.live_count(), 6);
    assert!(duplicate.disposal.dispose().is_empty());
    assert_eq!(allocator.live_count(), 3);
}
