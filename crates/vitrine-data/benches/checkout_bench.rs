use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use vitrine_core::asset::AssetKey;
use vitrine_core::config::AssetCacheConfig;
use vitrine_core::gpu::TrackingAllocator;
use vitrine_core::scene::{
    Geometry, Material, MaterialKind, MeshNode, NodeKind, Primitive, PrimitiveTopology,
    SceneGraph, SceneNode, Texture, TextureSlot,
};
use vitrine_data::AssetCache;
use vitrine_lanes::walk;

/// A city block: 500 meshes over 50 geometries and 10 textured materials.
fn city_block(allocator: &TrackingAllocator) -> SceneGraph {
    let mut graph = SceneGraph::new(Some("block".into()));
    let materials: Vec<_> = (0..10)
        .map(|_| {
            let texture = graph.add_texture(Texture::new(allocator, None, 512 * 512 * 4));
            graph
                .add_material(
                    Material::new(allocator, None, MaterialKind::Standard, [1.0; 4], 0.2, 0.8)
                        .with_texture(TextureSlot::BaseColor, texture),
                )
                .unwrap()
        })
        .collect();
    let geometries: Vec<_> = (0..50)
        .map(|_| {
            graph.add_geometry(Geometry::new(
                allocator,
                None,
                2_000,
                6_000,
                32,
                PrimitiveTopology::TriangleList,
            ))
        })
        .collect();

    let root = graph.root();
    for i in 0..500 {
        let mesh = MeshNode::new(vec![Primitive {
            geometry: geometries[i % geometries.len()],
            material: Some(materials[i % materials.len()]),
        }]);
        graph
            .add_node(root, SceneNode::new(None, NodeKind::Mesh(mesh)))
            .unwrap();
    }
    graph
}

fn bench_checkout(c: &mut Criterion) {
    let allocator = Arc::new(TrackingAllocator::new());
    let cache = AssetCache::new(AssetCacheConfig::default(), allocator.clone());
    let key = AssetKey::new("city/block.glb");
    cache.insert(key.clone(), city_block(&allocator)).unwrap();

    let mut group = c.benchmark_group("Asset Cache");

    group.bench_function("Checkout + Release (500 meshes)", |b| {
        b.iter(|| {
            let copy = cache.checkout(&key).unwrap();
            black_box(copy.node_count());
            cache.release(copy).unwrap();
        });
    });

    group.bench_function("Resource Walk (500 meshes)", |b| {
        let copy = cache.checkout(&key).unwrap();
        b.iter(|| black_box(walk(&copy, copy.root()).count()));
    });

    group.finish();
}

criterion_group!(benches, bench_checkout);
criterion_main!(benches);
