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
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use vitrine_core::decoder::{DecodeError, ProgressSink};
use vitrine_core::gpu::TrackingAllocator;
use vitrine_core::scene::{
    Geometry, Material, MaterialKind, MeshNode, NodeKind, Primitive, PrimitiveTopology,
    SceneGraph, SceneNode,
};
use vitrine_telemetry::MetricId;

#[derive(Debug, Clone, Copy)]
enum Script {
    Succeed,
    Fail,
    Panic,
    Sleep(Duration),
}

#[derive(Debug)]
struct ScriptedDecoder {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedDecoder {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn triangle(allocator: &dyn GpuAllocator) -> SceneGraph {
    let mut graph = SceneGraph::new(Some("triangle".into()));
    let geometry = graph.add_geometry(Geometry::new(
        allocator,
        None,
        3,
        3,
        12,
        PrimitiveTopology::TriangleList,
    ));
    let material = graph
        .add_material(Material::new(
            allocator,
            None,
            MaterialKind::Basic,
            [1.0; 4],
            0.0,
            1.0,
        ))
        .unwrap();
    let mesh = MeshNode::new(vec![Primitive {
        geometry,
        material: Some(material),
    }]);
    let root = graph.root();
    graph
        .add_node(root, SceneNode::new(None, NodeKind::Mesh(mesh)))
        .unwrap();
    graph
}

#[async_trait]
impl SceneDecoder for ScriptedDecoder {
    async fn decode(
        &self,
        source: &AssetKey,
        allocator: &dyn GpuAllocator,
        _progress: &ProgressSink,
    ) -> Result<SceneGraph, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Succeed => Ok(triangle(allocator)),
            Script::Fail => Err(DecodeError::unreachable(source, "host is offline")),
            Script::Panic => panic!("decoder crashed on '{source}'"),
            Script::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(triangle(allocator))
            }
        }
    }
}

struct Harness {
    manager: AssetManager,
    allocator: Arc<TrackingAllocator>,
    registry: Arc<MetricsRegistry>,
}

fn harness(decoder: Arc<ScriptedDecoder>, settings: AssetManagerSettings) -> Harness {
    let allocator = Arc::new(TrackingAllocator::new());
    let registry = Arc::new(MetricsRegistry::new());
    let manager =
        AssetManager::new(settings, decoder, allocator.clone(), registry.clone()).unwrap();
    Harness {
        manager,
        allocator,
        registry,
    }
}

fn counter(registry: &MetricsRegistry, name: &str) -> u64 {
    registry
        .get_metric(&MetricId::new("assets", name))
        .unwrap()
        .value
        .as_counter()
        .unwrap()
}

fn gauge(registry: &MetricsRegistry, name: &str) -> f64 {
    registry
        .get_metric(&MetricId::new("assets", name))
        .unwrap()
        .value
        .as_gauge()
        .unwrap()
}

#[test]
fn test_new_requires_a_runtime() {
    let result = AssetManager::new(
        AssetManagerSettings::default(),
        ScriptedDecoder::new(Script::Succeed),
        Arc::new(TrackingAllocator::new()),
        Arc::new(MetricsRegistry::new()),
    );

    let error = result.unwrap_err();
    assert!(error.to_string().contains("tokio runtime"));
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
    let settings = AssetManagerSettings {
        max_concurrent_decodes: 0,
        ..AssetManagerSettings::default()
    };
    let result = AssetManager::new(
        settings,
        ScriptedDecoder::new(Script::Succeed),
        Arc::new(TrackingAllocator::new()),
        Arc::new(MetricsRegistry::new()),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_metrics_follow_hits_misses_and_copies() {
    // --- 1. ARRANGE ---
    let decoder = ScriptedDecoder::new(Script::Succeed);
    let h = harness(decoder.clone(), AssetManagerSettings::default());

    // --- 2. ACT ---
    let first = h.manager.acquire("a.glb", AcquireOptions::default()).await.unwrap();
    let second = h.manager.acquire("a.glb", AcquireOptions::default()).await.unwrap();

    // --- 3. ASSERT ---
    assert_eq!(decoder.calls(), 1);
    assert_eq!(counter(&h.registry, "cache_misses"), 1);
    assert_eq!(counter(&h.registry, "cache_hits"), 1);
    assert_eq!(counter(&h.registry, "decodes_started"), 1);
    assert_eq!(gauge(&h.registry, "cached_entries"), 1.0);
    assert_eq!(gauge(&h.registry, "checked_out_copies"), 2.0);
    let decode_time = h
        .registry
        .get_metric(&MetricId::new("assets", "decode_time"))
        .unwrap();
    assert!(decode_time.value.mean().is_some());

    h.manager.release(first).unwrap();
    h.manager.release(second).unwrap();
    assert_eq!(gauge(&h.registry, "checked_out_copies"), 0.0);
    // Only the canonical graph is left.
    assert_eq!(h.allocator.live_count(), 2);
}

#[tokio::test]
async fn test_decode_failure_is_reported_and_not_cached() {
    let decoder = ScriptedDecoder::new(Script::Fail);
    let h = harness(decoder.clone(), AssetManagerSettings::default());
    let events = h.manager.subscribe();
    let key = AssetKey::new("https://cdn.example/a.glb");

    let error = h
        .manager
        .acquire(key.clone(), AcquireOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, LoadError::Decode { .. }));
    assert_eq!(error.key(), &key);
    assert!(!h.manager.is_cached(&key));
    assert!(!h.manager.is_loading(&key));
    assert_eq!(counter(&h.registry, "decodes_failed"), 1);
    assert_eq!(
        events.try_recv().unwrap(),
        AssetEvent::Failed {
            key: key.clone(),
            error
        }
    );
    assert_eq!(h.allocator.live_count(), 0);

    let _ = h.manager.acquire(key, AcquireOptions::default()).await;
    assert_eq!(decoder.calls(), 2);
}

#[tokio::test]
async fn test_crashed_decode_abandons_its_waiters() {
    let decoder = ScriptedDecoder::new(Script::Panic);
    let h = harness(decoder.clone(), AssetManagerSettings::default());
    let key = AssetKey::new("crash.glb");

    let first = h.manager.request(key.clone(), AcquireOptions::default());
    let second = h.manager.request(key.clone(), AcquireOptions::default());

    assert_eq!(first.wait().await.unwrap_err(), LoadError::Abandoned(key.clone()));
    assert_eq!(second.wait().await.unwrap_err(), LoadError::Abandoned(key.clone()));
    assert!(!h.manager.is_loading(&key));
    assert_eq!(decoder.calls(), 1);
}

#[tokio::test]
async fn test_default_timeout_gives_up_without_cancelling() {
    // --- 1. ARRANGE ---
    let decoder = ScriptedDecoder::new(Script::Sleep(Duration::from_millis(100)));
    let settings = AssetManagerSettings {
        default_timeout_ms: Some(10),
        ..AssetManagerSettings::default()
    };
    let h = harness(decoder.clone(), settings);
    let events = h.manager.subscribe();
    let key = AssetKey::new("slow.glb");

    // --- 2. ACT ---
    let error = h
        .manager
        .acquire(key.clone(), AcquireOptions::default())
        .await
        .unwrap_err();

    // --- 3. ASSERT ---
    assert_eq!(error, LoadError::TimedOut(key.clone()));
    assert!(events
        .drain()
        .any(|event| event == AssetEvent::Failed { key: key.clone(), error: error.clone() }));
    assert!(h.manager.is_loading(&key));

    // The decode still lands in the cache with nobody holding it.
    let copy = h
        .manager
        .acquire(key.clone(), AcquireOptions::default().with_timeout(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(decoder.calls(), 1);
    assert_eq!(h.manager.ref_count(&key), Some(1));
    drop(copy);
    assert_eq!(h.manager.ref_count(&key), Some(0));
}

#[tokio::test]
async fn test_evict_and_shutdown_respect_references() {
    let h = harness(
        ScriptedDecoder::new(Script::Succeed),
        AssetManagerSettings::default(),
    );
    let events = h.manager.subscribe();
    let held = AssetKey::new("held.glb");
    let idle = AssetKey::new("idle.glb");

    let copy = h.manager.acquire(held.clone(), AcquireOptions::default()).await.unwrap();
    let other = h.manager.acquire(idle.clone(), AcquireOptions::default()).await.unwrap();
    h.manager.release(other).unwrap();
    events.drain().for_each(drop);

    assert_eq!(h.manager.evict(&held), Ok(false));
    assert_eq!(h.manager.evict(&idle), Ok(true));
    assert_eq!(events.try_recv().unwrap(), AssetEvent::Evicted { key: idle.clone() });
    assert_eq!(h.manager.evict(&idle), Err(LoadError::NotFound(idle)));

    assert!(h.manager.shutdown().is_empty());
    h.manager.release(copy).unwrap();
    assert_eq!(h.manager.shutdown(), vec![held]);
    assert_eq!(h.allocator.live_count(), 0);
    assert_eq!(h.manager.stats().cache.entries, 0);
}

#[test]
fn test_acquire_options_builders() {
    let options = AcquireOptions::default()
        .with_priority(3)
        .with_timeout(Duration::from_millis(250));
    assert_eq!(options.priority, 3);
    assert_eq!(options.timeout, Some(Duration::from_millis(250)));
    assert_eq!(AcquireOptions::default().timeout, None);
}
