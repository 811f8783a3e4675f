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


//! Loads assets through the manager and prints what came back.
//!
//! ```text
//! cargo run -p vitrine-sandbox -- sample://sphere models/helmet.glb --assets ./assets
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use vitrine_agents::{AcquireOptions, AssetEvent, AssetManager};
use vitrine_core::config::AssetManagerSettings;
use vitrine_core::gpu::TrackingAllocator;
use vitrine_core::scene::{NodeId, NodeKind, SceneGraph};
use vitrine_lanes::{walk, DecoderRouter};
use vitrine_telemetry::{init_logging, MetricsRegistry};

#[derive(Parser, Debug)]
#[command(name = "vitrine-sandbox", version, about)]
struct CliArgs {
    /// Assets to load: glTF/GLB paths under `--assets`, or `sample://sphere`,
    /// `sample://cube`, `sample://plane`.
    #[arg(default_value = "sample://sphere")]
    keys: Vec<String>,

    /// Directory relative asset paths are resolved against.
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// RON file with `AssetManagerSettings`.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Working copies to request per asset. They share one decode.
    #[arg(long, default_value_t = 2)]
    copies: usize,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(&args.log);

    let settings = match &args.settings {
        Some(path) => AssetManagerSettings::from_ron_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => AssetManagerSettings::default(),
    };

    let allocator = Arc::new(TrackingAllocator::new());
    let registry = Arc::new(MetricsRegistry::new());
    let manager = AssetManager::new(
        settings,
        Arc::new(DecoderRouter::with_defaults(&args.assets)),
        allocator.clone(),
        registry.clone(),
    )?;
    let events = manager.subscribe();

    for key in &args.keys {
        let pending: Vec<_> = (0..args.copies.max(1))
            .map(|_| manager.request(key.as_str(), AcquireOptions::default()))
            .collect();

        let mut copies = Vec::with_capacity(pending.len());
        for asset in pending {
            match asset.wait().await {
                Ok(copy) => copies.push(copy),
                Err(e) => {
                    log::error!("{}", e);
                    break;
                }
            }
        }

        if let Some(first) = copies.first() {
            println!("== {} ({} copies)", key, copies.len());
            print_graph(first);
        }
        for copy in copies {
            manager.release(copy)?;
        }
    }

    for event in events.drain() {
        match event {
            AssetEvent::Progress { .. } => {}
            other => log::debug!("{:?}", other),
        }
    }

    let stats = manager.stats();
    println!(
        "cache: {}/{} entries, {} hits, {} misses, {} evictions",
        stats.cache.entries,
        stats.cache.capacity,
        stats.cache.hits,
        stats.cache.misses,
        stats.cache.evictions
    );
    for metric in registry.get_namespace_metrics("assets") {
        println!("  {} = {:?}", metric.id, metric.value);
    }

    manager.shutdown();
    let allocations = allocator.stats();
    println!(
        "gpu: {} live, {} allocated, {} released, {} invalid releases",
        allocations.live,
        allocations.total_allocated,
        allocations.total_released,
        allocations.invalid_releases
    );
    Ok(())
}

fn print_graph(graph: &SceneGraph) {
    let mut stack: Vec<(NodeId, usize)> = vec![(graph.root(), 0)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let kind = match &node.kind {
            NodeKind::Group => "group".to_string(),
            NodeKind::Mesh(mesh) => format!("mesh, {} primitive(s)", mesh.primitives.len()),
            NodeKind::Light(_) => "light".to_string(),
            NodeKind::Camera(_) => "camera".to_string(),
        };
        println!(
            "{}{} [{}]",
            "  ".repeat(depth + 1),
            node.name.as_deref().unwrap_or("<unnamed>"),
            kind
        );
        stack.extend(node.children().iter().rev().map(|child| (*child, depth + 1)));
    }
    println!(
        "  {} resource(s) reachable, {} bytes live",
        walk(graph, graph.root()).count(),
        graph.live_bytes()
    );
}
