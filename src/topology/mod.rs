//! Per-time cache of resolved plate boundaries and reconstructed layers.

mod cache;

pub use cache::{BoundaryClass, CacheState, LayerSources, TopologyCache, TopologySnapshot};
