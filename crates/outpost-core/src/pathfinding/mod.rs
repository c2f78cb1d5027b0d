// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hierarchical flow-field pathfinding: sectors partition the map, zones
//! are connected components of passable tiles within a sector, portals
//! connect zones across sector boundaries, and flow fields are cached,
//! per-sector Dijkstra gradients toward one or more goals.

mod flow_field;
pub(crate) mod lru;
mod sector;
mod service;
mod terrain;
mod zone_graph;

pub use flow_field::{build_flow_field, FlowCell, FlowField, Seed};
pub use sector::{Sector, ZoneId};
pub use service::{CacheStats, PathfindingConfig, PathfindingService, PathfindingTelemetry};
pub use terrain::Terrain;
pub use zone_graph::{Portal, ZoneGraph};
