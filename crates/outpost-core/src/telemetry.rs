// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Telemetry helpers for JSONL logging when the `telemetry` feature is
// enabled. Manually formats JSON to avoid a `serde_json`/`tracing`
// dependency that could perturb the deterministic hot path just by being
// linked in — every function here is compiled out entirely without the
// feature, not merely a no-op.

use crate::pathfinding::PathfindingTelemetry;

fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

/// Emits a capacity-exceeded event: `table_id` (see [`crate::ids`]) had no
/// free slot on `frame`, and `total_skips` is the running count for the
/// whole match. This is how `spec.md`'s "spawning system logs once and
/// skips the spawn this tick" is realized without the spawn systems
/// themselves depending on a logging crate.
pub fn capacity_exceeded(frame: i32, table_id: u16, total_skips: u64) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"capacity_exceeded","frame":{},"table_id":{},"total_skips":{}}}"#,
        ts_micros(),
        frame,
        table_id,
        total_skips,
    );
    let _ = out.write_all(b"\n");
}

fn cache_stats_fields(label: &str, stats: crate::pathfinding::CacheStats) -> String {
    format!(
        r#""{label}":{{"hits":{},"misses":{},"evictions":{}}}"#,
        stats.hits, stats.misses, stats.evictions,
    )
}

/// Emits a flow-field cache summary event: hit/miss/eviction counts for each
/// of the three pathfinding caches, as of `frame`. Reads only the
/// already-computed [`PathfindingTelemetry`] snapshot; never touches the
/// zone graph or flow fields themselves.
pub fn pathfinding_cache_stats(frame: i32, stats: PathfindingTelemetry) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"pathfinding_cache_stats","frame":{},{},{},{}}}"#,
        ts_micros(),
        frame,
        cache_stats_fields("multi_target", stats.multi_target),
        cache_stats_fields("single_dest", stats.single_dest),
        cache_stats_fields("target_set", stats.target_set),
    );
    let _ = out.write_all(b"\n");
}
