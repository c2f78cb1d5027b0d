// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-tick error kinds. All are locally recovered — nothing here ever
//! aborts a tick; call sites match on these and continue.

use thiserror::Error;

/// Errors a table or query operation can report.
///
/// Every variant is `Copy` and carries the minimal context needed to log a
/// useful line, since these are consumed in the hot path and must not
/// allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    /// Dereferencing a handle whose generation no longer matches the
    /// table's current generation for that raw id.
    #[error("stale handle")]
    StaleHandle,
    /// `allocate()` was called on a table already at its fixed capacity.
    #[error("table capacity exceeded")]
    CapacityExceeded,
    /// No zone path exists between a start zone and a destination.
    #[error("no pathfinding route to destination")]
    PathfindingUnreachable,
}
