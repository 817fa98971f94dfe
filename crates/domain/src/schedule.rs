//! Poll scheduling policy.

use std::time::Duration;

/// Effective poll interval for a unit.
///
/// Handlers declare a `minimum` to protect rate-limited upstream APIs; the
/// unit's `requested` override may only slow polling down, never speed it
/// past the floor.
#[must_use]
pub fn effective_interval(minimum: u64, requested: u64) -> Duration {
    Duration::from_secs(minimum.max(requested))
}
