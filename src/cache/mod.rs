//! Freshness-gated caching for session data.
//!
//! This module keeps the latest known value of each tracked resource and
//! decides when to go back to the network:
//! - Values are fresh for a fixed ttl (5 minutes by default)
//! - Passive refresh fetches only stale resources, forced refresh always fetches
//! - At most one fetch per resource runs at a time; later callers join it
//! - Failed fetches keep serving the last good value and record the error
//! - Local updates win over fetches that started before them

mod clock;
mod layer;
mod slot;
mod traits;

pub use clock::{Clock, SystemClock};
pub use layer::{DataCache, DEFAULT_TTL_SECS};
pub use slot::{Slot, Snapshot};
pub use traits::{DataSource, FetchState, PlanEnrollment, Refresh, Resource};
