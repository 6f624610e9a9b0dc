//! IdGenerator port - worker id generation.
//!
//! ULID = 48-bit timestamp (ms) + 80-bit random。
//! timestamp は `Clock` から取るので、テストでは `FixedClock` で固定できる。

use ulid::Ulid;

use crate::domain::WorkerId;
use crate::ports::Clock;

/// IdGenerator issues worker ids.
///
/// `Send + Sync` because `start` may be called from any thread.
pub trait IdGenerator: Send + Sync {
    fn generate_worker_id(&self) -> WorkerId;
}

/// ULID-based generator.
///
/// The timestamp part comes from the clock, so a [`crate::ports::FixedClock`]
/// gives ids with a deterministic time component.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_worker_id(&self) -> WorkerId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        WorkerId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
