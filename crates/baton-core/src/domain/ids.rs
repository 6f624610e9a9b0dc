//! Worker identifiers.
//!
//! The registry keys workers by an opaque id issued at `start` time instead of
//! by reference identity. Ids are ULIDs, so they sort by issue time and can be
//! generated without coordination.
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 先に `start` したワーカーほど小さい id になる
//! - **128-bit**: `WorkerId` は `Ulid` と同じサイズ (`repr(transparent)`)

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a worker submitted to a dispatcher.
///
/// Displayed as `worker-<ulid>`, which is also the suffix of the worker's
/// thread name.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(Ulid);

impl WorkerId {
    pub const PREFIX: &'static str = "worker-";

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for WorkerId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}
