//! Per-key FIFO serialization of protocols
//!
//! Holding a lane's guard means no other protocol on the same key is past its
//! own `acquire`. Waiters are released in arrival order (tokio's mutex is
//! fair).

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SingleFlight {
    lanes: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lane of `key` and hold it until the guard is dropped
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not locked across the await
        let lane = self
            .lanes
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lane.lock_owned().await
    }

    /// Number of keys that have ever been acquired
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}
