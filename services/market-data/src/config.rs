//! Dissemination configuration.

/// Tunables for the subscriber hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bounded queue capacity per subscriber. Overflow evicts the
    /// subscriber rather than blocking the publisher.
    pub queue_capacity: usize,
    /// Depth of the snapshot sent on subscribe.
    pub snapshot_depth: usize,
    /// Hard cap on snapshot depth.
    pub snapshot_depth_cap: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            snapshot_depth: 10,
            snapshot_depth_cap: 1000,
        }
    }
}

impl HubConfig {
    pub fn effective_snapshot_depth(&self) -> usize {
        self.snapshot_depth.max(1).min(self.snapshot_depth_cap)
    }
}
