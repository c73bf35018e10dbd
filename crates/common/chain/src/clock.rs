use std::time::{Duration, SystemTime, UNIX_EPOCH};

use vigil_consensus::misc::{compute_epoch_at_slot, compute_start_slot_at_epoch};
use vigil_network_spec::networks::NetworkSpec;

/// Genesis-anchored wall-clock to slot/epoch calendar.
///
/// All job timings in the duty scheduler are derived from this clock, so a
/// single instance is shared across services for a given network.
#[derive(Debug, Clone)]
pub struct ChainTime {
    genesis_time: u64,
    seconds_per_slot: u64,
}

impl ChainTime {
    pub fn new(spec: &NetworkSpec) -> Self {
        Self {
            genesis_time: spec.genesis_time,
            seconds_per_slot: spec.seconds_per_slot,
        }
    }

    /// Clock for an arbitrary genesis, mainly useful for tests and devnets.
    pub fn with_genesis(genesis_time: u64, seconds_per_slot: u64) -> Self {
        Self {
            genesis_time,
            seconds_per_slot,
        }
    }

    pub fn genesis(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.genesis_time)
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot)
    }

    /// The current slot, 0 if the genesis is still in the future.
    pub fn current_slot(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.genesis())
            .map(|elapsed| elapsed.as_secs() / self.seconds_per_slot)
            .unwrap_or(0)
    }

    pub fn current_epoch(&self) -> u64 {
        compute_epoch_at_slot(self.current_slot())
    }

    pub fn first_slot_of_epoch(&self, epoch: u64) -> u64 {
        compute_start_slot_at_epoch(epoch)
    }

    pub fn start_of_slot(&self, slot: u64) -> SystemTime {
        self.genesis() + Duration::from_secs(slot.saturating_mul(self.seconds_per_slot))
    }
}
