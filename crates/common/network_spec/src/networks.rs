use std::sync::{Arc, LazyLock};

use alloy_primitives::{B256, b256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Holesky,
    Sepolia,
    Hoodi,
    Dev,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub network: Network,
    pub genesis_time: u64,
    pub genesis_validator_root: B256,
    pub seconds_per_slot: u64,
    /// Sync committees do not exist before this epoch.
    pub altair_fork_epoch: u64,
}

pub static MAINNET: LazyLock<Arc<NetworkSpec>> = LazyLock::new(|| {
    NetworkSpec {
        network: Network::Mainnet,
        genesis_time: 1606824023,
        genesis_validator_root: b256!(
            "0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95"
        ),
        seconds_per_slot: 12,
        altair_fork_epoch: 74_240,
    }
    .into()
});

pub static HOLESKY: LazyLock<Arc<NetworkSpec>> = LazyLock::new(|| {
    NetworkSpec {
        network: Network::Holesky,
        genesis_time: 1727505000,
        genesis_validator_root: b256!(
            "0x9143aa7c615a7f7115e2b6aac319c03529df8242ae705fba9df39b79c59fa8b1"
        ),
        seconds_per_slot: 12,
        altair_fork_epoch: 0,
    }
    .into()
});

pub static SEPOLIA: LazyLock<Arc<NetworkSpec>> = LazyLock::new(|| {
    NetworkSpec {
        network: Network::Sepolia,
        genesis_time: 1655713800,
        genesis_validator_root: b256!(
            "0xd8ea171f3c94aea21ebc42a1ed61052acf3f9209c00e4efbaaddac09ed9b8078"
        ),
        seconds_per_slot: 12,
        altair_fork_epoch: 50,
    }
    .into()
});

pub static HOODI: LazyLock<Arc<NetworkSpec>> = LazyLock::new(|| {
    NetworkSpec {
        network: Network::Hoodi,
        genesis_time: 1742193600,
        genesis_validator_root: b256!(
            "0x212f13fc4df078b6cb7db228f1c8307566dcecf900867401a92023d7ba99cb5f"
        ),
        seconds_per_slot: 12,
        altair_fork_epoch: 0,
    }
    .into()
});

pub static DEV: LazyLock<Arc<NetworkSpec>> = LazyLock::new(|| {
    NetworkSpec {
        network: Network::Dev,
        genesis_time: 1606824023,
        genesis_validator_root: b256!(
            "0x4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95"
        ),
        seconds_per_slot: 12,
        altair_fork_epoch: 0,
    }
    .into()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_networks_with_sync_committees_from_genesis() {
        assert_eq!(HOLESKY.altair_fork_epoch, 0);
        assert_eq!(HOODI.altair_fork_epoch, 0);
        assert!(MAINNET.altair_fork_epoch > 0);
        assert!(SEPOLIA.altair_fork_epoch > 0);
    }
}
