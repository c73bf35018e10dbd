use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::{altair, attestation::Attestation, phase0};

/// A beacon block proposal in any of the formats the client understands.
///
/// New variants appear only at scheduled protocol upgrades, so consumers
/// match exhaustively instead of falling back to dynamic dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version", content = "data", rename_all = "snake_case")]
pub enum VersionedBeaconBlock {
    Phase0(phase0::BeaconBlock),
    Altair(altair::BeaconBlock),
}

impl VersionedBeaconBlock {
    pub fn slot(&self) -> u64 {
        match self {
            VersionedBeaconBlock::Phase0(block) => block.slot,
            VersionedBeaconBlock::Altair(block) => block.slot,
        }
    }

    pub fn parent_root(&self) -> B256 {
        match self {
            VersionedBeaconBlock::Phase0(block) => block.parent_root,
            VersionedBeaconBlock::Altair(block) => block.parent_root,
        }
    }

    pub fn attestations(&self) -> &[Attestation] {
        match self {
            VersionedBeaconBlock::Phase0(block) => &block.body.attestations,
            VersionedBeaconBlock::Altair(block) => &block.body.attestations,
        }
    }
}
