use std::collections::{HashMap, hash_map::Entry};

use alloy_primitives::B256;
use anyhow::{anyhow, ensure};
use parking_lot::RwLock;
use ssz_types::{BitList, typenum::U2048};
use tracing::warn;
use vigil_consensus::{
    attestation::Attestation, constants::SLOTS_PER_EPOCH, versioned_block::VersionedBeaconBlock,
};

pub type AggregationBits = BitList<U2048>;

/// The attestation positions already credited by an accepted block, indexed
/// by attestation slot and committee index.
///
/// Blocks reference their ancestors by parent root rather than by pointer, so
/// the whole structure stays trivially shareable under the pool's lock.
#[derive(Debug, Clone)]
pub struct PriorBlock {
    pub slot: u64,
    pub parent_root: B256,
    pub votes: HashMap<u64, HashMap<u64, AggregationBits>>,
}

impl PriorBlock {
    /// Collapse an accepted block's attestations into per-(slot, committee)
    /// credited positions.
    pub fn from_block(block: &VersionedBeaconBlock) -> Self {
        let mut votes: HashMap<u64, HashMap<u64, AggregationBits>> = HashMap::new();
        for attestation in block.attestations() {
            let by_committee = votes.entry(attestation.data.slot).or_default();
            match by_committee.entry(attestation.data.index) {
                Entry::Occupied(mut occupied) => {
                    if let Err(err) = union_into(occupied.get_mut(), &attestation.aggregation_bits)
                    {
                        warn!(
                            slot = attestation.data.slot,
                            committee_index = attestation.data.index,
                            "Skipping attestation with inconsistent bitfield: {err:?}"
                        );
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(attestation.aggregation_bits.clone());
                }
            }
        }
        Self {
            slot: block.slot(),
            parent_root: block.parent_root(),
            votes,
        }
    }
}

/// Accepted-chain history consulted by the scorer to avoid crediting a vote
/// that an ancestor block has already been rewarded for.
///
/// Scoring takes only the read lock and runs concurrently across providers;
/// writers insert entries as complete values.
#[derive(Debug, Default)]
pub struct PriorBlockPool {
    blocks: RwLock<HashMap<B256, PriorBlock>>,
}

impl PriorBlockPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted block under its root. The entry is assembled before
    /// the write lock is taken.
    pub fn observe_block(&self, root: B256, block: &VersionedBeaconBlock) {
        let prior_block = PriorBlock::from_block(block);
        self.blocks.write().insert(root, prior_block);
    }

    pub fn insert_block(&self, root: B256, block: PriorBlock) {
        self.blocks.write().insert(root, block);
    }

    /// Drop blocks older than `slot`; their attestations can no longer be
    /// credited by any proposal being scored.
    pub fn prune_before(&self, slot: u64) {
        self.blocks.write().retain(|_, block| block.slot >= slot);
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Walk the ancestor chain from `root`, OR-ing together every credited
    /// bitfield recorded for this attestation's slot and committee.
    ///
    /// The walk ends when the chain runs out or the visited block's slot
    /// falls more than one epoch behind the attestation. Returns an all-zero
    /// bitfield sized to the attestation when no ancestor contributed;
    /// inconsistent bitfield lengths between ancestors are an error.
    pub fn prior_votes_for_attestation(
        &self,
        attestation: &Attestation,
        root: B256,
    ) -> anyhow::Result<AggregationBits> {
        let oldest_slot = attestation.data.slot.saturating_sub(SLOTS_PER_EPOCH);

        let blocks = self.blocks.read();
        let mut accumulated: Option<AggregationBits> = None;
        let mut root = root;
        while let Some(block) = blocks.get(&root) {
            if block.slot < oldest_slot {
                break;
            }
            if let Some(votes) = block
                .votes
                .get(&attestation.data.slot)
                .and_then(|by_committee| by_committee.get(&attestation.data.index))
            {
                match accumulated.as_mut() {
                    Some(accumulated) => union_into(accumulated, votes)?,
                    None => accumulated = Some(votes.clone()),
                }
            }
            root = block.parent_root;
        }

        match accumulated {
            Some(bits) => Ok(bits),
            None => BitList::with_capacity(attestation.aggregation_bits.len())
                .map_err(|err| anyhow!("Failed to build empty vote bitfield: {err:?}")),
        }
    }
}

fn union_into(accumulated: &mut AggregationBits, votes: &AggregationBits) -> anyhow::Result<()> {
    ensure!(
        accumulated.len() == votes.len(),
        "bitfield length mismatch: {} != {}",
        accumulated.len(),
        votes.len()
    );
    for (position, bit) in votes.iter().enumerate() {
        if bit {
            accumulated
                .set(position, true)
                .map_err(|err| anyhow!("Failed to set bit {position}: {err:?}"))?;
        }
    }
    Ok(())
}
