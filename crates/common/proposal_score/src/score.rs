use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use ssz_types::BitList;
use tracing::{trace, warn};
use vigil_consensus::{
    altair,
    constants::{
        SLOTS_PER_EPOCH, SYNC_REWARD_WEIGHT, TIMELY_HEAD_WEIGHT, TIMELY_SOURCE_WEIGHT,
        TIMELY_TARGET_WEIGHT, WEIGHT_DENOMINATOR,
    },
    phase0,
    versioned_block::VersionedBeaconBlock,
};

use crate::{
    prior_blocks::{AggregationBits, PriorBlockPool},
    slashings::score_slashings,
};

/// Participation reward weights, in units of the denominator.
///
/// Defaults to the protocol constants; hosts following a modified chain spec
/// supply their own.
#[derive(Debug, Clone, Copy)]
pub struct RewardWeights {
    pub timely_source: u64,
    pub timely_target: u64,
    pub timely_head: u64,
    pub sync_reward: u64,
    pub denominator: u64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            timely_source: TIMELY_SOURCE_WEIGHT,
            timely_target: TIMELY_TARGET_WEIGHT,
            timely_head: TIMELY_HEAD_WEIGHT,
            sync_reward: SYNC_REWARD_WEIGHT,
            denominator: WEIGHT_DENOMINATOR,
        }
    }
}

/// Scores candidate block proposals as a proxy for the reward expected from
/// signing them; the caller ranks competing proposals by the result.
///
/// Scoring never fails: malformed input degrades to a zero or penalized
/// score so that comparison across providers keeps working.
pub struct BlockProposalScorer {
    prior_blocks: Arc<PriorBlockPool>,
    weights: RewardWeights,
}

// Map attestation slot -> committee index -> positions already credited
// during this scoring pass.
type AttestedMap = HashMap<u64, HashMap<u64, AggregationBits>>;

impl BlockProposalScorer {
    pub fn new(prior_blocks: Arc<PriorBlockPool>) -> Self {
        Self::with_weights(prior_blocks, RewardWeights::default())
    }

    pub fn with_weights(prior_blocks: Arc<PriorBlockPool>, weights: RewardWeights) -> Self {
        Self {
            prior_blocks,
            weights,
        }
    }

    /// Score `proposal` from `provider` against the slot of the parent it
    /// builds on. Higher is better; an absent proposal scores 0.
    pub fn score(
        &self,
        provider: &str,
        parent_slot: u64,
        proposal: Option<&VersionedBeaconBlock>,
    ) -> f64 {
        let Some(proposal) = proposal else {
            return 0.0;
        };
        match proposal {
            VersionedBeaconBlock::Phase0(block) => self.score_phase0(provider, parent_slot, block),
            VersionedBeaconBlock::Altair(block) => self.score_altair(provider, parent_slot, block),
        }
    }

    fn score_phase0(&self, provider: &str, parent_slot: u64, block: &phase0::BeaconBlock) -> f64 {
        let mut attestation_score = 0.0;
        let mut immediate_attestation_score = 0.0;
        let mut attested = AttestedMap::new();

        for attestation in block.body.attestations.iter() {
            let data = &attestation.data;
            let Some(credited) = credited_positions(
                &mut attested,
                data.slot,
                data.index,
                attestation.aggregation_bits.len(),
            ) else {
                continue;
            };

            // An attestation cannot be included in the slot it votes for, so
            // the distance has a floor of one.
            let inclusion_distance = block.slot.saturating_sub(data.slot).max(1);
            for (position, bit) in attestation.aggregation_bits.iter().enumerate() {
                if !bit || credited.get(position).unwrap_or(false) {
                    continue;
                }
                attestation_score += 0.75 + 0.25 / inclusion_distance as f64;
                if inclusion_distance == 1 {
                    immediate_attestation_score += 1.0;
                }
                if credited.set(position, true).is_err() {
                    warn!(
                        slot = data.slot,
                        committee_index = data.index,
                        position,
                        "Failed to record credited attestation position"
                    );
                }
            }
        }

        let (attester_slashing_score, proposer_slashing_score) = score_slashings(
            &block.body.attester_slashings,
            &block.body.proposer_slashings,
        );

        // Scale by the distance to the parent; a proposal at or behind its
        // parent is penalized as if it were a full epoch away.
        let scale = if block.slot <= parent_slot {
            warn!(
                slot = block.slot,
                parent_slot, "Invalid parent slot for proposal"
            );
            SLOTS_PER_EPOCH
        } else {
            block.slot - parent_slot
        };

        let total = attestation_score / scale as f64 + proposer_slashing_score
            + attester_slashing_score;
        trace!(
            slot = block.slot,
            parent_slot,
            provider,
            immediate_attestations = immediate_attestation_score,
            attestations = attestation_score,
            proposer_slashings = proposer_slashing_score,
            attester_slashings = attester_slashing_score,
            scale,
            total,
            "Scored phase0 block"
        );
        total
    }

    fn score_altair(&self, provider: &str, parent_slot: u64, block: &altair::BeaconBlock) -> f64 {
        let weights = self.weights;
        let mut attestation_score = 0.0;
        let mut immediate_attestation_score = 0.0;
        let mut attested = AttestedMap::new();

        for attestation in block.body.attestations.iter() {
            let data = &attestation.data;
            let Some(credited) = credited_positions(
                &mut attested,
                data.slot,
                data.index,
                attestation.aggregation_bits.len(),
            ) else {
                continue;
            };

            let prior_votes = match self
                .prior_blocks
                .prior_votes_for_attestation(attestation, block.parent_root)
            {
                Ok(votes) => Some(votes),
                Err(err) => {
                    warn!("Failed to obtain prior votes for attestation; assuming none: {err:?}");
                    None
                }
            };

            let mut new_votes = 0u64;
            for (position, bit) in attestation.aggregation_bits.iter().enumerate() {
                if !bit {
                    continue;
                }
                if credited.get(position).unwrap_or(false) {
                    // Already credited by an earlier attestation in this block.
                    continue;
                }
                if prior_votes
                    .as_ref()
                    .is_some_and(|votes| votes.get(position).unwrap_or(false))
                {
                    // Already credited by an ancestor block.
                    continue;
                }
                new_votes += 1;
                if credited.set(position, true).is_err() {
                    warn!(
                        slot = data.slot,
                        committee_index = data.index,
                        position,
                        "Failed to record credited attestation position"
                    );
                }
            }

            // The target vote cannot be checked from here, so it is assumed
            // correct; the head vote is checkable only at distance one.
            let score = match block.slot.saturating_sub(data.slot) {
                1 => {
                    let weight = if block.parent_root == data.beacon_block_root {
                        weights.timely_source + weights.timely_target + weights.timely_head
                    } else {
                        weights.timely_source + weights.timely_target
                    };
                    let score = new_votes as f64 * weight as f64 / weights.denominator as f64;
                    immediate_attestation_score += score;
                    score
                }
                // Head vote is no longer timely; source and target still count.
                2..=5 => {
                    new_votes as f64 * (weights.timely_source + weights.timely_target) as f64
                        / weights.denominator as f64
                }
                // Source vote is no longer timely either; target only.
                _ => new_votes as f64 * weights.timely_target as f64 / weights.denominator as f64,
            };
            attestation_score += score;
        }

        let (attester_slashing_score, proposer_slashing_score) = score_slashings(
            &block.body.attester_slashings,
            &block.body.proposer_slashings,
        );

        let sync_committee_score = block.body.sync_aggregate.num_participants() as f64
            * weights.sync_reward as f64
            / weights.denominator as f64;

        let total = attestation_score
            + proposer_slashing_score
            + attester_slashing_score
            + sync_committee_score;
        trace!(
            slot = block.slot,
            parent_slot,
            provider,
            immediate_attestations = immediate_attestation_score,
            attestations = attestation_score,
            proposer_slashings = proposer_slashing_score,
            attester_slashings = attester_slashing_score,
            sync_committee = sync_committee_score,
            total,
            "Scored altair block"
        );
        total
    }
}

/// The credited-positions bitfield for `(slot, index)`, created on first use
/// with this attestation's length. `None` if the length is unrepresentable,
/// in which case the attestation is skipped.
fn credited_positions<'a>(
    attested: &'a mut AttestedMap,
    slot: u64,
    index: u64,
    bit_length: usize,
) -> Option<&'a mut AggregationBits> {
    match attested.entry(slot).or_default().entry(index) {
        Entry::Occupied(occupied) => Some(occupied.into_mut()),
        Entry::Vacant(vacant) => match BitList::with_capacity(bit_length) {
            Ok(bits) => Some(vacant.insert(bits)),
            Err(err) => {
                warn!(
                    slot,
                    committee_index = index,
                    bit_length,
                    "Invalid aggregation bitfield length: {err:?}"
                );
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use rstest::rstest;
    use ssz_types::VariableList;
    use vigil_consensus::{
        attestation::Attestation,
        attestation_data::AttestationData,
        attester_slashing::AttesterSlashing,
        beacon_block_header::{BeaconBlockHeader, SignedBeaconBlockHeader},
        bls::BLSSignature,
        checkpoint::Checkpoint,
        eth1_data::Eth1Data,
        indexed_attestation::IndexedAttestation,
        proposer_slashing::ProposerSlashing,
        sync_aggregate::SyncAggregate,
    };

    use super::*;
    use crate::prior_blocks::PriorBlock;

    fn bits(length: usize, positions: &[usize]) -> AggregationBits {
        let mut bits = BitList::with_capacity(length).expect("length within bounds");
        for position in positions {
            bits.set(*position, true).expect("position within length");
        }
        bits
    }

    fn attestation(slot: u64, index: u64, head_root: B256, positions: &[usize]) -> Attestation {
        Attestation {
            aggregation_bits: bits(8, positions),
            data: AttestationData {
                slot,
                index,
                beacon_block_root: head_root,
                source: Checkpoint {
                    epoch: 0,
                    root: B256::ZERO,
                },
                target: Checkpoint {
                    epoch: 0,
                    root: B256::ZERO,
                },
            },
            signature: BLSSignature::infinity(),
        }
    }

    fn attester_slashing(first: &[u64], second: &[u64]) -> AttesterSlashing {
        let indexed = |indices: &[u64]| IndexedAttestation {
            attesting_indices: VariableList::from(indices.to_vec()),
            data: attestation(0, 0, B256::ZERO, &[]).data,
            signature: BLSSignature::infinity(),
        };
        AttesterSlashing {
            attestation_1: indexed(first),
            attestation_2: indexed(second),
        }
    }

    fn proposer_slashing() -> ProposerSlashing {
        let header = SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                slot: 0,
                proposer_index: 0,
                parent_root: B256::ZERO,
                state_root: B256::ZERO,
                body_root: B256::ZERO,
            },
            signature: BLSSignature::infinity(),
        };
        ProposerSlashing {
            signed_header_1: header.clone(),
            signed_header_2: header,
        }
    }

    fn phase0_block(slot: u64, attestations: Vec<Attestation>) -> VersionedBeaconBlock {
        VersionedBeaconBlock::Phase0(phase0::BeaconBlock {
            slot,
            proposer_index: 0,
            parent_root: B256::ZERO,
            state_root: B256::ZERO,
            body: phase0::BeaconBlockBody {
                randao_reveal: BLSSignature::infinity(),
                eth1_data: Eth1Data::default(),
                graffiti: B256::ZERO,
                proposer_slashings: VariableList::empty(),
                attester_slashings: VariableList::empty(),
                attestations: VariableList::from(attestations),
                deposits: VariableList::empty(),
                voluntary_exits: VariableList::empty(),
            },
        })
    }

    fn altair_block(
        slot: u64,
        parent_root: B256,
        attestations: Vec<Attestation>,
        sync_participants: &[usize],
    ) -> VersionedBeaconBlock {
        let mut sync_aggregate = SyncAggregate::default();
        for participant in sync_participants {
            sync_aggregate
                .sync_committee_bits
                .set(*participant, true)
                .expect("participant index within committee");
        }
        VersionedBeaconBlock::Altair(altair::BeaconBlock {
            slot,
            proposer_index: 0,
            parent_root,
            state_root: B256::ZERO,
            body: altair::BeaconBlockBody {
                randao_reveal: BLSSignature::infinity(),
                eth1_data: Eth1Data::default(),
                graffiti: B256::ZERO,
                proposer_slashings: VariableList::empty(),
                attester_slashings: VariableList::empty(),
                attestations: VariableList::from(attestations),
                deposits: VariableList::empty(),
                voluntary_exits: VariableList::empty(),
                sync_aggregate,
            },
        })
    }

    fn scorer() -> BlockProposalScorer {
        BlockProposalScorer::new(Arc::new(PriorBlockPool::new()))
    }

    #[test]
    fn test_missing_proposal_scores_zero() {
        assert_eq!(scorer().score("test", 100, None), 0.0);
    }

    #[test]
    fn test_phase0_immediate_inclusion() {
        // Three fresh bits at distance one: 3 x (0.75 + 0.25), scale 1.
        let block = phase0_block(101, vec![attestation(100, 0, B256::ZERO, &[0, 1, 2])]);
        assert_eq!(scorer().score("test", 100, Some(&block)), 3.0);
    }

    #[test]
    fn test_phase0_inclusion_distance_decay() {
        // Distance four: 0.75 + 0.25/4 per bit, scale 4.
        let block = phase0_block(104, vec![attestation(100, 0, B256::ZERO, &[0, 1])]);
        assert_eq!(scorer().score("test", 100, Some(&block)), 2.0 * 0.8125 / 4.0);
    }

    #[test]
    fn test_phase0_overlapping_attestations_credit_once() {
        let block = phase0_block(
            101,
            vec![
                attestation(100, 0, B256::ZERO, &[0, 1, 2]),
                attestation(100, 0, B256::ZERO, &[0, 1, 2]),
                attestation(100, 0, B256::ZERO, &[2, 3]),
            ],
        );
        // Bits 0..=2 credit once, bit 3 from the third attestation.
        assert_eq!(scorer().score("test", 100, Some(&block)), 4.0);
    }

    #[test]
    fn test_phase0_equal_parent_slot_forces_epoch_scale() {
        let block = phase0_block(100, vec![attestation(99, 0, B256::ZERO, &[0])]);
        // Invalid ordering: scale forced to 32 rather than dividing by zero.
        assert_eq!(scorer().score("test", 100, Some(&block)), 1.0 / 32.0);
    }

    #[test]
    fn test_phase0_slashings_are_not_scaled() {
        let mut block = phase0_block(110, vec![]);
        let VersionedBeaconBlock::Phase0(inner) = &mut block else {
            unreachable!();
        };
        inner.body.proposer_slashings = VariableList::from(vec![proposer_slashing()]);
        assert_eq!(scorer().score("test", 100, Some(&block)), 2700.0);
    }

    #[rstest]
    // Distance one with a matching head root earns source + target + head.
    #[case(1, true, 54.0 / 64.0)]
    // Distance one with a stale head earns source + target.
    #[case(1, false, 40.0 / 64.0)]
    // Distances two through five earn source + target.
    #[case(2, true, 40.0 / 64.0)]
    #[case(5, true, 40.0 / 64.0)]
    // Beyond five only the target weight remains.
    #[case(6, true, 26.0 / 64.0)]
    fn test_altair_weight_buckets(
        #[case] distance: u64,
        #[case] head_matches: bool,
        #[case] expected: f64,
    ) {
        let parent_root = B256::from([1u8; 32]);
        let head_root = if head_matches {
            parent_root
        } else {
            B256::from([2u8; 32])
        };
        let block = altair_block(
            100 + distance,
            parent_root,
            vec![attestation(100, 0, head_root, &[0])],
            &[],
        );
        assert_eq!(scorer().score("test", 100, Some(&block)), expected);
    }

    #[test]
    fn test_altair_sync_committee_participation() {
        let block = altair_block(101, B256::ZERO, vec![], &[0, 1, 2, 3, 4]);
        // 5 participants x SYNC_REWARD_WEIGHT / WEIGHT_DENOMINATOR.
        assert_eq!(scorer().score("test", 100, Some(&block)), 5.0 * 2.0 / 64.0);
    }

    #[test]
    fn test_altair_slashing_scenario() {
        let mut block = altair_block(101, B256::ZERO, vec![], &[]);
        let VersionedBeaconBlock::Altair(inner) = &mut block else {
            unreachable!();
        };
        inner.body.proposer_slashings =
            VariableList::from(vec![proposer_slashing(), proposer_slashing()]);
        inner.body.attester_slashings =
            VariableList::from(vec![attester_slashing(&[1, 2, 3, 9], &[1, 2, 3, 8])]);
        // 2 proposer slashings + 3 doubly-accused attesters, 2700 each.
        assert_eq!(scorer().score("test", 100, Some(&block)), 13_500.0);
    }

    #[test]
    fn test_altair_prior_votes_not_recredited() {
        let pool = Arc::new(PriorBlockPool::new());
        let parent_root = B256::from([1u8; 32]);

        // The parent block at slot 101 already credited bits 0 and 1 of the
        // slot-100 attestation.
        let parent = altair_block(
            101,
            B256::from([2u8; 32]),
            vec![attestation(100, 0, B256::ZERO, &[0, 1])],
            &[],
        );
        pool.observe_block(parent_root, &parent);

        let scorer = BlockProposalScorer::new(Arc::clone(&pool));
        let block = altair_block(
            102,
            parent_root,
            vec![attestation(100, 0, parent_root, &[0, 1, 2])],
            &[],
        );
        // Only bit 2 is new: one vote at distance two, source + target weight.
        assert_eq!(scorer.score("test", 101, Some(&block)), 40.0 / 64.0);
    }

    #[test]
    fn test_altair_in_block_dedup_across_attestations() {
        let parent_root = B256::from([1u8; 32]);
        let block = altair_block(
            101,
            parent_root,
            vec![
                attestation(100, 0, parent_root, &[0, 1]),
                attestation(100, 0, parent_root, &[0, 1]),
            ],
            &[],
        );
        assert_eq!(
            scorer().score("test", 100, Some(&block)),
            2.0 * 54.0 / 64.0
        );
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let pool = Arc::new(PriorBlockPool::new());
        pool.insert_block(
            B256::from([1u8; 32]),
            PriorBlock {
                slot: 100,
                parent_root: B256::ZERO,
                votes: std::collections::HashMap::new(),
            },
        );
        let scorer = BlockProposalScorer::new(pool);

        let block = altair_block(
            101,
            B256::from([1u8; 32]),
            vec![
                attestation(100, 0, B256::from([1u8; 32]), &[0, 1, 2]),
                attestation(99, 1, B256::ZERO, &[4, 5]),
            ],
            &[7, 8],
        );
        let first = scorer.score("test", 100, Some(&block));
        let second = scorer.score("test", 100, Some(&block));
        assert_eq!(first, second);
        assert!(first > 0.0);
    }

    #[test]
    fn test_custom_weights_are_honored() {
        let weights = RewardWeights {
            timely_source: 1,
            timely_target: 1,
            timely_head: 1,
            sync_reward: 1,
            denominator: 4,
        };
        let scorer =
            BlockProposalScorer::with_weights(Arc::new(PriorBlockPool::new()), weights);
        let parent_root = B256::from([1u8; 32]);
        let block = altair_block(
            101,
            parent_root,
            vec![attestation(100, 0, parent_root, &[0])],
            &[0, 1],
        );
        // One vote at (1+1+1)/4 plus two sync participants at 1/4.
        assert_eq!(scorer.score("test", 100, Some(&block)), 0.75 + 0.5);
    }
}
