use std::collections::HashSet;

use vigil_consensus::{attester_slashing::AttesterSlashing, proposer_slashing::ProposerSlashing};

/// Weight of a single slashing report relative to a single attestation.
///
/// A slashing reward is at most MAX_EFFECTIVE_BALANCE / WHISTLEBLOWER_REWARD_QUOTIENT,
/// about 0.0625 ETH, while an individual attestation at a 250K validator set
/// earns roughly 0.000023 ETH. The ratio is a heuristic, not a protocol value.
pub const SLASHING_WEIGHT: f64 = 2700.0;

/// Score the slashings carried by a proposal, returning
/// `(attester_slashing_score, proposer_slashing_score)`.
pub fn score_slashings(
    attester_slashings: &[AttesterSlashing],
    proposer_slashings: &[ProposerSlashing],
) -> (f64, f64) {
    let proposer_slashing_score = proposer_slashings.len() as f64 * SLASHING_WEIGHT;

    // Only validators named by both accusing attestations are actually slashed.
    let indices_slashed: usize = attester_slashings.iter().map(double_voting_indices).sum();
    let attester_slashing_score = SLASHING_WEIGHT * indices_slashed as f64;

    (attester_slashing_score, proposer_slashing_score)
}

fn double_voting_indices(slashing: &AttesterSlashing) -> usize {
    let accused: HashSet<u64> = slashing
        .attestation_1
        .attesting_indices
        .iter()
        .copied()
        .collect();
    slashing
        .attestation_2
        .attesting_indices
        .iter()
        .filter(|index| accused.contains(index))
        .count()
}
