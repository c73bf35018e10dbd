use serde::{Deserialize, Serialize};
use vigil_consensus::bls::BLSPubKey;

/// A validator's sync committee assignment for a committee period, as
/// returned by the duty-fetch provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCommitteeDuty {
    pub pubkey: BLSPubKey,
    #[serde(with = "serde_utils::quoted_u64")]
    pub validator_index: u64,
    #[serde(with = "serde_utils::quoted_u64_vec")]
    pub validator_sync_committee_indices: Vec<u64>,
}
