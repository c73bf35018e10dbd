use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

use crate::bls::BLSSignature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SyncCommitteeMessage {
    pub slot: u64,
    pub beacon_block_root: B256,
    pub validator_index: u64,
    pub signature: BLSSignature,
}
