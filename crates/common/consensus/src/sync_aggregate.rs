use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitVector, typenum::U512};
use tree_hash_derive::TreeHash;

use crate::bls::BLSSignature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SyncAggregate {
    pub sync_committee_bits: BitVector<U512>,
    pub sync_committee_signature: BLSSignature,
}

impl SyncAggregate {
    pub fn num_participants(&self) -> usize {
        self.sync_committee_bits.iter().filter(|bit| *bit).count()
    }
}

impl Default for SyncAggregate {
    fn default() -> Self {
        Self {
            sync_committee_bits: BitVector::default(),
            sync_committee_signature: BLSSignature::infinity(),
        }
    }
}
