use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{VariableList, typenum::U2048};
use tree_hash_derive::TreeHash;

use crate::{attestation_data::AttestationData, bls::BLSSignature};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct IndexedAttestation {
    pub attesting_indices: VariableList<u64, U2048>,
    pub data: AttestationData,
    pub signature: BLSSignature,
}
