use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{
    FixedVector,
    typenum::{U48, U96},
};
use tree_hash_derive::TreeHash;

/// BLS12-381 signature in its 96-byte compressed wire form.
///
/// Vigil never verifies or aggregates signatures itself (signing is the key
/// manager's job); this is the shape that travels inside consensus containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(transparent)]
#[ssz(struct_behaviour = "transparent")]
#[tree_hash(struct_behaviour = "transparent")]
pub struct BLSSignature {
    pub inner: FixedVector<u8, U96>,
}

impl BLSSignature {
    /// The compressed point at infinity, the identity under aggregation.
    pub fn infinity() -> Self {
        let mut bytes = vec![0u8; 96];
        bytes[0] = 0xc0;
        Self {
            inner: FixedVector::from(bytes),
        }
    }
}

impl Default for BLSSignature {
    fn default() -> Self {
        Self::infinity()
    }
}

/// BLS12-381 public key in its 48-byte compressed wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(transparent)]
#[ssz(struct_behaviour = "transparent")]
#[tree_hash(struct_behaviour = "transparent")]
pub struct BLSPubKey {
    pub inner: FixedVector<u8, U48>,
}

impl Default for BLSPubKey {
    fn default() -> Self {
        Self {
            inner: FixedVector::from(vec![0u8; 48]),
        }
    }
}
