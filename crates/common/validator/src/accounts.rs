use vigil_consensus::bls::BLSPubKey;

/// Handle to a validating account held by the key manager.
///
/// Vigil only routes these to the signing collaborators; it never touches key
/// material itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorAccount {
    pub name: String,
    pub pubkey: BLSPubKey,
}
