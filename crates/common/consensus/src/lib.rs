pub mod altair;
pub mod attestation;
pub mod attestation_data;
pub mod attester_slashing;
pub mod beacon_block_header;
pub mod bls;
pub mod checkpoint;
pub mod constants;
pub mod deposit;
pub mod eth1_data;
pub mod indexed_attestation;
pub mod misc;
pub mod phase0;
pub mod proposer_slashing;
pub mod sync_aggregate;
pub mod sync_committee_message;
pub mod versioned_block;
pub mod voluntary_exit;
