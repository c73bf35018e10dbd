use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use vigil_consensus::bls::BLSSignature;

use crate::accounts::ValidatorAccount;

/// One slot's sync committee message obligations.
///
/// Built once when the committee period is scheduled and dropped after the
/// slot's sign job runs. The subcommittee assignments are shared read-only
/// across every duty of the period; accounts are attached right after
/// construction and may be partially missing. Aggregator selections are the
/// one late-arriving piece: the prepare collaborator records them while the
/// duty is already shared with the scheduled jobs, hence the lock.
#[derive(Debug)]
pub struct SyncCommitteeMessageDuty {
    slot: u64,
    assignments: Arc<HashMap<u64, Vec<u64>>>,
    accounts: HashMap<u64, Arc<ValidatorAccount>>,
    aggregator_subcommittees: RwLock<HashMap<u64, HashMap<u64, BLSSignature>>>,
}

impl SyncCommitteeMessageDuty {
    pub fn new(slot: u64, assignments: Arc<HashMap<u64, Vec<u64>>>) -> Self {
        Self {
            slot,
            assignments,
            accounts: HashMap::new(),
            aggregator_subcommittees: RwLock::new(HashMap::new()),
        }
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    pub fn validator_indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = self.assignments.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn subcommittee_indices(&self, validator_index: u64) -> Option<&[u64]> {
        self.assignments
            .get(&validator_index)
            .map(|indices| indices.as_slice())
    }

    pub fn attach_account(&mut self, validator_index: u64, account: Arc<ValidatorAccount>) {
        self.accounts.insert(validator_index, account);
    }

    pub fn account(&self, validator_index: u64) -> Option<Arc<ValidatorAccount>> {
        self.accounts.get(&validator_index).cloned()
    }

    pub fn accounts(&self) -> HashMap<u64, Arc<ValidatorAccount>> {
        self.accounts.clone()
    }

    /// Record that `validator_index` won aggregator selection for the given
    /// subcommittees, with the proofs that demonstrate it.
    pub fn set_aggregator_subcommittees(
        &self,
        validator_index: u64,
        selection_proofs: HashMap<u64, BLSSignature>,
    ) {
        self.aggregator_subcommittees
            .write()
            .insert(validator_index, selection_proofs);
    }

    /// Subcommittee index to selection proof for `validator_index`, empty if
    /// it is not an aggregator this slot.
    pub fn aggregator_subcommittees(&self, validator_index: u64) -> HashMap<u64, BLSSignature> {
        self.aggregator_subcommittees
            .read()
            .get(&validator_index)
            .cloned()
            .unwrap_or_default()
    }
}

/// The aggregation obligations derived from a message duty at prepare time.
/// Only exists when at least one of the duty's validators is an aggregator.
#[derive(Debug, Clone)]
pub struct SyncCommitteeAggregatorDuty {
    pub slot: u64,
    pub validator_indices: Vec<u64>,
    pub selection_proofs: HashMap<u64, HashMap<u64, BLSSignature>>,
    pub accounts: HashMap<u64, Arc<ValidatorAccount>>,
}
