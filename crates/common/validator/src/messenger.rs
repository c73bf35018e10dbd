use std::{collections::HashMap, sync::Arc, time::Duration};

use tracing::{debug, error, trace, warn};
use vigil_chain::ChainTime;
use vigil_consensus::constants::EPOCHS_PER_SYNC_COMMITTEE_PERIOD;
use vigil_executor::VigilExecutor;
use vigil_network_spec::networks::NetworkSpec;

use crate::{
    accounts::ValidatorAccount,
    duty::{SyncCommitteeAggregatorDuty, SyncCommitteeMessageDuty},
    traits::{
        JobScheduler, SyncCommitteeAggregator, SyncCommitteeDutiesProvider, SyncCommitteeMessenger,
        SyncCommitteeSubscriber, ValidatingAccountsProvider,
    },
};

/// Lead time for the prepare job ahead of its slot.
const PREPARE_LEAD_TIME: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SyncCommitteeMessengerConfig {
    /// Sync committee duties do not exist before this epoch.
    pub altair_fork_epoch: u64,
    pub epochs_per_sync_committee_period: u64,
    /// How long after the start of a slot to wait before signing, giving the
    /// head block time to arrive.
    pub max_sync_committee_message_delay: Duration,
}

impl SyncCommitteeMessengerConfig {
    pub fn for_network(spec: &NetworkSpec) -> Self {
        Self {
            altair_fork_epoch: spec.altair_fork_epoch,
            epochs_per_sync_committee_period: EPOCHS_PER_SYNC_COMMITTEE_PERIOD,
            max_sync_committee_message_delay: Duration::from_secs(spec.seconds_per_slot / 3),
        }
    }
}

/// Turns a committee period's duty set into per-slot prepare and sign jobs,
/// cascading into aggregation jobs for validators that win aggregator
/// selection.
///
/// Scheduling is maximally best-effort: a failure scoped to one validator or
/// one slot never takes down the rest of the window.
pub struct SyncCommitteeMessengerService {
    chain_time: Arc<ChainTime>,
    executor: VigilExecutor,
    config: SyncCommitteeMessengerConfig,
    duties_provider: Arc<dyn SyncCommitteeDutiesProvider>,
    accounts_provider: Arc<dyn ValidatingAccountsProvider>,
    scheduler: Arc<dyn JobScheduler>,
    subscriber: Arc<dyn SyncCommitteeSubscriber>,
    messenger: Arc<dyn SyncCommitteeMessenger>,
    aggregator: Arc<dyn SyncCommitteeAggregator>,
}

impl SyncCommitteeMessengerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain_time: Arc<ChainTime>,
        executor: VigilExecutor,
        config: SyncCommitteeMessengerConfig,
        duties_provider: Arc<dyn SyncCommitteeDutiesProvider>,
        accounts_provider: Arc<dyn ValidatingAccountsProvider>,
        scheduler: Arc<dyn JobScheduler>,
        subscriber: Arc<dyn SyncCommitteeSubscriber>,
        messenger: Arc<dyn SyncCommitteeMessenger>,
        aggregator: Arc<dyn SyncCommitteeAggregator>,
    ) -> Self {
        Self {
            chain_time,
            executor,
            config,
            duties_provider,
            accounts_provider,
            scheduler,
            subscriber,
            messenger,
            aggregator,
        }
    }

    /// Schedule sync committee messages for the period containing `epoch`, on
    /// behalf of `validator_indices`.
    ///
    /// Returns once every per-slot scheduling unit has been launched; the
    /// units themselves run to completion on the executor.
    pub async fn schedule_sync_committee_messages(
        self: &Arc<Self>,
        epoch: u64,
        validator_indices: &[u64],
    ) {
        if validator_indices.is_empty() {
            return;
        }
        if self.chain_time.current_epoch() < self.config.altair_fork_epoch {
            debug!("Sync committees not yet active; not scheduling");
            return;
        }

        let period = epoch / self.config.epochs_per_sync_committee_period;
        let (mut first_slot, last_slot) = self.sync_message_window(period);
        trace!(period, first_slot, last_slot, "Scheduling sync committee messages");

        let first_epoch = self.first_epoch_of_sync_period(period);
        let duties = match self
            .duties_provider
            .sync_committee_duties(first_epoch, validator_indices)
            .await
        {
            Ok(duties) => duties,
            Err(err) => {
                error!("Failed to fetch sync committee message duties: {err:?}");
                return;
            }
        };
        trace!(duties = duties.len(), "Fetched sync committee message duties");

        // Combine the per-validator duties for the period.
        let mut assignments: HashMap<u64, Vec<u64>> = HashMap::with_capacity(duties.len());
        for duty in &duties {
            assignments.insert(
                duty.validator_index,
                duty.validator_sync_committee_indices.clone(),
            );
        }
        let assignments = Arc::new(assignments);

        let accounts = match self
            .accounts_provider
            .validating_accounts_for_epoch(first_epoch, validator_indices)
            .await
        {
            Ok(accounts) => accounts,
            Err(err) => {
                error!("Failed to obtain validating accounts for epoch: {err:?}");
                return;
            }
        };

        // Never schedule for slots that have already passed.
        if first_slot < self.chain_time.current_slot() {
            first_slot = self.chain_time.current_slot();
        }
        debug!(first_slot, last_slot, "Setting sync committee duties for period");

        for slot in first_slot..=last_slot {
            let service = Arc::clone(self);
            let assignments = Arc::clone(&assignments);
            let accounts = accounts.clone();
            self.executor.spawn(async move {
                service.schedule_slot_jobs(slot, assignments, accounts).await;
            });
        }

        if let Err(err) = self.subscriber.subscribe(first_epoch, &duties).await {
            error!("Failed to submit sync committee subscriptions: {err:?}");
        }
    }

    /// Register the prepare and sign jobs for a single slot. A prepare
    /// registration failure abandons the slot; a sign registration failure
    /// only logs, leaving the other slots untouched.
    async fn schedule_slot_jobs(
        self: Arc<Self>,
        slot: u64,
        assignments: Arc<HashMap<u64, Vec<u64>>>,
        accounts: HashMap<u64, Arc<ValidatorAccount>>,
    ) {
        let mut duty = SyncCommitteeMessageDuty::new(slot, assignments);
        for validator_index in duty.validator_indices() {
            match accounts.get(&validator_index) {
                Some(account) => duty.attach_account(validator_index, Arc::clone(account)),
                // Keep going: schedule as much of the duty as possible.
                None => error!(validator_index, "No validating account; cannot continue"),
            }
        }
        let duty = Arc::new(duty);

        let prepare_time = self.chain_time.start_of_slot(slot) - PREPARE_LEAD_TIME;
        let service = Arc::clone(&self);
        let prepare_duty = Arc::clone(&duty);
        if let Err(err) = self
            .scheduler
            .schedule_job(
                format!("Prepare sync committee messages for slot {slot}"),
                prepare_time,
                Box::pin(async move {
                    service.prepare_sync_committee_messages(prepare_duty).await;
                }),
            )
            .await
        {
            error!("Failed to schedule prepare sync committee messages: {err:?}");
            return;
        }

        let message_time =
            self.chain_time.start_of_slot(slot) + self.config.max_sync_committee_message_delay;
        let service = Arc::clone(&self);
        let message_duty = Arc::clone(&duty);
        if let Err(err) = self
            .scheduler
            .schedule_job(
                format!("Sync committee messages for slot {slot}"),
                message_time,
                Box::pin(async move {
                    service.message_sync_committee(message_duty).await;
                }),
            )
            .await
        {
            error!("Failed to schedule sync committee messages: {err:?}");
        }
    }

    /// Prepare handler: stage the duty with the messenger, then schedule the
    /// aggregation job if any of the duty's validators won selection.
    async fn prepare_sync_committee_messages(
        self: Arc<Self>,
        duty: Arc<SyncCommitteeMessageDuty>,
    ) {
        if let Err(err) = self.messenger.prepare(&duty).await {
            error!(
                sync_committee_slot = duty.slot(),
                "Failed to prepare sync committee messages: {err:?}"
            );
            return;
        }

        let mut aggregator_indices = Vec::new();
        let mut selection_proofs = HashMap::new();
        for validator_index in duty.validator_indices() {
            let subcommittees = duty.aggregator_subcommittees(validator_index);
            if !subcommittees.is_empty() {
                aggregator_indices.push(validator_index);
                selection_proofs.insert(validator_index, subcommittees);
            }
        }
        if aggregator_indices.is_empty() {
            return;
        }

        let aggregator_duty = SyncCommitteeAggregatorDuty {
            slot: duty.slot(),
            validator_indices: aggregator_indices,
            selection_proofs,
            accounts: duty.accounts(),
        };
        // Aggregate once attestations have had time to propagate.
        let aggregation_time =
            self.chain_time.start_of_slot(duty.slot()) + self.chain_time.slot_duration() * 2 / 3;
        let aggregator = Arc::clone(&self.aggregator);
        if let Err(err) = self
            .scheduler
            .schedule_job(
                format!("Sync committee aggregation for slot {}", duty.slot()),
                aggregation_time,
                Box::pin(async move {
                    if let Err(err) = aggregator.aggregate(aggregator_duty).await {
                        error!("Failed to aggregate sync committee messages: {err:?}");
                    }
                }),
            )
            .await
        {
            error!("Failed to schedule sync committee aggregation: {err:?}");
        }
    }

    /// Sign handler: a failed submission is an accepted loss for the slot.
    async fn message_sync_committee(self: Arc<Self>, duty: Arc<SyncCommitteeMessageDuty>) {
        if let Err(err) = self.messenger.message(&duty).await {
            warn!("Failed to submit sync committee messages: {err:?}");
            return;
        }
        trace!(slot = duty.slot(), "Submitted sync committee messages");
    }

    /// First epoch of the given sync committee period, clamped to the fork
    /// epoch the duty type activates at.
    pub fn first_epoch_of_sync_period(&self, period: u64) -> u64 {
        period
            .saturating_mul(self.config.epochs_per_sync_committee_period)
            .max(self.config.altair_fork_epoch)
    }

    /// The slot range `[first, last]` during which messages for `period` are
    /// produced. The first message goes out one slot before the period so it
    /// can be included in the period's first slot; the period's last slot
    /// produces nothing since it could never be included.
    fn sync_message_window(&self, period: u64) -> (u64, u64) {
        let first_epoch = self.first_epoch_of_sync_period(period);
        let first_slot = self
            .chain_time
            .first_slot_of_epoch(first_epoch)
            .saturating_sub(1);
        let last_epoch = self.first_epoch_of_sync_period(period.saturating_add(1)) - 1;
        let last_slot = self
            .chain_time
            .first_slot_of_epoch(last_epoch + 1)
            .saturating_sub(2);
        (first_slot, last_slot)
    }
}
