use std::{collections::HashMap, sync::Arc, time::SystemTime};

use async_trait::async_trait;
use futures::future::BoxFuture;
use vigil_api_types::SyncCommitteeDuty;
use vigil_consensus::sync_committee_message::SyncCommitteeMessage;

use crate::{
    accounts::ValidatorAccount,
    duty::{SyncCommitteeAggregatorDuty, SyncCommitteeMessageDuty},
};

/// Work registered with the external job scheduler.
pub type ScheduledJob = BoxFuture<'static, ()>;

#[async_trait]
pub trait SyncCommitteeDutiesProvider: Send + Sync {
    /// One entry per requested validator that has a seat in the sync
    /// committee for the period containing `epoch`.
    async fn sync_committee_duties(
        &self,
        epoch: u64,
        validator_indices: &[u64],
    ) -> anyhow::Result<Vec<SyncCommitteeDuty>>;
}

#[async_trait]
pub trait ValidatingAccountsProvider: Send + Sync {
    async fn validating_accounts_for_epoch(
        &self,
        epoch: u64,
        validator_indices: &[u64],
    ) -> anyhow::Result<HashMap<u64, Arc<ValidatorAccount>>>;
}

/// The host's job scheduler. Registration is fire-and-forget: a job runs at
/// most once, at or after `fire_at`, on the scheduler's own concurrency.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    async fn schedule_job(
        &self,
        name: String,
        fire_at: SystemTime,
        job: ScheduledJob,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SyncCommitteeSubscriber: Send + Sync {
    /// Submit subnet subscriptions covering `duties` for the period starting
    /// at `epoch`.
    async fn subscribe(&self, epoch: u64, duties: &[SyncCommitteeDuty]) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SyncCommitteeMessenger: Send + Sync {
    /// Stage whatever the sign step needs for `duty`, recording aggregator
    /// selections on the duty as a side effect.
    async fn prepare(&self, duty: &SyncCommitteeMessageDuty) -> anyhow::Result<()>;

    /// Produce and submit the slot's sync committee messages.
    async fn message(
        &self,
        duty: &SyncCommitteeMessageDuty,
    ) -> anyhow::Result<Vec<SyncCommitteeMessage>>;
}

#[async_trait]
pub trait SyncCommitteeAggregator: Send + Sync {
    async fn aggregate(&self, duty: SyncCommitteeAggregatorDuty) -> anyhow::Result<()>;
}
