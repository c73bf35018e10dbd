pub mod accounts;
pub mod duty;
pub mod messenger;
pub mod traits;

pub use accounts::ValidatorAccount;
pub use duty::{SyncCommitteeAggregatorDuty, SyncCommitteeMessageDuty};
pub use messenger::{SyncCommitteeMessengerConfig, SyncCommitteeMessengerService};
