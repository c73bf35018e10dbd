pub mod duties;

pub use duties::SyncCommitteeDuty;
