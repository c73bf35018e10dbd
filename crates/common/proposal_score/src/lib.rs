pub mod prior_blocks;
pub mod score;
pub mod slashings;

pub use prior_blocks::{PriorBlock, PriorBlockPool};
pub use score::{BlockProposalScorer, RewardWeights};
