//! Service layer for feed-service
//!
//! - scoring: signal aggregation into one comparable score
//! - strategies: one candidate generator per feed type, Home blending
//! - diversity: per-author cap and final item assembly
//! - interest: on-demand interest profile from recent interactions
//! - interactions: engagement recording and cache invalidation trigger
//! - feed: the engine tying the above to the cache

pub mod diversity;
pub mod feed;
pub mod interactions;
pub mod interest;
pub mod scoring;
pub mod strategies;

pub use diversity::DiversityRanker;
pub use feed::{Collaborators, FeedEngine, FeedPage};
pub use interactions::{interaction_score, InteractionRecorder, NewInteraction};
pub use interest::InterestProfileBuilder;
pub use scoring::{Scorer, ScoringContext};
