//! Vigil Score - Reputation and threat scoring
//!
//! Two scorers share this crate:
//! - [`ReputationScorer`] keeps a per-entity trust score in a concurrent
//!   [`ReputationStore`]. Each observation re-derives the score from
//!   deterministic heuristics plus the entity's accumulated history.
//! - [`ThreatScorer`] fuses six per-finding signals into one composite
//!   [0,100] threat score, a severity tier, and a confidence figure.

pub mod reputation;
pub mod store;
pub mod threat;

pub use reputation::ReputationScorer;
pub use store::ReputationStore;
pub use threat::{SubScores, ThreatAssessment, ThreatScorer};
