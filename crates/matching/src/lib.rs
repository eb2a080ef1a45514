//! `finops-matching`: reconciles an extracted payment receipt against open
//! obligations.
//!
//! The score is a weighted sum of independent signals (amount, payee, date), each
//! normalized to [0, 1]. Weights sum to 100, so scores are percentages. The engine
//! only ranks; confirming a match is a write-path concern handled by the caller,
//! which records each confirmation as a [`ConfirmationRecord`].

pub mod config;
pub mod engine;
pub mod history;
pub mod normalize;
pub mod receipt;
pub mod signal;

pub use config::{Confidence, MatchingConfig, SignalWeights};
pub use engine::{MatchScore, MatchingEngine, RankedMatch, SignalScore, WeightedSignal};
pub use history::ConfirmationRecord;
pub use receipt::ExtractedReceipt;
pub use signal::{AmountSignal, DateSignal, PayeeSignal, Signal};
