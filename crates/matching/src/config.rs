use serde::{Deserialize, Serialize};

use finops_core::{DomainError, DomainResult, Money};

/// Points each signal contributes at full strength. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub amount: u32,
    pub payee: u32,
    pub date: u32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            amount: 50,
            payee: 30,
            date: 20,
        }
    }
}

impl SignalWeights {
    pub fn total(&self) -> u32 {
        self.amount + self.payee + self.date
    }
}

/// Confidence band shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Bands, windows and thresholds for the matching engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub weights: SignalWeights,
    /// Differences up to this amount count as equal.
    pub amount_tolerance: Money,
    /// Amount signal decays linearly to zero at this percentage of the outstanding amount.
    pub amount_band_pct: f64,
    /// Days after the due date that still count as on time.
    pub date_grace_days: i64,
    /// Date signal is zero at or beyond this many days from the due date.
    pub date_cutoff_days: i64,
    /// Minimum score for one-click confirmation.
    pub confirm_threshold: u32,
    pub high_confidence: u32,
    pub medium_confidence: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            amount_tolerance: Money::from_cents(1),
            amount_band_pct: 5.0,
            date_grace_days: 3,
            date_cutoff_days: 30,
            confirm_threshold: 30,
            high_confidence: 70,
            medium_confidence: 40,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.weights.total() != 100 {
            return Err(DomainError::validation(
                "weights",
                format!("signal weights must sum to 100 (got {})", self.weights.total()),
            ));
        }
        if self.amount_tolerance.is_negative() {
            return Err(DomainError::validation("amount_tolerance", "cannot be negative"));
        }
        if !self.amount_band_pct.is_finite() || self.amount_band_pct < 0.0 {
            return Err(DomainError::validation(
                "amount_band_pct",
                "must be a non-negative percentage",
            ));
        }
        if self.date_grace_days < 0 || self.date_cutoff_days <= self.date_grace_days {
            return Err(DomainError::validation(
                "date_cutoff_days",
                "cutoff must be greater than the grace window, and both non-negative",
            ));
        }
        if self.confirm_threshold > 100 {
            return Err(DomainError::validation("confirm_threshold", "must be at most 100"));
        }
        if self.medium_confidence > self.high_confidence || self.high_confidence > 100 {
            return Err(DomainError::validation(
                "high_confidence",
                "confidence tiers must satisfy medium <= high <= 100",
            ));
        }
        Ok(())
    }

    pub fn confidence(&self, score: u32) -> Confidence {
        if score >= self.high_confidence {
            Confidence::High
        } else if score >= self.medium_confidence {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn is_confirmable(&self, score: u32) -> bool {
        score >= self.confirm_threshold
    }
}
