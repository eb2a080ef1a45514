//! Ranks pending obligations against an extracted receipt.

use std::cmp::Reverse;

use serde::Serialize;

use finops_core::{DomainError, DomainResult};
use finops_payables::{Lifecycle, Obligation};

use crate::config::{Confidence, MatchingConfig};
use crate::receipt::ExtractedReceipt;
use crate::signal::{AmountSignal, DateSignal, PayeeSignal, Signal};

/// A signal together with the points it is worth at full strength.
pub struct WeightedSignal {
    pub signal: Box<dyn Signal>,
    pub weight: u32,
}

impl WeightedSignal {
    pub fn new(signal: impl Signal + 'static, weight: u32) -> Self {
        Self {
            signal: Box::new(signal),
            weight,
        }
    }
}

/// One signal's share of a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalScore {
    pub signal: &'static str,
    /// Normalized strength in [0, 1].
    pub strength: f64,
    /// `strength * weight`.
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    /// Integer percentage in [0, 100].
    pub score: u32,
    pub breakdown: Vec<SignalScore>,
    pub confidence: Confidence,
    pub confirmable: bool,
}

/// A ranked candidate, borrowing the obligation it scores.
#[derive(Debug, Clone)]
pub struct RankedMatch<'a> {
    pub obligation: &'a Obligation,
    pub score: MatchScore,
}

pub struct MatchingEngine {
    config: MatchingConfig,
    signals: Vec<WeightedSignal>,
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let signals: Vec<_> = self
            .signals
            .iter()
            .map(|s| (s.signal.name(), s.weight))
            .collect();
        f.debug_struct("MatchingEngine")
            .field("config", &self.config)
            .field("signals", &signals)
            .finish()
    }
}

impl MatchingEngine {
    /// Engine with the amount, payee and date signals weighted per `config`.
    pub fn new(config: MatchingConfig) -> DomainResult<Self> {
        config.validate()?;
        let signals = vec![
            WeightedSignal::new(AmountSignal, config.weights.amount),
            WeightedSignal::new(PayeeSignal, config.weights.payee),
            WeightedSignal::new(DateSignal, config.weights.date),
        ];
        Ok(Self { config, signals })
    }

    /// Engine with a caller-supplied signal table. Weights must sum to 100.
    pub fn with_signals(config: MatchingConfig, signals: Vec<WeightedSignal>) -> DomainResult<Self> {
        let total: u32 = signals.iter().map(|s| s.weight).sum();
        if total != 100 {
            return Err(DomainError::validation(
                "weights",
                format!("signal weights must sum to 100 (got {total})"),
            ));
        }
        Ok(Self { config, signals })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Score one obligation against the receipt. Does not check the lifecycle.
    pub fn score(&self, receipt: &ExtractedReceipt, candidate: &Obligation) -> MatchScore {
        let breakdown: Vec<SignalScore> = self
            .signals
            .iter()
            .map(|ws| {
                let strength = ws
                    .signal
                    .evaluate(receipt, candidate, &self.config)
                    .clamp(0.0, 1.0);
                SignalScore {
                    signal: ws.signal.name(),
                    strength,
                    points: strength * ws.weight as f64,
                }
            })
            .collect();

        let total: f64 = breakdown.iter().map(|s| s.points).sum();
        let score = (total.round() as u32).min(100);

        MatchScore {
            score,
            breakdown,
            confidence: self.config.confidence(score),
            confirmable: self.config.is_confirmable(score),
        }
    }

    /// Rank pending candidates: score descending, then due date, then id.
    ///
    /// Paid and cancelled obligations are dropped. Candidates below the
    /// confirmation threshold are kept and flagged as not confirmable.
    pub fn rank<'a>(
        &self,
        receipt: &ExtractedReceipt,
        candidates: impl IntoIterator<Item = &'a Obligation>,
    ) -> Vec<RankedMatch<'a>> {
        let mut ranked: Vec<RankedMatch<'a>> = candidates
            .into_iter()
            .filter(|ob| ob.lifecycle() == Lifecycle::Pending)
            .map(|obligation| RankedMatch {
                obligation,
                score: self.score(receipt, obligation),
            })
            .collect();

        ranked.sort_by_key(|m| {
            (
                Reverse(m.score.score),
                m.obligation.due_date(),
                m.obligation.id_typed(),
            )
        });

        tracing::debug!(
            candidates = ranked.len(),
            best = ranked.first().map(|m| m.score.score),
            "ranked receipt candidates"
        );
        ranked
    }
}
