//! Record of receipts confirmed against obligations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finops_core::{ConfirmationId, Entity, Money, ObligationId, PaymentId};

use crate::config::Confidence;
use crate::engine::MatchScore;
use crate::receipt::ExtractedReceipt;

/// One confirmed match, kept for the reconciliation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub id: ConfirmationId,
    pub confirmed_on: NaiveDate,
    pub obligation_id: ObligationId,
    pub payment_id: PaymentId,
    /// Payee of the obligation at confirmation time.
    pub payee: String,
    pub amount: Money,
    pub score: u32,
    pub confidence: Confidence,
    pub receipt: ExtractedReceipt,
}

impl Entity for ConfirmationRecord {
    type Id = ConfirmationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ConfirmationRecord {
    pub fn new(
        confirmed_on: NaiveDate,
        obligation_id: ObligationId,
        payment_id: PaymentId,
        payee: impl Into<String>,
        amount: Money,
        score: &MatchScore,
        receipt: ExtractedReceipt,
    ) -> Self {
        Self {
            id: ConfirmationId::new(),
            confirmed_on,
            obligation_id,
            payment_id,
            payee: payee.into(),
            amount,
            score: score.score,
            confidence: score.confidence,
            receipt,
        }
    }
}

/// Newest first by confirmation date, then id (ids are time-ordered), at most `limit` records.
pub fn most_recent(mut records: Vec<ConfirmationRecord>, limit: usize) -> Vec<ConfirmationRecord> {
    records.sort_by(|a, b| (b.confirmed_on, b.id).cmp(&(a.confirmed_on, a.id)));
    records.truncate(limit);
    records
}
