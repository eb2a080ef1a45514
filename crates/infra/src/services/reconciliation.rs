use std::sync::Arc;

use finops_core::{
    AggregateRoot, Clock, ExpectedVersion, InstallmentId, Money, ObligationId, PaymentId,
};
use finops_matching::history::most_recent;
use finops_matching::{ConfirmationRecord, ExtractedReceipt, MatchScore, MatchingEngine};
use finops_payables::{Obligation, ObligationFilter, Payment, PaymentMethod, RegisterPayment};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// An owned ranked candidate.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub obligation: Obligation,
    pub score: MatchScore,
}

/// Request to settle an obligation from a receipt.
#[derive(Debug, Clone)]
pub struct ConfirmMatch {
    pub obligation_id: ObligationId,
    /// Settle a single installment; `None` settles every unpaid installment.
    pub installment_id: Option<InstallmentId>,
    pub receipt: ExtractedReceipt,
    /// Overrides the method read from the receipt.
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct ConfirmedMatch {
    pub payment: Payment,
    pub score: MatchScore,
    pub obligation: Obligation,
}

/// Receipt reconciliation: ranking against pending obligations, then confirmation.
pub struct ReconciliationService<S> {
    store: S,
    engine: MatchingEngine,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> ReconciliationService<S> {
    pub fn new(store: S, engine: MatchingEngine, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            engine,
            clock,
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Ranked candidates among pending obligations. A store failure is an error,
    /// never an empty ranking.
    pub fn match_receipt(
        &self,
        receipt: &ExtractedReceipt,
    ) -> Result<Vec<MatchCandidate>, ServiceError> {
        let pending = self
            .store
            .find_pending_obligations(&ObligationFilter::default(), self.clock.today())?;

        Ok(self
            .engine
            .rank(receipt, &pending)
            .into_iter()
            .map(|m| MatchCandidate {
                obligation: m.obligation.clone(),
                score: m.score,
            })
            .collect())
    }

    /// Re-score the chosen obligation and, when the score clears the threshold,
    /// register the payment described by the receipt.
    pub fn confirm(&self, request: ConfirmMatch) -> Result<ConfirmedMatch, ServiceError> {
        let obligation = self.store.get_obligation(request.obligation_id)?;
        if !obligation.is_pending() {
            return Err(ServiceError::Conflict(format!(
                "obligation {} is {:?}, not pending",
                request.obligation_id,
                obligation.lifecycle()
            )));
        }

        let score = self.engine.score(&request.receipt, &obligation);
        if !score.confirmable {
            tracing::warn!(
                obligation_id = %request.obligation_id,
                score = score.score,
                threshold = self.engine.config().confirm_threshold,
                "match below confirmation threshold"
            );
            return Err(ServiceError::validation(
                "score",
                format!(
                    "match score {} is below the confirmation threshold {}",
                    score.score,
                    self.engine.config().confirm_threshold
                ),
            ));
        }

        let method = request
            .payment_method
            .or(request.receipt.payment_method)
            .ok_or_else(|| ServiceError::validation("payment_method", "payment method is required"))?;

        let amount = match (request.receipt.amount, request.installment_id) {
            (Some(amount), _) => amount,
            (None, Some(installment_id)) => obligation
                .installment(installment_id)
                .map(|i| i.amount)
                .ok_or_else(|| ServiceError::NotFound {
                    entity: "installment",
                    id: installment_id.to_string(),
                })?,
            (None, None) => obligation.outstanding(),
        };

        let payment = self.store.insert_payment(RegisterPayment {
            obligation_id: request.obligation_id,
            installment_id: request.installment_id,
            payment_id: PaymentId::new(),
            payment_date: request
                .receipt
                .payment_date
                .unwrap_or_else(|| self.clock.today()),
            amount,
            method,
            notes: request.receipt.payment_note(),
            interest: Money::ZERO,
            fine: Money::ZERO,
            discount: Money::ZERO,
            // The score was computed on this version.
            expected_version: ExpectedVersion::Exact(obligation.version()),
        })?;

        tracing::info!(
            obligation_id = %request.obligation_id,
            payment_id = %payment.id,
            score = score.score,
            "match confirmed"
        );

        let record = ConfirmationRecord::new(
            self.clock.today(),
            request.obligation_id,
            payment.id,
            obligation.payee_name(),
            payment.amount,
            &score,
            request.receipt,
        );
        // The payment is already committed; a lost history line must not undo it.
        if let Err(err) = self.store.insert_confirmation(record) {
            tracing::warn!(
                obligation_id = %request.obligation_id,
                payment_id = %payment.id,
                error = %err,
                "confirmation history not recorded"
            );
        }

        let obligation = self.store.get_obligation(request.obligation_id)?;
        Ok(ConfirmedMatch {
            payment,
            score,
            obligation,
        })
    }

    /// Confirmed matches, newest first, at most `limit`.
    pub fn history(&self, limit: usize) -> Result<Vec<ConfirmationRecord>, ServiceError> {
        Ok(most_recent(self.store.list_confirmations()?, limit))
    }
}
