use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use finops_core::{Aggregate, AggregateRoot, Clock, ExpectedVersion, Money, ObligationId};
use finops_payables::{
    CancelObligation, Category, CreateObligation, ExpenseType, InstallmentPlan, Obligation,
    ObligationCommand, ObligationFilter, ObligationStatus, ObligationTotals, Payee, Payment,
    RegisterPayment,
};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// Input for [`PayablesService::create`].
#[derive(Debug, Clone)]
pub struct NewObligation {
    pub description: String,
    pub payee: Payee,
    pub expense_type: ExpenseType,
    pub category: Category,
    pub total: Money,
    /// Defaults to today.
    pub issue_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub plan: InstallmentPlan,
}

/// A filtered listing with its totals.
#[derive(Debug, Clone)]
pub struct ObligationList {
    pub items: Vec<Obligation>,
    pub totals: ObligationTotals,
    /// Date the derived statuses were evaluated on.
    pub as_of: NaiveDate,
}

/// Dashboard overview of the payables book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayablesSummary {
    pub as_of: NaiveDate,
    pub totals: ObligationTotals,
    pub overdue_count: usize,
    pub due_next_7_days: usize,
}

/// Obligation reads and writes: listing, creation, payment, cancellation.
pub struct PayablesService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> PayablesService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Obligations matching `filter`, ascending due date then id, with totals.
    pub fn list(&self, filter: &ObligationFilter) -> Result<ObligationList, ServiceError> {
        let today = self.today();
        let items = self.store.find_obligations(filter, today)?;
        let totals = ObligationTotals::summarize(&items, today);
        Ok(ObligationList {
            items,
            totals,
            as_of: today,
        })
    }

    pub fn overdue(&self) -> Result<ObligationList, ServiceError> {
        self.list(&ObligationFilter::overdue())
    }

    pub fn summary(&self) -> Result<PayablesSummary, ServiceError> {
        let all = self.list(&ObligationFilter::default())?;
        let horizon = all.as_of + chrono::Days::new(7);
        let overdue_count = all
            .items
            .iter()
            .filter(|o| o.status_on(all.as_of) == ObligationStatus::Overdue)
            .count();
        let due_next_7_days = all
            .items
            .iter()
            .filter(|o| o.is_pending())
            .filter(|o| (all.as_of..=horizon).contains(&o.effective_due_date()))
            .count();
        Ok(PayablesSummary {
            as_of: all.as_of,
            totals: all.totals,
            overdue_count,
            due_next_7_days,
        })
    }

    pub fn get(&self, id: ObligationId) -> Result<Obligation, ServiceError> {
        Ok(self.store.get_obligation(id)?)
    }

    pub fn create(&self, input: NewObligation) -> Result<Obligation, ServiceError> {
        let obligation = Obligation::create(CreateObligation {
            obligation_id: ObligationId::new(),
            description: input.description,
            payee: input.payee,
            expense_type: input.expense_type,
            category: input.category,
            total: input.total,
            issue_date: input.issue_date.unwrap_or_else(|| self.today()),
            due_date: input.due_date,
            notes: input.notes,
            plan: input.plan,
            source_rule: None,
            source_invoice: None,
        })?;
        self.store.insert_obligation(obligation.clone())?;

        tracing::info!(
            obligation_id = %obligation.id_typed(),
            total = %obligation.total(),
            installments = obligation.installments().len(),
            "obligation created"
        );
        Ok(obligation)
    }

    /// Register a payment; atomic at the store, rejected when already paid.
    pub fn register_payment(&self, command: RegisterPayment) -> Result<Payment, ServiceError> {
        let obligation_id = command.obligation_id;
        let payment = self.store.insert_payment(command)?;

        tracing::info!(
            %obligation_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            method = ?payment.method,
            "payment registered"
        );
        Ok(payment)
    }

    pub fn cancel(
        &self,
        id: ObligationId,
        reason: Option<String>,
        expected_version: ExpectedVersion,
    ) -> Result<Obligation, ServiceError> {
        let mut obligation = self.store.get_obligation(id)?;
        let loaded_version = obligation.version();

        obligation.execute(&ObligationCommand::Cancel(CancelObligation {
            obligation_id: id,
            reason: reason.filter(|r| !r.trim().is_empty()),
            cancelled_on: self.today(),
            expected_version,
        }))?;
        // A payment landing between the read and this write bumps the version.
        self.store
            .update_obligation(obligation.clone(), ExpectedVersion::Exact(loaded_version))?;

        tracing::info!(obligation_id = %id, "obligation cancelled");
        Ok(obligation)
    }
}
