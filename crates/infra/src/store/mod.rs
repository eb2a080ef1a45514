//! Ledger Store boundary.
//!
//! The engines never touch storage; services read through this contract right before
//! invoking an engine and write the results back through it.

pub mod in_memory;

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use finops_accounting::{AccountNode, JournalEntry};
use finops_core::{DateRange, DomainError, ExpectedVersion, InvoiceId, ObligationId};
use finops_matching::ConfirmationRecord;
use finops_payables::{
    Invoice, InvoiceFilter, Obligation, ObligationFilter, ObligationStatus, Payment,
    RecurringRule, RegisterPayment,
};

pub use in_memory::InMemoryLedgerStore;

/// Store operation error.
///
/// These are infrastructure outcomes (availability, missing records, write conflicts);
/// domain rejections raised while applying a command under the store's lock are
/// carried unchanged in `Domain`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result of a deduplicated journal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// An entry for the same source installment already exists; nothing was written.
    AlreadyPresent,
}

/// Repository contract consumed by the services.
///
/// Every single-record write is atomic. `insert_payment` in particular must apply the
/// payment and the resulting status flips all-or-nothing, serialized per obligation.
pub trait LedgerStore: Send + Sync {
    /// Obligations matching `filter` (status evaluated on `today`), ordered by due
    /// date then id.
    fn find_obligations(
        &self,
        filter: &ObligationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError>;

    /// Same as `find_obligations`, restricted to obligations still pending (overdue
    /// included).
    fn find_pending_obligations(
        &self,
        filter: &ObligationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        let pending = ObligationFilter {
            status: Some(ObligationStatus::Pending),
            ..filter.clone()
        };
        self.find_obligations(&pending, today)
    }

    fn get_obligation(&self, id: ObligationId) -> Result<Obligation, StoreError>;

    fn insert_obligation(&self, obligation: Obligation) -> Result<(), StoreError>;

    /// Replace a stored obligation; `expected` is checked against the stored version.
    fn update_obligation(
        &self,
        obligation: Obligation,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// Apply a payment to its obligation and return the stored payment.
    fn insert_payment(&self, command: RegisterPayment) -> Result<Payment, StoreError>;

    /// Entries dated inside `range`, ordered by date then id.
    fn list_journal_entries(&self, range: DateRange) -> Result<Vec<JournalEntry>, StoreError>;

    fn insert_journal_entry(&self, entry: JournalEntry) -> Result<(), StoreError>;

    /// Insert unless an entry with the same source installment exists.
    fn upsert_journal_entry(&self, entry: JournalEntry) -> Result<UpsertOutcome, StoreError>;

    fn get_account_plan(&self) -> Result<Vec<AccountNode>, StoreError>;

    fn get_recurring_rules(&self) -> Result<Vec<RecurringRule>, StoreError>;

    fn insert_recurring_rule(&self, rule: RecurringRule) -> Result<(), StoreError>;

    fn update_recurring_rule(&self, rule: RecurringRule) -> Result<(), StoreError>;

    /// Store an invoice together with the obligation created from it, all-or-nothing.
    /// A second invoice with the same supplier, series and number is a conflict.
    fn insert_invoice(&self, invoice: Invoice, obligation: Obligation) -> Result<(), StoreError>;

    fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError>;

    /// Invoices matching `filter` (status is the linked obligation's on `today`),
    /// ordered by issue date then id.
    fn find_invoices(
        &self,
        filter: &InvoiceFilter,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, StoreError>;

    fn insert_confirmation(&self, record: ConfirmationRecord) -> Result<(), StoreError>;

    fn list_confirmations(&self) -> Result<Vec<ConfirmationRecord>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn find_obligations(
        &self,
        filter: &ObligationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        (**self).find_obligations(filter, today)
    }

    fn find_pending_obligations(
        &self,
        filter: &ObligationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        (**self).find_pending_obligations(filter, today)
    }

    fn get_obligation(&self, id: ObligationId) -> Result<Obligation, StoreError> {
        (**self).get_obligation(id)
    }

    fn insert_obligation(&self, obligation: Obligation) -> Result<(), StoreError> {
        (**self).insert_obligation(obligation)
    }

    fn update_obligation(
        &self,
        obligation: Obligation,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).update_obligation(obligation, expected)
    }

    fn insert_payment(&self, command: RegisterPayment) -> Result<Payment, StoreError> {
        (**self).insert_payment(command)
    }

    fn list_journal_entries(&self, range: DateRange) -> Result<Vec<JournalEntry>, StoreError> {
        (**self).list_journal_entries(range)
    }

    fn insert_journal_entry(&self, entry: JournalEntry) -> Result<(), StoreError> {
        (**self).insert_journal_entry(entry)
    }

    fn upsert_journal_entry(&self, entry: JournalEntry) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert_journal_entry(entry)
    }

    fn get_account_plan(&self) -> Result<Vec<AccountNode>, StoreError> {
        (**self).get_account_plan()
    }

    fn get_recurring_rules(&self) -> Result<Vec<RecurringRule>, StoreError> {
        (**self).get_recurring_rules()
    }

    fn insert_recurring_rule(&self, rule: RecurringRule) -> Result<(), StoreError> {
        (**self).insert_recurring_rule(rule)
    }

    fn update_recurring_rule(&self, rule: RecurringRule) -> Result<(), StoreError> {
        (**self).update_recurring_rule(rule)
    }

    fn insert_invoice(&self, invoice: Invoice, obligation: Obligation) -> Result<(), StoreError> {
        (**self).insert_invoice(invoice, obligation)
    }

    fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        (**self).get_invoice(id)
    }

    fn find_invoices(
        &self,
        filter: &InvoiceFilter,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_invoices(filter, today)
    }

    fn insert_confirmation(&self, record: ConfirmationRecord) -> Result<(), StoreError> {
        (**self).insert_confirmation(record)
    }

    fn list_confirmations(&self) -> Result<Vec<ConfirmationRecord>, StoreError> {
        (**self).list_confirmations()
    }
}
