use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finops_core::{
    DomainError, DomainResult, InstallmentId, InvoiceId, JournalEntryId, Money, ObligationId,
};

use crate::chart::AccountPlan;

/// Links a synchronized entry back to the installment it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntrySource {
    pub obligation_id: ObligationId,
    pub installment_id: InstallmentId,
    /// Invoice the obligation was ingested from.
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
}

/// A single-sided posting against one account.
///
/// Amounts are signed: positive increases the account's natural balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub account_code: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    /// Invoice, receipt or obligation reference.
    pub document: Option<String>,
    pub source: Option<EntrySource>,
}

/// Input for a manually posted entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewJournalEntry {
    pub account_code: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    #[serde(default)]
    pub document: Option<String>,
}

impl JournalEntry {
    /// Validate and build a manual entry against `plan`.
    pub fn manual(input: NewJournalEntry, plan: &AccountPlan) -> DomainResult<Self> {
        let account_code = input.account_code.trim().to_string();
        if !plan.contains(&account_code) {
            return Err(DomainError::validation(
                "account_code",
                format!("unknown account code {account_code:?}"),
            ));
        }
        if input.amount.is_zero() {
            return Err(DomainError::validation("amount", "amount must be non-zero"));
        }
        let description = input.description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("description", "description is required"));
        }

        Ok(Self {
            id: JournalEntryId::new(),
            account_code,
            date: input.date,
            amount: input.amount,
            description: description.to_string(),
            document: input.document.filter(|d| !d.trim().is_empty()),
            source: None,
        })
    }

    pub fn source_installment(&self) -> Option<InstallmentId> {
        self.source.map(|s| s.installment_id)
    }
}
