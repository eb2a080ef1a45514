use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finops_core::Money;
use finops_payables::PaymentMethod;

/// Fields extracted from a payment receipt by an upstream reader.
///
/// Every field is optional: extraction is best-effort, and a missing field
/// contributes nothing to the score rather than failing the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    /// Beneficiary as printed on the receipt.
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub document_reference: Option<String>,
}

impl ExtractedReceipt {
    /// Note stored with a payment confirmed from this receipt.
    pub fn payment_note(&self) -> Option<String> {
        let parts: Vec<String> = [
            self.bank.as_deref().map(|b| format!("bank: {}", b.trim())),
            self.document_reference
                .as_deref()
                .map(|d| format!("document: {}", d.trim())),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(format!("confirmed from receipt ({})", parts.join(", ")))
        }
    }
}
