//! Supplier invoice documents.
//!
//! Invoices arrive already structured (the tax-document parsing happens upstream).
//! Ingesting one validates its amounts and yields the obligation that will carry
//! its installments; the invoice keeps the document data and links to it.

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use finops_core::{DomainError, DomainResult, Entity, InvoiceId, Money, ObligationId, text};

use crate::category::{Category, ExpenseType};
use crate::obligation::{CreateObligation, InstallmentDraft, InstallmentPlan, ObligationStatus};
use crate::payee::Payee;

/// Series used when the document does not state one.
pub const DEFAULT_SERIES: &str = "1";

/// Length of an electronic invoice access key.
pub const ACCESS_KEY_DIGITS: usize = 44;

/// Item quantity with three decimal places, stored in thousandths.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    /// Largest quantity a line item may carry (7 integer digits).
    pub const MAX: Quantity = Quantity(9_999_999_999);

    pub const fn from_thousandths(thousandths: i64) -> Self {
        Self(thousandths)
    }

    pub const fn thousandths(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    /// Accepts up to three fractional digits, with `.` or `,` as separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation("quantity", format!("not a quantity: {s:?}"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let normalized = digits.replace(',', ".");
        let (units, frac) = normalized.split_once('.').unwrap_or((normalized.as_str(), ""));
        if units.is_empty()
            || !units.bytes().all(|b| b.is_ascii_digit())
            || frac.len() > 3
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = units.parse().map_err(|_| invalid())?;
        let frac: i64 = format!("{frac:0<3}").parse().map_err(|_| invalid())?;
        let magnitude = units
            .checked_mul(1000)
            .and_then(|v| v.checked_add(frac))
            .filter(|v| *v <= Quantity::MAX.0)
            .ok_or_else(|| {
                DomainError::validation("quantity", format!("quantity {s:?} is out of range"))
            })?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuantityRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match QuantityRepr::deserialize(deserializer)? {
            QuantityRepr::Text(s) => s.parse(),
            QuantityRepr::Integer(units) => units.to_string().parse(),
            QuantityRepr::Float(v) => format!("{v:.3}").parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// One product line of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    #[serde(default)]
    pub product_code: Option<String>,
    pub description: String,
    pub quantity: Quantity,
    pub unit: String,
    pub unit_price: Money,
    pub total: Money,
    /// Mercosur product classification.
    #[serde(default)]
    pub ncm: Option<String>,
    /// Fiscal operation code.
    #[serde(default)]
    pub cfop: Option<String>,
}

impl InvoiceItem {
    fn validate(&self, position: usize) -> DomainResult<()> {
        let fail = |msg: &str| DomainError::validation("items", format!("item {position}: {msg}"));
        if self.description.trim().is_empty() {
            return Err(fail("description is required"));
        }
        if self.unit.trim().is_empty() {
            return Err(fail("unit is required"));
        }
        if !self.quantity.is_positive() {
            return Err(fail("quantity must be positive"));
        }
        if self.unit_price.is_negative() || self.total.is_negative() {
            return Err(fail("amounts cannot be negative"));
        }
        Ok(())
    }
}

/// An ingested supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub series: String,
    pub supplier: Payee,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total: Money,
    pub discount: Money,
    /// `total - discount`; the amount the obligation carries.
    pub net: Money,
    pub access_key: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub obligation_id: ObligationId,
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for [`Invoice::ingest`].
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: String,
    pub series: Option<String>,
    pub supplier: Payee,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total: Money,
    pub discount: Money,
    /// Checked against `total - discount` when present.
    pub net: Option<Money>,
    pub access_key: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    /// Empty means a single installment on the due date (or the issue date).
    pub installments: Vec<InstallmentDraft>,
    pub category: Category,
    pub expense_type: ExpenseType,
}

impl Invoice {
    /// Validate a structured invoice and build it together with the command that
    /// creates its obligation.
    pub fn ingest(input: NewInvoice) -> DomainResult<(Invoice, CreateObligation)> {
        let number = input.number.trim().to_string();
        if number.is_empty() {
            return Err(DomainError::validation("number", "invoice number is required"));
        }
        let series = input
            .series
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERIES.to_string());
        if input.supplier.tax_id().is_none() {
            return Err(DomainError::validation(
                "supplier_tax_id",
                "supplier tax id is required on an invoice",
            ));
        }

        if !input.total.is_positive() {
            return Err(DomainError::validation("total", "invoice total must be positive"));
        }
        if input.discount.is_negative() || input.discount >= input.total {
            return Err(DomainError::validation(
                "discount",
                format!("discount {} must be between zero and the total {}", input.discount, input.total),
            ));
        }
        let net = input
            .total
            .checked_sub(input.discount)
            .ok_or_else(|| DomainError::validation("net", "net amount overflows"))?;
        if let Some(stated) = input.net.filter(|stated| *stated != net) {
            return Err(DomainError::validation(
                "net",
                format!("net amount {stated} differs from total minus discount ({net})"),
            ));
        }

        if let Some(due) = input.due_date.filter(|due| *due < input.issue_date) {
            return Err(DomainError::validation(
                "due_date",
                format!("due date {due} precedes the issue date {}", input.issue_date),
            ));
        }
        let access_key = input
            .access_key
            .map(|key| key.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|key| !key.is_empty());
        if let Some(key) = &access_key {
            if key.len() != ACCESS_KEY_DIGITS || !key.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DomainError::validation(
                    "access_key",
                    format!("access key must have {ACCESS_KEY_DIGITS} digits"),
                ));
            }
        }
        for (idx, item) in input.items.iter().enumerate() {
            item.validate(idx + 1)?;
        }

        let first_due = input.installments.iter().map(|d| d.due_date).min();
        let (due_date, plan) = match first_due {
            Some(first) => (
                first,
                InstallmentPlan::Explicit {
                    installments: input.installments,
                },
            ),
            None => (
                input.due_date.unwrap_or(input.issue_date),
                InstallmentPlan::Single,
            ),
        };

        let invoice = Invoice {
            id: InvoiceId::new(),
            number,
            series,
            supplier: input.supplier,
            issue_date: input.issue_date,
            due_date: input.due_date,
            total: input.total,
            discount: input.discount,
            net,
            access_key,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            items: input.items,
            obligation_id: ObligationId::new(),
        };
        let create = CreateObligation {
            obligation_id: invoice.obligation_id,
            description: format!("{} ({})", invoice.reference(), invoice.supplier.name()),
            payee: invoice.supplier.clone(),
            expense_type: input.expense_type,
            category: input.category,
            total: net,
            issue_date: invoice.issue_date,
            due_date,
            notes: invoice.notes.clone(),
            plan,
            source_rule: None,
            source_invoice: Some(invoice.id),
        };
        Ok((invoice, create))
    }

    /// Printed reference, e.g. `NF 1234/1`.
    pub fn reference(&self) -> String {
        format!("NF {}/{}", self.number, self.series)
    }

    /// Uniqueness key: the same supplier never issues the same number twice in a series.
    pub fn document_key(&self) -> (String, String, String) {
        (
            self.supplier.tax_id().unwrap_or_default().to_string(),
            self.series.clone(),
            self.number.clone(),
        )
    }
}

/// Listing filter; the status is the linked obligation's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    /// Accent- and case-insensitive match on the supplier name, or a digits match on
    /// the tax id.
    pub supplier: Option<String>,
    pub issued_from: Option<NaiveDate>,
    pub issued_to: Option<NaiveDate>,
    pub status: Option<ObligationStatus>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice, status: ObligationStatus) -> bool {
        if let Some(query) = self.supplier.as_deref() {
            let needle = text::slug(query);
            let digits: String = query.chars().filter(char::is_ascii_digit).collect();
            let by_name = !needle.is_empty() && text::slug(invoice.supplier.name()).contains(&needle);
            let by_tax_id = !digits.is_empty()
                && invoice
                    .supplier
                    .tax_id()
                    .is_some_and(|tax_id| tax_id.contains(&digits));
            if !by_name && !by_tax_id {
                return false;
            }
        }
        if self.issued_from.is_some_and(|from| invoice.issue_date < from) {
            return false;
        }
        if self.issued_to.is_some_and(|to| invoice.issue_date > to) {
            return false;
        }
        match self.status {
            // Pending includes overdue, as on obligations.
            Some(ObligationStatus::Pending) => {
                matches!(status, ObligationStatus::Pending | ObligationStatus::Overdue)
            }
            Some(wanted) => status == wanted,
            None => true,
        }
    }
}
