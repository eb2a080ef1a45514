//! Listing filters and the totals shown alongside a list of obligations.

use chrono::NaiveDate;
use serde::Serialize;

use finops_core::Money;

use crate::category::{Category, ExpenseType};
use crate::obligation::{Obligation, ObligationStatus};

/// All fields optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObligationFilter {
    /// Case-insensitive substring of the payee name.
    pub payee: Option<String>,
    /// Inclusive bounds on the obligation due date.
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub status: Option<ObligationStatus>,
    pub category: Option<Category>,
    pub expense_type: Option<ExpenseType>,
}

impl ObligationFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(ObligationStatus::Pending),
            ..Self::default()
        }
    }

    pub fn overdue() -> Self {
        Self {
            status: Some(ObligationStatus::Overdue),
            ..Self::default()
        }
    }

    pub fn matches(&self, obligation: &Obligation, today: NaiveDate) -> bool {
        if let Some(needle) = &self.payee {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty() && !obligation.payee_name().to_lowercase().contains(&needle) {
                return false;
            }
        }
        if self.due_from.is_some_and(|from| obligation.due_date() < from) {
            return false;
        }
        if self.due_to.is_some_and(|to| obligation.due_date() > to) {
            return false;
        }
        if self.category.is_some_and(|c| obligation.category() != c) {
            return false;
        }
        if self.expense_type.is_some_and(|t| obligation.expense_type() != t) {
            return false;
        }
        match self.status {
            None => true,
            // Overdue obligations are still pending in the persisted sense.
            Some(ObligationStatus::Pending) => obligation.is_pending(),
            Some(status) => obligation.status_on(today) == status,
        }
    }
}

/// Orders obligations by due date, then id.
pub fn sort_by_due_date(obligations: &mut [Obligation]) {
    obligations.sort_by_key(|o| (o.due_date(), o.id_typed()));
}

/// Totals for a list of obligations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObligationTotals {
    /// Sum of totals, cancelled obligations excluded.
    pub total: Money,
    /// Sum of registered payments.
    pub paid: Money,
    /// Outstanding amount of pending obligations (overdue included).
    pub pending: Money,
    /// Outstanding amount of overdue obligations.
    pub overdue: Money,
    pub count: usize,
}

impl ObligationTotals {
    pub fn summarize<'a>(obligations: impl IntoIterator<Item = &'a Obligation>, today: NaiveDate) -> Self {
        obligations
            .into_iter()
            .fold(ObligationTotals::default(), |mut acc, ob| {
                acc.count += 1;
                match ob.status_on(today) {
                    ObligationStatus::Cancelled => return acc,
                    ObligationStatus::Overdue => {
                        acc.pending += ob.outstanding();
                        acc.overdue += ob.outstanding();
                    }
                    ObligationStatus::Pending => acc.pending += ob.outstanding(),
                    ObligationStatus::Paid => {}
                }
                acc.total += ob.total();
                acc.paid += ob.total_paid();
                acc
            })
    }
}
