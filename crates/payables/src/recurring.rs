//! Recurring obligation rules (rent, utilities, payroll...).

use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finops_core::{DomainError, DomainResult, Entity, Money, RecurringRuleId};

use crate::category::{Category, ExpenseType};
use crate::payee::Payee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Monthly,
    Quarterly,
    Annual,
}

impl Periodicity {
    /// Months between two consecutive cycles.
    pub fn step_months(self) -> i64 {
        match self {
            Periodicity::Monthly => 1,
            Periodicity::Quarterly => 3,
            Periodicity::Annual => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Periodicity::Monthly => "monthly",
            Periodicity::Quarterly => "quarterly",
            Periodicity::Annual => "annual",
        }
    }
}

impl FromStr for Periodicity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "mensal" => Ok(Periodicity::Monthly),
            "quarterly" | "trimestral" => Ok(Periodicity::Quarterly),
            "annual" | "yearly" | "anual" => Ok(Periodicity::Annual),
            other => Err(DomainError::validation(
                "periodicity",
                format!("unknown periodicity {other:?}"),
            )),
        }
    }
}

/// Template from which one obligation per cycle is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: RecurringRuleId,
    pub description: String,
    pub payee: Payee,
    pub category: Category,
    pub expense_type: ExpenseType,
    pub amount: Money,
    pub periodicity: Periodicity,
    /// 1..=31; clamped down in shorter months.
    pub due_day: u32,
    /// Anchor: no cycle falls in a month before this date's month.
    pub starts_on: NaiveDate,
    pub active: bool,
    /// Due date of the most recently materialized cycle.
    pub last_materialized: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Entity for RecurringRule {
    type Id = RecurringRuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for [`RecurringRule::new`].
#[derive(Debug, Clone)]
pub struct NewRecurringRule {
    pub description: String,
    pub payee: Payee,
    pub category: Category,
    pub expense_type: ExpenseType,
    pub amount: Money,
    pub periodicity: Periodicity,
    pub due_day: u32,
    pub starts_on: NaiveDate,
    pub notes: Option<String>,
}

impl RecurringRule {
    pub fn new(input: NewRecurringRule) -> DomainResult<Self> {
        let rule = Self {
            id: RecurringRuleId::new(),
            description: input.description.trim().to_string(),
            payee: input.payee,
            category: input.category,
            expense_type: input.expense_type,
            amount: input.amount,
            periodicity: input.periodicity,
            due_day: input.due_day,
            starts_on: input.starts_on,
            active: true,
            last_materialized: None,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !(1..=31).contains(&self.due_day) {
            return Err(DomainError::validation(
                "due_day",
                format!("day of month must be between 1 and 31 (got {})", self.due_day),
            ));
        }
        if self.description.is_empty() {
            return Err(DomainError::validation("description", "description is required"));
        }
        if !self.amount.is_positive() {
            return Err(DomainError::validation("amount", "amount must be positive"));
        }
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Record that the cycle due on `due_date` has been issued.
    pub fn mark_materialized(&mut self, due_date: NaiveDate) {
        if self.last_materialized.is_none_or(|last| last < due_date) {
            self.last_materialized = Some(due_date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(due_day: u32) -> NewRecurringRule {
        NewRecurringRule {
            description: "Aluguel sede".to_string(),
            payee: Payee::new("Imobiliária Central", None).unwrap(),
            category: Category::Rent,
            expense_type: ExpenseType::Administrative,
            amount: Money::new(2500, 0),
            periodicity: Periodicity::Monthly,
            due_day,
            starts_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn periodicity_accepts_english_and_portuguese() {
        assert_eq!("mensal".parse::<Periodicity>().unwrap(), Periodicity::Monthly);
        assert_eq!("Quarterly".parse::<Periodicity>().unwrap(), Periodicity::Quarterly);
        assert_eq!("anual".parse::<Periodicity>().unwrap(), Periodicity::Annual);
        assert_eq!(
            "weekly".parse::<Periodicity>().unwrap_err().field(),
            Some("periodicity")
        );
    }

    #[test]
    fn day_of_month_is_validated() {
        assert_eq!(RecurringRule::new(input(0)).unwrap_err().field(), Some("due_day"));
        assert_eq!(RecurringRule::new(input(32)).unwrap_err().field(), Some("due_day"));
        let rule = RecurringRule::new(input(31)).unwrap();
        assert!(rule.active);
        assert_eq!(rule.last_materialized, None);
    }

    #[test]
    fn mark_materialized_never_moves_backwards() {
        let mut rule = RecurringRule::new(input(10)).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let jan = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        rule.mark_materialized(feb);
        rule.mark_materialized(jan);
        assert_eq!(rule.last_materialized, Some(feb));
    }
}
