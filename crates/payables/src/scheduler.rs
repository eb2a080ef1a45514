//! Recurring-obligation scheduler.
//!
//! Stateless over calls: it computes due dates from a rule and a reference date,
//! and builds the obligation for one cycle. Guarding against issuing the same
//! cycle twice is the caller's job (see `RecurringRule::last_materialized`).

use chrono::{Days, NaiveDate};

use finops_core::calendar::{clamped_date, from_month_index, month_index};
use finops_core::{DomainError, DomainResult, ObligationId, Period};

use crate::obligation::{CreateObligation, InstallmentPlan, Obligation};
use crate::recurring::RecurringRule;

/// Due date of cycle `k` (0-based) counted from the rule's anchor month.
fn cycle_due_date(rule: &RecurringRule, k: i64) -> DomainResult<NaiveDate> {
    let anchor = month_index(rule.starts_on);
    let (year, month) = from_month_index(anchor + k * rule.periodicity.step_months());
    clamped_date(year, month, rule.due_day)
}

/// Earliest cycle due date that is on or after `reference`, strictly after the
/// rule's last materialized cycle, and not in a month before the anchor.
pub fn next_due_date(rule: &RecurringRule, reference: NaiveDate) -> DomainResult<NaiveDate> {
    rule.validate()?;

    let step = rule.periodicity.step_months();
    let anchor = month_index(rule.starts_on);
    let floor_month = month_index(reference).max(month_index(
        rule.last_materialized.unwrap_or(reference),
    ));
    let mut k = ((floor_month - anchor).div_euclid(step)).max(0);

    // At most two steps past the first candidate month are ever needed; bound the
    // walk anyway.
    for _ in 0..4 {
        let candidate = cycle_due_date(rule, k)?;
        let after_last = rule.last_materialized.is_none_or(|last| candidate > last);
        if candidate >= reference && after_last {
            return Ok(candidate);
        }
        k += 1;
    }

    Err(DomainError::invariant(format!(
        "no cycle found for rule {} after {reference}",
        rule.id
    )))
}

/// The next `count` due dates starting from `reference`.
pub fn upcoming(rule: &RecurringRule, reference: NaiveDate, count: usize) -> DomainResult<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(count);
    let mut probe = rule.clone();
    for _ in 0..count {
        let due = next_due_date(&probe, reference)?;
        dates.push(due);
        probe.last_materialized = Some(due);
    }
    Ok(dates)
}

/// Build the single-installment obligation for the next cycle of `rule`.
pub fn materialize(rule: &RecurringRule, reference: NaiveDate) -> DomainResult<Obligation> {
    let due_date = next_due_date(rule, reference)?;
    materialize_cycle(rule, reference, due_date)
}

/// Obligation for the cycle due on `due_date`, issued on `issued_on`.
pub fn materialize_cycle(
    rule: &RecurringRule,
    issued_on: NaiveDate,
    due_date: NaiveDate,
) -> DomainResult<Obligation> {
    Obligation::create(CreateObligation {
        obligation_id: ObligationId::new(),
        description: format!("{} ({})", rule.description, Period::containing(due_date)),
        payee: rule.payee.clone(),
        expense_type: rule.expense_type,
        category: rule.category,
        total: rule.amount,
        issue_date: issued_on.min(due_date),
        due_date,
        notes: rule.notes.clone(),
        plan: InstallmentPlan::Single,
        source_rule: Some(rule.id),
        source_invoice: None,
    })
}

/// Due date of the cycle that should be issued now, if any: the rule is active
/// and its next cycle falls due within `lead_days` of `reference`.
pub fn due_cycle(
    rule: &RecurringRule,
    reference: NaiveDate,
    lead_days: u32,
) -> DomainResult<Option<NaiveDate>> {
    if !rule.active {
        return Ok(None);
    }
    let horizon = reference
        .checked_add_days(Days::new(lead_days as u64))
        .unwrap_or(NaiveDate::MAX);
    let next = next_due_date(rule, reference)?;
    Ok((next <= horizon).then_some(next))
}
