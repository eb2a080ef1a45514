//! Period balances laid over the chart hierarchy.

use std::collections::BTreeMap;

use serde::Serialize;

use finops_core::{DateRange, DomainError, DomainResult, Money};

use crate::chart::{AccountNode, AccountPlan, AccountType};
use crate::journal::JournalEntry;

/// One account with the balance posted to it and the balance of its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub depth: usize,
    /// Entries posted directly to this account.
    pub own: Money,
    /// `own` plus every descendant.
    pub total: Money,
    pub children: Vec<AccountBalance>,
}

/// The chart as a forest, each node carrying the balances of the entries dated in `range`.
///
/// Every account appears, including those without entries.
pub fn balance_tree<'a>(
    plan: &AccountPlan,
    entries: impl IntoIterator<Item = &'a JournalEntry>,
    range: DateRange,
) -> DomainResult<Vec<AccountBalance>> {
    let mut own: BTreeMap<String, Money> = BTreeMap::new();
    for entry in entries.into_iter().filter(|e| range.contains(e.date)) {
        if !plan.contains(&entry.account_code) {
            return Err(DomainError::invariant(format!(
                "journal entry {} references unknown account {}",
                entry.id, entry.account_code
            )));
        }
        *own.entry(entry.account_code.clone()).or_default() += entry.amount;
    }
    let totals = plan.rollup(&own)?;

    Ok(plan
        .roots()
        .map(|root| subtree(plan, root, &own, &totals))
        .collect())
}

fn subtree(
    plan: &AccountPlan,
    node: &AccountNode,
    own: &BTreeMap<String, Money>,
    totals: &BTreeMap<String, Money>,
) -> AccountBalance {
    AccountBalance {
        code: node.code.clone(),
        name: node.name.clone(),
        account_type: node.account_type,
        depth: plan.depth_of(&node.code).unwrap_or_default(),
        own: own.get(&node.code).copied().unwrap_or_default(),
        total: totals.get(&node.code).copied().unwrap_or_default(),
        children: plan
            .children_of(&node.code)
            .into_iter()
            .map(|child| subtree(plan, child, own, totals))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use finops_core::Period;

    use crate::journal::NewJournalEntry;

    fn entry(plan: &AccountPlan, code: &str, day: u32, cents: i64) -> JournalEntry {
        JournalEntry::manual(
            NewJournalEntry {
                account_code: code.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                amount: Money::from_cents(cents),
                description: "lançamento".to_string(),
                document: None,
            },
            plan,
        )
        .unwrap()
    }

    fn find<'t>(forest: &'t [AccountBalance], code: &str) -> &'t AccountBalance {
        forest
            .iter()
            .find_map(|node| {
                if node.code == code {
                    Some(node)
                } else if code.starts_with(&format!("{}.", node.code)) {
                    Some(find(&node.children, code))
                } else {
                    None
                }
            })
            .unwrap()
    }

    #[test]
    fn subtree_totals_include_descendants() {
        let plan = AccountPlan::default_plan();
        let entries = vec![
            entry(&plan, "5.2.1", 5, 250_000),
            entry(&plan, "5.2.2", 6, 100_000),
            entry(&plan, "5.1.2", 7, 30_000),
            entry(&plan, "3.1.1", 8, 900_000),
        ];
        let march = Period::new(2024, 3).unwrap().range();
        let forest = balance_tree(&plan, &entries, march).unwrap();

        let roots: Vec<_> = forest.iter().map(|n| n.code.as_str()).collect();
        assert_eq!(roots, vec!["3", "4", "5", "6"]);

        let admin = find(&forest, "5.2");
        assert_eq!(admin.depth, 1);
        assert_eq!(admin.own, Money::ZERO);
        assert_eq!(admin.total, Money::new(3500, 0));
        assert_eq!(find(&forest, "5.2.1").own, Money::new(2500, 0));
        assert_eq!(find(&forest, "5").total, Money::new(3800, 0));
        assert_eq!(find(&forest, "3").total, Money::new(9000, 0));
        assert_eq!(find(&forest, "4").total, Money::ZERO);
    }

    #[test]
    fn entries_outside_the_range_are_ignored() {
        let plan = AccountPlan::default_plan();
        let entries = vec![entry(&plan, "5.2.1", 5, 250_000)];
        let april = Period::new(2024, 4).unwrap().range();
        let forest = balance_tree(&plan, &entries, april).unwrap();
        assert!(forest.iter().all(|root| root.total == Money::ZERO));
    }

    #[test]
    fn unknown_account_is_an_invariant_violation() {
        let plan = AccountPlan::default_plan();
        let mut stray = entry(&plan, "5.2.1", 5, 100);
        stray.account_code = "9.9".to_string();
        let march = Period::new(2024, 3).unwrap().range();
        let err = balance_tree(&plan, &[stray], march).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
