use std::sync::Arc;

use chrono::NaiveDate;

use finops_core::Clock;
use finops_payables::{NewRecurringRule, Obligation, RecurringRule, scheduler};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// How many future due dates a rule listing shows.
pub const UPCOMING_PREVIEW: usize = 3;

/// A rule as listed: its derived next due date and a short preview.
#[derive(Debug, Clone)]
pub struct ScheduledRule {
    pub rule: RecurringRule,
    /// `None` for inactive rules.
    pub next_due_date: Option<NaiveDate>,
    pub upcoming: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct MaterializeReport {
    pub created: Vec<Obligation>,
    /// Active rules with no cycle due yet.
    pub not_due: usize,
}

/// Recurring rules and their materialization into obligations.
pub struct RecurringService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    lead_days: u32,
}

impl<S: LedgerStore> RecurringService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, lead_days: u32) -> Self {
        Self {
            store,
            clock,
            lead_days,
        }
    }

    /// Rules ordered by next due date (inactive last), then description.
    pub fn list(&self) -> Result<Vec<ScheduledRule>, ServiceError> {
        let today = self.clock.today();
        let mut listed = self
            .store
            .get_recurring_rules()?
            .into_iter()
            .map(|rule| {
                if !rule.active {
                    return Ok(ScheduledRule {
                        rule,
                        next_due_date: None,
                        upcoming: Vec::new(),
                    });
                }
                let upcoming = scheduler::upcoming(&rule, today, UPCOMING_PREVIEW)?;
                Ok(ScheduledRule {
                    next_due_date: upcoming.first().copied(),
                    upcoming,
                    rule,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        listed.sort_by(|a, b| {
            let key = |r: &ScheduledRule| (r.next_due_date.is_none(), r.next_due_date);
            key(a)
                .cmp(&key(b))
                .then_with(|| a.rule.description.cmp(&b.rule.description))
                .then_with(|| a.rule.id.cmp(&b.rule.id))
        });
        Ok(listed)
    }

    pub fn create(&self, input: NewRecurringRule) -> Result<ScheduledRule, ServiceError> {
        let rule = RecurringRule::new(input)?;
        let upcoming = scheduler::upcoming(&rule, self.clock.today(), UPCOMING_PREVIEW)?;
        self.store.insert_recurring_rule(rule.clone())?;

        tracing::info!(
            rule_id = %rule.id,
            periodicity = rule.periodicity.as_str(),
            due_day = rule.due_day,
            "recurring rule created"
        );
        Ok(ScheduledRule {
            next_due_date: upcoming.first().copied(),
            upcoming,
            rule,
        })
    }

    /// Issue the next cycle of every active rule falling due within the lead window of
    /// `reference` (default today).
    ///
    /// Each rule's `last_materialized` advances after its obligation is stored, so a
    /// repeated run for the same reference date issues nothing new.
    pub fn materialize_due(
        &self,
        reference: Option<NaiveDate>,
    ) -> Result<MaterializeReport, ServiceError> {
        let reference = reference.unwrap_or_else(|| self.clock.today());
        let mut report = MaterializeReport::default();

        for mut rule in self.store.get_recurring_rules()? {
            if !rule.active {
                continue;
            }
            let Some(due_date) = scheduler::due_cycle(&rule, reference, self.lead_days)? else {
                report.not_due += 1;
                continue;
            };

            let obligation = scheduler::materialize_cycle(&rule, reference, due_date)?;
            self.store.insert_obligation(obligation.clone())?;
            rule.mark_materialized(due_date);
            self.store.update_recurring_rule(rule.clone())?;

            tracing::info!(
                rule_id = %rule.id,
                obligation_id = %obligation.id_typed(),
                %due_date,
                "recurring cycle materialized"
            );
            report.created.push(obligation);
        }

        tracing::debug!(
            %reference,
            created = report.created.len(),
            not_due = report.not_due,
            "recurring materialization finished"
        );
        Ok(report)
    }
}
