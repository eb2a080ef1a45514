use std::collections::HashSet;
use std::sync::Arc;

use finops_accounting::{
    AccountBalance, AccountNode, AccountPlan, IncomeStatement, JournalEntry, NewJournalEntry,
    SyncReport, SyncSettings, balances, statement, sync,
};
use finops_core::{Clock, DateRange, InstallmentId, Period};
use finops_payables::ObligationFilter;

use crate::error::ServiceError;
use crate::store::{LedgerStore, UpsertOutcome};

/// Income statements, the chart of accounts, and obligation → ledger synchronization.
pub struct StatementService<S> {
    store: S,
    settings: SyncSettings,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> StatementService<S> {
    pub fn new(store: S, settings: SyncSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The chart of accounts as a tree.
    pub fn plan(&self) -> Result<AccountPlan, ServiceError> {
        Ok(AccountPlan::new(self.store.get_account_plan()?)?)
    }

    /// Flat chart of accounts, ordered by code.
    pub fn accounts(&self) -> Result<Vec<AccountNode>, ServiceError> {
        Ok(self.plan()?.nodes().to_vec())
    }

    pub fn generate(&self, year: i32, month: u32) -> Result<IncomeStatement, ServiceError> {
        let period = Period::new(year, month)?;
        let plan = self.plan()?;
        let entries = self.store.list_journal_entries(period.range())?;
        Ok(statement::generate(&plan, &entries, period)?)
    }

    /// The chart as a tree carrying the period's balances, subtotals rolled up.
    pub fn balances(&self, year: i32, month: u32) -> Result<Vec<AccountBalance>, ServiceError> {
        let period = Period::new(year, month)?;
        let plan = self.plan()?;
        let entries = self.store.list_journal_entries(period.range())?;
        Ok(balances::balance_tree(&plan, &entries, period.range())?)
    }

    /// Twelve statements for `year`, January first.
    pub fn comparative(&self, year: i32) -> Result<Vec<IncomeStatement>, ServiceError> {
        let january = Period::new(year, 1)?;
        let december = Period::new(year, 12)?;
        let plan = self.plan()?;
        let entries = self
            .store
            .list_journal_entries(DateRange::new(january.first_day(), december.last_day())?)?;
        Ok(statement::comparative(&plan, &entries, year)?)
    }

    /// Post a journal entry for every paid installment of the period that has none yet.
    ///
    /// Safe to re-run after a partial failure: entries are deduplicated by source
    /// installment at the store.
    pub fn synchronize(&self, year: i32, month: u32) -> Result<SyncReport, ServiceError> {
        let period = Period::new(year, month)?;
        let plan = self.plan()?;
        self.settings.accounts.validate(&plan)?;

        let synchronized: HashSet<InstallmentId> = self
            .store
            .list_journal_entries(period.range())?
            .iter()
            .filter_map(JournalEntry::source_installment)
            .collect();
        let obligations = self
            .store
            .find_obligations(&ObligationFilter::default(), self.clock.today())?;

        let batch = sync::plan_sync(&obligations, &synchronized, period, &self.settings);

        let mut report = SyncReport {
            created: 0,
            already_synchronized: batch.already_synchronized,
            unmapped: batch.unmapped,
        };
        for entry in batch.entries {
            match self.store.upsert_journal_entry(entry)? {
                UpsertOutcome::Inserted => report.created += 1,
                UpsertOutcome::AlreadyPresent => report.already_synchronized += 1,
            }
        }

        for unmapped in &report.unmapped {
            tracing::warn!(
                obligation_id = %unmapped.obligation_id,
                installment_id = %unmapped.installment_id,
                category = unmapped.category.slug(),
                "no ledger account mapped for category"
            );
        }
        tracing::info!(
            period = %period,
            created = report.created,
            already_synchronized = report.already_synchronized,
            unmapped = report.unmapped.len(),
            "ledger synchronized"
        );
        Ok(report)
    }

    /// Post a manual entry against an existing account.
    pub fn post_entry(&self, input: NewJournalEntry) -> Result<JournalEntry, ServiceError> {
        let plan = self.plan()?;
        let entry = JournalEntry::manual(input, &plan)?;
        self.store.insert_journal_entry(entry.clone())?;

        tracing::info!(
            entry_id = %entry.id,
            account = %entry.account_code,
            amount = %entry.amount,
            "journal entry posted"
        );
        Ok(entry)
    }
}
