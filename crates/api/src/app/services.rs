//! Service wiring: one in-memory Ledger Store shared by every application service.

use std::sync::Arc;

use chrono::NaiveDate;

use finops_core::{Clock, SystemClock};
use finops_infra::services::{
    InvoiceService, PayablesService, ReconciliationService, RecurringService, StatementService,
};
use finops_infra::{AppConfig, InMemoryLedgerStore, ServiceError};
use finops_matching::MatchingEngine;

pub type Store = Arc<InMemoryLedgerStore>;

pub struct AppServices {
    pub payables: PayablesService<Store>,
    pub invoices: InvoiceService<Store>,
    pub recurring: RecurringService<Store>,
    pub reconciliation: ReconciliationService<Store>,
    pub statements: StatementService<Store>,
    clock: Arc<dyn Clock>,
}

impl AppServices {
    /// Wire services over a fresh store serving the default chart of accounts.
    pub fn in_memory(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, ServiceError> {
        Self::with_store(Arc::new(InMemoryLedgerStore::with_default_chart()), config, clock)
    }

    pub fn with_store(
        store: Store,
        config: &AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        let engine = MatchingEngine::new(config.matching.clone())?;
        let statements = StatementService::new(store.clone(), config.sync.clone(), clock.clone());

        // A mapping onto accounts the chart does not have would only fail at sync time.
        statements.settings().accounts.validate(&statements.plan()?)?;

        Ok(Self {
            payables: PayablesService::new(store.clone(), clock.clone()),
            invoices: InvoiceService::new(store.clone(), clock.clone()),
            recurring: RecurringService::new(store.clone(), clock.clone(), config.recurring_lead_days),
            reconciliation: ReconciliationService::new(store, engine, clock.clone()),
            statements,
            clock,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

pub fn build_services(config: &AppConfig) -> Result<AppServices, ServiceError> {
    tracing::info!(
        ledger_date_policy = %config.sync.date_policy,
        confirm_threshold = config.matching.confirm_threshold,
        recurring_lead_days = config.recurring_lead_days,
        "wiring in-memory ledger store"
    );
    AppServices::in_memory(config, Arc::new(SystemClock))
}
