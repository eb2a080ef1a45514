use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use finops_accounting::{AccountNode, JournalEntry, chart::default_chart};
use finops_core::{
    Aggregate, AggregateRoot, DateRange, DomainError, ExpectedVersion, InstallmentId, InvoiceId,
    JournalEntryId, ObligationId, RecurringRuleId,
};
use finops_matching::ConfirmationRecord;
use finops_payables::{
    Invoice, InvoiceFilter, Obligation, ObligationCommand, ObligationEvent, ObligationFilter,
    Payment, RecurringRule, RegisterPayment, filter::sort_by_due_date,
};

use super::{LedgerStore, StoreError, UpsertOutcome};

#[derive(Debug, Default)]
struct LedgerState {
    obligations: HashMap<ObligationId, Obligation>,
    journal: BTreeMap<JournalEntryId, JournalEntry>,
    /// Dedupe index: source installment → synchronized entry.
    synchronized: HashMap<InstallmentId, JournalEntryId>,
    accounts: Vec<AccountNode>,
    rules: BTreeMap<RecurringRuleId, RecurringRule>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    /// Uniqueness index: (supplier tax id, series, number) → invoice.
    invoice_keys: HashMap<(String, String, String), InvoiceId>,
    confirmations: Vec<ConfirmationRecord>,
}

/// In-memory Ledger Store.
///
/// Intended for tests/dev and the default binary. Every write takes the single
/// write lock, which serializes payment registration per obligation.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    /// Empty store with no chart of accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store serving the default chart of accounts.
    pub fn with_default_chart() -> Self {
        Self::with_accounts(default_chart())
    }

    pub fn with_accounts(accounts: Vec<AccountNode>) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                accounts,
                ..LedgerState::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn find_obligations(
        &self,
        filter: &ObligationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        let state = self.read()?;
        let mut found: Vec<Obligation> = state
            .obligations
            .values()
            .filter(|ob| filter.matches(ob, today))
            .cloned()
            .collect();
        sort_by_due_date(&mut found);
        Ok(found)
    }

    fn get_obligation(&self, id: ObligationId) -> Result<Obligation, StoreError> {
        self.read()?
            .obligations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("obligation", id))
    }

    fn insert_obligation(&self, obligation: Obligation) -> Result<(), StoreError> {
        let id = obligation.id_typed();
        let mut state = self.write()?;
        if state.obligations.contains_key(&id) {
            return Err(StoreError::Conflict(format!("obligation {id} already exists")));
        }
        state.obligations.insert(id, obligation);
        Ok(())
    }

    fn update_obligation(
        &self,
        obligation: Obligation,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let id = obligation.id_typed();
        let mut state = self.write()?;
        let stored = state
            .obligations
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("obligation", id))?;
        if !expected.matches(stored.version()) {
            return Err(StoreError::Conflict(format!(
                "obligation {id} changed concurrently (expected: {expected:?}, actual: {})",
                stored.version()
            )));
        }
        *stored = obligation;
        Ok(())
    }

    fn insert_payment(&self, command: RegisterPayment) -> Result<Payment, StoreError> {
        let id = command.obligation_id;
        let mut state = self.write()?;
        let stored = state
            .obligations
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("obligation", id))?;

        // Work on a copy so a rejected command leaves the stored record untouched.
        let mut next = stored.clone();
        let events = next.execute(&ObligationCommand::RegisterPayment(command))?;
        let payment = events
            .into_iter()
            .find_map(|e| match e {
                ObligationEvent::PaymentRegistered(p) => Some(p.payment),
                _ => None,
            })
            .ok_or_else(|| StoreError::Conflict(format!("no payment recorded on {id}")))?;

        *stored = next;
        Ok(payment)
    }

    fn list_journal_entries(&self, range: DateRange) -> Result<Vec<JournalEntry>, StoreError> {
        let state = self.read()?;
        let mut entries: Vec<JournalEntry> = state
            .journal
            .values()
            .filter(|e| range.contains(e.date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn insert_journal_entry(&self, entry: JournalEntry) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.journal.contains_key(&entry.id) {
            return Err(StoreError::Conflict(format!(
                "journal entry {} already exists",
                entry.id
            )));
        }
        if let Some(installment) = entry.source_installment() {
            if state.synchronized.contains_key(&installment) {
                return Err(StoreError::Conflict(format!(
                    "installment {installment} is already synchronized"
                )));
            }
            state.synchronized.insert(installment, entry.id);
        }
        state.journal.insert(entry.id, entry);
        Ok(())
    }

    fn upsert_journal_entry(&self, entry: JournalEntry) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.write()?;
        if let Some(installment) = entry.source_installment() {
            if state.synchronized.contains_key(&installment) {
                return Ok(UpsertOutcome::AlreadyPresent);
            }
            state.synchronized.insert(installment, entry.id);
        }
        state.journal.insert(entry.id, entry);
        Ok(UpsertOutcome::Inserted)
    }

    fn get_account_plan(&self) -> Result<Vec<AccountNode>, StoreError> {
        Ok(self.read()?.accounts.clone())
    }

    fn get_recurring_rules(&self) -> Result<Vec<RecurringRule>, StoreError> {
        Ok(self.read()?.rules.values().cloned().collect())
    }

    fn insert_recurring_rule(&self, rule: RecurringRule) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.rules.contains_key(&rule.id) {
            return Err(StoreError::Conflict(format!(
                "recurring rule {} already exists",
                rule.id
            )));
        }
        state.rules.insert(rule.id, rule);
        Ok(())
    }

    fn update_recurring_rule(&self, rule: RecurringRule) -> Result<(), StoreError> {
        let mut state = self.write()?;
        match state.rules.get_mut(&rule.id) {
            Some(stored) => {
                *stored = rule;
                Ok(())
            }
            None => Err(StoreError::not_found("recurring_rule", rule.id)),
        }
    }

    fn insert_invoice(&self, invoice: Invoice, obligation: Obligation) -> Result<(), StoreError> {
        let obligation_id = obligation.id_typed();
        if invoice.obligation_id != obligation_id {
            return Err(DomainError::invariant("invoice and obligation are not linked").into());
        }
        let key = invoice.document_key();
        let mut state = self.write()?;
        if state.invoice_keys.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "invoice {} from {} already ingested",
                invoice.reference(),
                invoice.supplier.name()
            )));
        }
        if state.invoices.contains_key(&invoice.id) || state.obligations.contains_key(&obligation_id) {
            return Err(StoreError::Conflict(format!("invoice {} already exists", invoice.id)));
        }
        state.invoice_keys.insert(key, invoice.id);
        state.obligations.insert(obligation_id, obligation);
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        self.read()?
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("invoice", id))
    }

    fn find_invoices(
        &self,
        filter: &InvoiceFilter,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, StoreError> {
        let state = self.read()?;
        let mut found = Vec::new();
        for invoice in state.invoices.values() {
            let obligation = state
                .obligations
                .get(&invoice.obligation_id)
                .ok_or_else(|| StoreError::not_found("obligation", invoice.obligation_id))?;
            if filter.matches(invoice, obligation.status_on(today)) {
                found.push(invoice.clone());
            }
        }
        found.sort_by(|a, b| a.issue_date.cmp(&b.issue_date).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    fn insert_confirmation(&self, record: ConfirmationRecord) -> Result<(), StoreError> {
        self.write()?.confirmations.push(record);
        Ok(())
    }

    fn list_confirmations(&self) -> Result<Vec<ConfirmationRecord>, StoreError> {
        Ok(self.read()?.confirmations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finops_accounting::EntrySource;
    use finops_core::Money;
    use finops_payables::{
        Category, CreateObligation, ExpenseType, InstallmentPlan, NewInvoice, ObligationStatus,
        Payee, PaymentMethod,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obligation(payee: &str, cents: i64, due: NaiveDate) -> Obligation {
        Obligation::create(CreateObligation {
            obligation_id: ObligationId::new(),
            description: format!("Conta {payee}"),
            payee: Payee::new(payee, None).unwrap(),
            expense_type: ExpenseType::Operational,
            category: Category::Electricity,
            total: Money::from_cents(cents),
            issue_date: d(2024, 1, 1),
            due_date: due,
            notes: None,
            plan: InstallmentPlan::Single,
            source_rule: None,
            source_invoice: None,
        })
        .unwrap()
    }

    fn synced_entry(installment_id: InstallmentId, obligation_id: ObligationId) -> JournalEntry {
        JournalEntry {
            id: JournalEntryId::new(),
            account_code: "5.1.2".to_string(),
            date: d(2024, 1, 31),
            amount: Money::from_cents(30_000),
            description: "Conta Copel (installment 1/1)".to_string(),
            document: None,
            source: Some(EntrySource {
                obligation_id,
                installment_id,
                invoice_id: None,
            }),
        }
    }

    #[test]
    fn find_obligations_orders_by_due_date() {
        let store = InMemoryLedgerStore::new();
        let later = obligation("Sanepar", 10_000, d(2024, 3, 10));
        let earlier = obligation("Copel", 20_000, d(2024, 2, 10));
        store.insert_obligation(later.clone()).unwrap();
        store.insert_obligation(earlier.clone()).unwrap();

        let all = store
            .find_obligations(&ObligationFilter::default(), d(2024, 1, 1))
            .unwrap();
        let ids: Vec<_> = all.iter().map(|o| o.id_typed()).collect();
        assert_eq!(ids, vec![earlier.id_typed(), later.id_typed()]);
    }

    #[test]
    fn rejected_payment_leaves_stored_obligation_untouched() {
        let store = InMemoryLedgerStore::new();
        let ob = obligation("Copel", 30_000, d(2024, 1, 31));
        let id = ob.id_typed();
        store.insert_obligation(ob).unwrap();

        let pay = RegisterPayment::new(id, d(2024, 2, 2), Money::from_cents(30_000), PaymentMethod::Pix);
        store.insert_payment(pay.clone()).unwrap();
        let after_first = store.get_obligation(id).unwrap();

        let err = store
            .insert_payment(RegisterPayment {
                payment_id: finops_core::PaymentId::new(),
                ..pay
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
        assert_eq!(store.get_obligation(id).unwrap(), after_first);
        assert_eq!(after_first.payments().len(), 1);
    }

    #[test]
    fn update_obligation_checks_the_stored_version() {
        let store = InMemoryLedgerStore::new();
        let ob = obligation("Copel", 30_000, d(2024, 1, 31));
        let version = ob.version();
        store.insert_obligation(ob.clone()).unwrap();

        let err = store
            .update_obligation(ob.clone(), ExpectedVersion::Exact(version + 5))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        store
            .update_obligation(ob, ExpectedVersion::Exact(version))
            .unwrap();
    }

    #[test]
    fn upsert_dedupes_by_source_installment() {
        let store = InMemoryLedgerStore::new();
        let ob = obligation("Copel", 30_000, d(2024, 1, 31));
        let installment = ob.installments()[0].id;

        let first = store
            .upsert_journal_entry(synced_entry(installment, ob.id_typed()))
            .unwrap();
        let second = store
            .upsert_journal_entry(synced_entry(installment, ob.id_typed()))
            .unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::AlreadyPresent);

        let january = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert_eq!(store.list_journal_entries(january).unwrap().len(), 1);

        let err = store
            .insert_journal_entry(synced_entry(installment, ob.id_typed()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    fn ingested(number: &str, issued: NaiveDate) -> (Invoice, Obligation) {
        let (invoice, create) = Invoice::ingest(NewInvoice {
            number: number.to_string(),
            series: Some("2".into()),
            supplier: Payee::new("Distribuidora", Some("12345678000190")).unwrap(),
            issue_date: issued,
            due_date: Some(issued + chrono::Days::new(30)),
            total: Money::new(500, 0),
            discount: Money::ZERO,
            net: None,
            access_key: None,
            notes: None,
            items: Vec::new(),
            installments: Vec::new(),
            category: Category::Suppliers,
            expense_type: ExpenseType::Operational,
        })
        .unwrap();
        (invoice, Obligation::create(create).unwrap())
    }

    #[test]
    fn invoice_and_obligation_are_stored_together_once() {
        let store = InMemoryLedgerStore::new();
        let (invoice, obligation) = ingested("981", d(2024, 2, 5));
        store.insert_invoice(invoice.clone(), obligation.clone()).unwrap();
        assert_eq!(store.get_invoice(invoice.id).unwrap(), invoice);
        assert_eq!(
            store.get_obligation(invoice.obligation_id).unwrap().source_invoice(),
            Some(invoice.id)
        );

        // Same supplier, series and number: rejected, and nothing else is written.
        let (again, its_obligation) = ingested("981", d(2024, 2, 6));
        let err = store.insert_invoice(again, its_obligation.clone()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_obligation(its_obligation.id_typed()).is_err());

        let (unlinked, _) = ingested("982", d(2024, 2, 6));
        let err = store.insert_invoice(unlinked, obligation).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn find_invoices_filters_on_the_obligation_status() {
        let store = InMemoryLedgerStore::new();
        let (late, late_ob) = ingested("10", d(2024, 1, 5));
        let (fresh, fresh_ob) = ingested("11", d(2024, 3, 1));
        store.insert_invoice(fresh.clone(), fresh_ob).unwrap();
        store.insert_invoice(late.clone(), late_ob).unwrap();

        let today = d(2024, 3, 10);
        let all = store.find_invoices(&InvoiceFilter::default(), today).unwrap();
        let numbers: Vec<_> = all.iter().map(|i| i.number.as_str()).collect();
        assert_eq!(numbers, vec!["10", "11"]);

        let overdue = InvoiceFilter {
            status: Some(ObligationStatus::Overdue),
            ..InvoiceFilter::default()
        };
        let found = store.find_invoices(&overdue, today).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, late.id);
    }

    #[test]
    fn missing_records_are_not_found() {
        let store = InMemoryLedgerStore::with_default_chart();
        assert!(!store.get_account_plan().unwrap().is_empty());
        assert!(matches!(
            store.get_obligation(ObligationId::new()),
            Err(StoreError::NotFound { entity: "obligation", .. })
        ));
        assert!(matches!(
            store.get_invoice(InvoiceId::new()),
            Err(StoreError::NotFound { entity: "invoice", .. })
        ));
        assert!(store.list_confirmations().unwrap().is_empty());
    }
}
