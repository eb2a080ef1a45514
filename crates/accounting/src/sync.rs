//! Obligation → ledger synchronization.
//!
//! Every paid installment becomes one journal entry against the account its
//! obligation's category maps to. The installment id is the dedupe key, so running
//! the same period twice yields the same entries.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finops_core::{DomainError, DomainResult, InstallmentId, JournalEntryId, ObligationId, Period};
use finops_payables::{Category, Installment, Lifecycle, Obligation};

use crate::chart::AccountPlan;
use crate::journal::{EntrySource, JournalEntry};

/// Which installment date a synchronized entry is posted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerDatePolicy {
    #[default]
    DueDate,
    /// Falls back to the due date when the payment date is missing.
    PaymentDate,
}

impl LedgerDatePolicy {
    pub fn date_of(self, installment: &Installment) -> NaiveDate {
        match self {
            LedgerDatePolicy::DueDate => installment.due_date,
            LedgerDatePolicy::PaymentDate => installment.payment_date.unwrap_or(installment.due_date),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerDatePolicy::DueDate => "due_date",
            LedgerDatePolicy::PaymentDate => "payment_date",
        }
    }
}

impl core::fmt::Display for LedgerDatePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LedgerDatePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "due_date" | "vencimento" => Ok(LedgerDatePolicy::DueDate),
            "payment_date" | "pagamento" => Ok(LedgerDatePolicy::PaymentDate),
            other => Err(DomainError::validation(
                "ledger_date_policy",
                format!("unknown date policy {other:?} (expected due_date or payment_date)"),
            )),
        }
    }
}

/// Category → account code, with an optional catch-all account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAccountMap {
    accounts: BTreeMap<Category, String>,
    fallback: Option<String>,
}

impl Default for CategoryAccountMap {
    fn default() -> Self {
        Self::default_mapping()
    }
}

impl CategoryAccountMap {
    pub fn new(accounts: BTreeMap<Category, String>, fallback: Option<String>) -> Self {
        Self { accounts, fallback }
    }

    /// Mapping onto the default chart.
    pub fn default_mapping() -> Self {
        let pairs = [
            (Category::Water, "5.1.1"),
            (Category::Electricity, "5.1.2"),
            (Category::Internet, "5.1.3"),
            (Category::Telephone, "5.1.4"),
            (Category::Maintenance, "5.1.5"),
            (Category::Transport, "5.1.6"),
            (Category::Suppliers, "5.1.7"),
            (Category::Rent, "5.2.1"),
            (Category::Payroll, "5.2.2"),
            (Category::OfficeSupplies, "5.2.3"),
            (Category::AccountingServices, "5.2.4"),
            (Category::Insurance, "5.2.5"),
            (Category::Taxes, "5.2.6"),
            (Category::Marketing, "5.3.1"),
            (Category::BankFees, "5.4.1"),
            (Category::Other, "5.5.1"),
        ];
        Self {
            accounts: pairs
                .into_iter()
                .map(|(category, code)| (category, code.to_string()))
                .collect(),
            fallback: None,
        }
    }

    pub fn with_account(mut self, category: Category, code: impl Into<String>) -> Self {
        self.accounts.insert(category, code.into());
        self
    }

    pub fn without_account(mut self, category: Category) -> Self {
        self.accounts.remove(&category);
        self
    }

    pub fn with_fallback(mut self, code: Option<String>) -> Self {
        self.fallback = code;
        self
    }

    pub fn account_for(&self, category: Category) -> Option<&str> {
        self.accounts
            .get(&category)
            .or(self.fallback.as_ref())
            .map(String::as_str)
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.accounts.iter().map(|(c, code)| (*c, code.as_str()))
    }

    /// Every mapped code (fallback included) must exist in `plan`.
    pub fn validate(&self, plan: &AccountPlan) -> DomainResult<()> {
        let unknown: Vec<&str> = self
            .accounts
            .values()
            .chain(self.fallback.iter())
            .map(String::as_str)
            .filter(|code| !plan.contains(code))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(
                "category_accounts",
                format!("unknown account codes: {}", unknown.join(", ")),
            ))
        }
    }
}

/// A paid installment that could not be posted for lack of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedInstallment {
    pub obligation_id: ObligationId,
    pub installment_id: InstallmentId,
    pub category: Category,
}

/// Entries to write for one period, before deduplication at the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncBatch {
    pub entries: Vec<JournalEntry>,
    pub already_synchronized: usize,
    pub unmapped: Vec<UnmappedInstallment>,
}

/// Outcome of a synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub already_synchronized: usize,
    pub unmapped: Vec<UnmappedInstallment>,
}

/// Settings for [`plan_sync`].
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub accounts: CategoryAccountMap,
    pub date_policy: LedgerDatePolicy,
}

fn entry_for(obligation: &Obligation, installment: &Installment, account_code: &str, date: NaiveDate) -> JournalEntry {
    JournalEntry {
        id: JournalEntryId::new(),
        account_code: account_code.to_string(),
        date,
        amount: installment.paid_amount.unwrap_or(installment.amount),
        description: format!(
            "{} (installment {}/{})",
            obligation.description(),
            installment.number,
            obligation.installments().len()
        ),
        document: Some(match obligation.source_invoice() {
            Some(invoice_id) => invoice_id.to_string(),
            None => obligation.id_typed().to_string(),
        }),
        source: Some(EntrySource {
            obligation_id: obligation.id_typed(),
            installment_id: installment.id,
            invoice_id: obligation.source_invoice(),
        }),
    }
}

/// Build the entries for paid installments dated (per the policy) inside `period`.
///
/// Installments listed in `synchronized` are counted and skipped. Cancelled
/// obligations are skipped entirely.
pub fn plan_sync<'a>(
    obligations: impl IntoIterator<Item = &'a Obligation>,
    synchronized: &HashSet<InstallmentId>,
    period: Period,
    settings: &SyncSettings,
) -> SyncBatch {
    let range = period.range();
    let mut batch = SyncBatch::default();

    for obligation in obligations {
        if obligation.lifecycle() == Lifecycle::Cancelled {
            continue;
        }
        for installment in obligation.installments().iter().filter(|i| i.is_paid()) {
            let date = settings.date_policy.date_of(installment);
            if !range.contains(date) {
                continue;
            }
            if synchronized.contains(&installment.id) {
                batch.already_synchronized += 1;
                continue;
            }
            match settings.accounts.account_for(obligation.category()) {
                Some(code) => batch.entries.push(entry_for(obligation, installment, code, date)),
                None => batch.unmapped.push(UnmappedInstallment {
                    obligation_id: obligation.id_typed(),
                    installment_id: installment.id,
                    category: obligation.category(),
                }),
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use finops_core::{Aggregate, InvoiceId, Money};
    use finops_payables::{
        CreateObligation, ExpenseType, InstallmentPlan, ObligationCommand, Payee, PaymentMethod,
        RegisterPayment,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn paid_obligation(category: Category, due: NaiveDate, paid_on: NaiveDate, count: u32) -> Obligation {
        let mut ob = Obligation::create(CreateObligation {
            obligation_id: ObligationId::new(),
            description: "Aluguel".into(),
            payee: Payee::new("Imobiliária", None).unwrap(),
            expense_type: ExpenseType::Administrative,
            category,
            total: Money::new(300, 0),
            issue_date: d(2024, 1, 1),
            due_date: due,
            notes: None,
            plan: InstallmentPlan::Equal { count },
            source_rule: None,
            source_invoice: None,
        })
        .unwrap();
        let first = ob.installments()[0].clone();
        let mut cmd = RegisterPayment::new(ob.id_typed(), paid_on, first.amount + Money::new(5, 0), PaymentMethod::Pix);
        cmd.installment_id = Some(first.id);
        cmd.fine = Money::new(5, 0);
        ob.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap();
        ob
    }

    fn march() -> Period {
        Period::new(2024, 3).unwrap()
    }

    #[test]
    fn paid_installments_in_period_become_entries() {
        let ob = paid_obligation(Category::Rent, d(2024, 3, 10), d(2024, 3, 12), 3);
        let batch = plan_sync([&ob], &HashSet::new(), march(), &SyncSettings::default());

        assert_eq!(batch.entries.len(), 1);
        let entry = &batch.entries[0];
        assert_eq!(entry.account_code, "5.2.1");
        assert_eq!(entry.date, d(2024, 3, 10));
        assert_eq!(entry.amount, Money::new(105, 0));
        assert_eq!(entry.description, "Aluguel (installment 1/3)");
        assert_eq!(entry.document.as_deref(), Some(ob.id_typed().to_string().as_str()));
        assert_eq!(entry.source_installment(), Some(ob.installments()[0].id));
    }

    #[test]
    fn invoice_obligations_post_under_the_invoice_reference() {
        let invoice_id = InvoiceId::new();
        let mut ob = Obligation::create(CreateObligation {
            obligation_id: ObligationId::new(),
            description: "NF 1234/1 (Distribuidora)".into(),
            payee: Payee::new("Distribuidora", Some("12345678000190")).unwrap(),
            expense_type: ExpenseType::Operational,
            category: Category::Suppliers,
            total: Money::new(950, 0),
            issue_date: d(2024, 3, 1),
            due_date: d(2024, 3, 20),
            notes: None,
            plan: InstallmentPlan::Single,
            source_rule: None,
            source_invoice: Some(invoice_id),
        })
        .unwrap();
        let pay = RegisterPayment::new(ob.id_typed(), d(2024, 3, 20), Money::new(950, 0), PaymentMethod::BankSlip);
        ob.execute(&ObligationCommand::RegisterPayment(pay)).unwrap();

        let batch = plan_sync([&ob], &HashSet::new(), march(), &SyncSettings::default());
        let entry = &batch.entries[0];
        assert_eq!(entry.account_code, "5.1.7");
        assert_eq!(entry.document, Some(invoice_id.to_string()));
        assert_eq!(entry.source.and_then(|s| s.invoice_id), Some(invoice_id));
    }

    #[test]
    fn payment_date_policy_moves_entries_between_periods() {
        let ob = paid_obligation(Category::Rent, d(2024, 2, 28), d(2024, 3, 2), 1);
        let by_due = plan_sync([&ob], &HashSet::new(), march(), &SyncSettings::default());
        assert!(by_due.entries.is_empty());

        let settings = SyncSettings {
            date_policy: LedgerDatePolicy::PaymentDate,
            ..Default::default()
        };
        let by_payment = plan_sync([&ob], &HashSet::new(), march(), &settings);
        assert_eq!(by_payment.entries.len(), 1);
        assert_eq!(by_payment.entries[0].date, d(2024, 3, 2));
    }

    #[test]
    fn already_synchronized_installments_are_skipped() {
        let ob = paid_obligation(Category::Water, d(2024, 3, 10), d(2024, 3, 10), 1);
        let done: HashSet<_> = [ob.installments()[0].id].into_iter().collect();
        let batch = plan_sync([&ob], &done, march(), &SyncSettings::default());
        assert!(batch.entries.is_empty());
        assert_eq!(batch.already_synchronized, 1);
    }

    #[test]
    fn unmapped_categories_are_reported_not_failed() {
        let ob = paid_obligation(Category::Marketing, d(2024, 3, 10), d(2024, 3, 10), 1);
        let settings = SyncSettings {
            accounts: CategoryAccountMap::default_mapping().without_account(Category::Marketing),
            ..Default::default()
        };
        let batch = plan_sync([&ob], &HashSet::new(), march(), &settings);
        assert!(batch.entries.is_empty());
        assert_eq!(batch.unmapped.len(), 1);
        assert_eq!(batch.unmapped[0].category, Category::Marketing);

        let settings = SyncSettings {
            accounts: settings.accounts.with_fallback(Some("5.5.1".into())),
            ..Default::default()
        };
        let batch = plan_sync([&ob], &HashSet::new(), march(), &settings);
        assert_eq!(batch.entries[0].account_code, "5.5.1");
    }

    #[test]
    fn default_mapping_covers_every_category_and_the_default_chart() {
        let mapping = CategoryAccountMap::default_mapping();
        for category in Category::ALL {
            assert!(mapping.account_for(category).is_some(), "{category} unmapped");
        }
        mapping.validate(&AccountPlan::default_plan()).unwrap();

        let broken = mapping.with_account(Category::Rent, "9.9.9");
        assert_eq!(
            broken.validate(&AccountPlan::default_plan()).unwrap_err().field(),
            Some("category_accounts")
        );
    }

    #[test]
    fn date_policy_parses() {
        assert_eq!("payment_date".parse::<LedgerDatePolicy>().unwrap(), LedgerDatePolicy::PaymentDate);
        assert!("whenever".parse::<LedgerDatePolicy>().is_err());
    }
}
