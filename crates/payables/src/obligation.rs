use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finops_core::calendar::shift_months;
use finops_core::{
    Aggregate, AggregateRoot, DomainError, DomainEvent, Entity, ExpectedVersion, InstallmentId,
    InvoiceId, Money, ObligationId, PaymentId, RecurringRuleId,
};

use crate::category::{Category, ExpenseType};
use crate::payee::Payee;

/// Longest installment plan accepted (30 years of monthly installments).
pub const MAX_INSTALLMENTS: u32 = 360;

/// Persisted lifecycle. "Overdue" is never stored; see [`Obligation::status_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Pending,
    Paid,
    Cancelled,
}

/// Status as presented to callers: the persisted lifecycle plus the derived
/// overdue view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObligationStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl core::str::FromStr for ObligationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendente" => Ok(Self::Pending),
            "paid" | "pago" => Ok(Self::Paid),
            "overdue" | "vencido" => Ok(Self::Overdue),
            "cancelled" | "canceled" | "cancelado" => Ok(Self::Cancelled),
            other => Err(DomainError::validation("status", format!("unknown status {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    WireTransfer,
    BankSlip,
    Card,
    Cash,
    Check,
}

impl core::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pix" => Ok(Self::Pix),
            "wire_transfer" | "transfer" | "transferencia" | "transferência" | "ted" | "doc" => {
                Ok(Self::WireTransfer)
            }
            "bank_slip" | "boleto" => Ok(Self::BankSlip),
            "card" | "cartao" | "cartão" => Ok(Self::Card),
            "cash" | "dinheiro" => Ok(Self::Cash),
            "check" | "cheque" => Ok(Self::Check),
            other => Err(DomainError::validation(
                "payment_method",
                format!("unknown payment method {other:?}"),
            )),
        }
    }
}

/// One scheduled partial payment of an obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    /// 1-based position within the obligation.
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub status: InstallmentStatus,
    pub payment_date: Option<NaiveDate>,
    pub paid_amount: Option<Money>,
    pub interest: Money,
    pub fine: Money,
    pub discount: Money,
}

impl Entity for Installment {
    type Id = InstallmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Installment {
    fn pending(number: u32, due_date: NaiveDate, amount: Money) -> Self {
        Self {
            id: InstallmentId::new(),
            number,
            due_date,
            amount,
            status: InstallmentStatus::Pending,
            payment_date: None,
            paid_amount: None,
            interest: Money::ZERO,
            fine: Money::ZERO,
            discount: Money::ZERO,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    /// Unpaid and past due on `today`.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        !self.is_paid() && self.due_date < today
    }
}

/// An append-only payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// Set when the payment targeted a single installment.
    pub installment_id: Option<InstallmentId>,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A requested installment (explicit plans).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentDraft {
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// How the total is parcelled out at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallmentPlan {
    /// One installment for the whole amount on the due date.
    #[default]
    Single,
    /// `count` monthly installments starting at the due date; rounding residue on the last.
    Equal { count: u32 },
    /// Caller-specified installments; amounts must sum exactly to the total.
    Explicit { installments: Vec<InstallmentDraft> },
}

/// Aggregate root: an accounts-payable obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obligation {
    id: ObligationId,
    description: String,
    payee: Option<Payee>,
    expense_type: ExpenseType,
    category: Category,
    total: Money,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    lifecycle: Lifecycle,
    notes: Option<String>,
    installments: Vec<Installment>,
    payments: Vec<Payment>,
    source_rule: Option<RecurringRuleId>,
    source_invoice: Option<InvoiceId>,
    version: u64,
    created: bool,
}

impl Obligation {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ObligationId) -> Self {
        Self {
            id,
            description: String::new(),
            payee: None,
            expense_type: ExpenseType::Operational,
            category: Category::Other,
            total: Money::ZERO,
            issue_date: NaiveDate::MIN,
            due_date: NaiveDate::MIN,
            lifecycle: Lifecycle::Pending,
            notes: None,
            installments: Vec::new(),
            payments: Vec::new(),
            source_rule: None,
            source_invoice: None,
            version: 0,
            created: false,
        }
    }

    /// Build a new obligation from a creation command.
    pub fn create(cmd: CreateObligation) -> Result<Self, DomainError> {
        let mut obligation = Obligation::empty(cmd.obligation_id);
        obligation.execute(&ObligationCommand::Create(cmd))?;
        Ok(obligation)
    }

    pub fn id_typed(&self) -> ObligationId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn payee(&self) -> Option<&Payee> {
        self.payee.as_ref()
    }

    pub fn payee_name(&self) -> &str {
        self.payee.as_ref().map(Payee::name).unwrap_or_default()
    }

    pub fn expense_type(&self) -> ExpenseType {
        self.expense_type
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn source_rule(&self) -> Option<RecurringRuleId> {
        self.source_rule
    }

    pub fn source_invoice(&self) -> Option<InvoiceId> {
        self.source_invoice
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_pending(&self) -> bool {
        self.lifecycle == Lifecycle::Pending
    }

    /// Sum of installments not yet paid.
    pub fn outstanding(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| !i.is_paid())
            .map(|i| i.amount)
            .sum()
    }

    /// Sum of registered payments.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Earliest unpaid installment, if any.
    pub fn next_installment(&self) -> Option<&Installment> {
        self.installments
            .iter()
            .filter(|i| !i.is_paid())
            .min_by_key(|i| (i.due_date, i.number))
    }

    /// Due date that currently governs the obligation: the earliest unpaid
    /// installment, or the obligation's own due date once nothing is unpaid.
    pub fn effective_due_date(&self) -> NaiveDate {
        self.next_installment()
            .map(|i| i.due_date)
            .unwrap_or(self.due_date)
    }

    /// Derived status: overdue ⇔ pending and the governing due date is before `today`.
    pub fn status_on(&self, today: NaiveDate) -> ObligationStatus {
        match self.lifecycle {
            Lifecycle::Paid => ObligationStatus::Paid,
            Lifecycle::Cancelled => ObligationStatus::Cancelled,
            Lifecycle::Pending if self.effective_due_date() < today => ObligationStatus::Overdue,
            Lifecycle::Pending => ObligationStatus::Pending,
        }
    }

    pub fn installment(&self, id: InstallmentId) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == id)
    }
}

impl AggregateRoot for Obligation {
    type Id = ObligationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateObligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateObligation {
    pub obligation_id: ObligationId,
    pub description: String,
    pub payee: Payee,
    pub expense_type: ExpenseType,
    pub category: Category,
    pub total: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub plan: InstallmentPlan,
    pub source_rule: Option<RecurringRuleId>,
    /// Invoice document this obligation was ingested from.
    pub source_invoice: Option<InvoiceId>,
}

/// Command: RegisterPayment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPayment {
    pub obligation_id: ObligationId,
    /// Pay a single installment; `None` settles unpaid installments in order, as far
    /// as the amount covers them.
    pub installment_id: Option<InstallmentId>,
    pub payment_id: PaymentId,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub interest: Money,
    pub fine: Money,
    pub discount: Money,
    pub expected_version: ExpectedVersion,
}

impl RegisterPayment {
    /// Payment of `amount` with no surcharges and no version expectation.
    pub fn new(
        obligation_id: ObligationId,
        payment_date: NaiveDate,
        amount: Money,
        method: PaymentMethod,
    ) -> Self {
        Self {
            obligation_id,
            installment_id: None,
            payment_id: PaymentId::new(),
            payment_date,
            amount,
            method,
            notes: None,
            interest: Money::ZERO,
            fine: Money::ZERO,
            discount: Money::ZERO,
            expected_version: ExpectedVersion::Any,
        }
    }
}

/// Command: CancelObligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelObligation {
    pub obligation_id: ObligationId,
    pub reason: Option<String>,
    pub cancelled_on: NaiveDate,
    pub expected_version: ExpectedVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObligationCommand {
    Create(CreateObligation),
    RegisterPayment(RegisterPayment),
    Cancel(CancelObligation),
}

/// Event: ObligationCreated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationCreated {
    pub obligation_id: ObligationId,
    pub description: String,
    pub payee: Payee,
    pub expense_type: ExpenseType,
    pub category: Category,
    pub total: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub installments: Vec<Installment>,
    pub source_rule: Option<RecurringRuleId>,
    pub source_invoice: Option<InvoiceId>,
}

/// How much of a payment landed on one installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledInstallment {
    pub installment_id: InstallmentId,
    pub paid_amount: Money,
    pub interest: Money,
    pub fine: Money,
    pub discount: Money,
}

/// Event: PaymentRegistered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRegistered {
    pub obligation_id: ObligationId,
    pub payment: Payment,
    pub settled: Vec<SettledInstallment>,
    /// True when no unpaid installment remains.
    pub obligation_settled: bool,
}

/// Event: ObligationCancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationCancelled {
    pub obligation_id: ObligationId,
    pub reason: Option<String>,
    pub cancelled_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObligationEvent {
    Created(ObligationCreated),
    PaymentRegistered(PaymentRegistered),
    Cancelled(ObligationCancelled),
}

impl DomainEvent for ObligationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ObligationEvent::Created(_) => "payables.obligation.created",
            ObligationEvent::PaymentRegistered(_) => "payables.obligation.payment_registered",
            ObligationEvent::Cancelled(_) => "payables.obligation.cancelled",
        }
    }
}

impl Aggregate for Obligation {
    type Command = ObligationCommand;
    type Event = ObligationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ObligationEvent::Created(e) => {
                self.id = e.obligation_id;
                self.description = e.description.clone();
                self.payee = Some(e.payee.clone());
                self.expense_type = e.expense_type;
                self.category = e.category;
                self.total = e.total;
                self.issue_date = e.issue_date;
                self.due_date = e.due_date;
                self.notes = e.notes.clone();
                self.installments = e.installments.clone();
                self.payments = Vec::new();
                self.source_rule = e.source_rule;
                self.source_invoice = e.source_invoice;
                self.lifecycle = Lifecycle::Pending;
                self.created = true;
            }
            ObligationEvent::PaymentRegistered(e) => {
                for settled in &e.settled {
                    if let Some(inst) = self
                        .installments
                        .iter_mut()
                        .find(|i| i.id == settled.installment_id)
                    {
                        inst.status = InstallmentStatus::Paid;
                        inst.payment_date = Some(e.payment.payment_date);
                        inst.paid_amount = Some(settled.paid_amount);
                        inst.interest = settled.interest;
                        inst.fine = settled.fine;
                        inst.discount = settled.discount;
                    }
                }
                self.payments.push(e.payment.clone());
                if e.obligation_settled {
                    self.lifecycle = Lifecycle::Paid;
                }
            }
            ObligationEvent::Cancelled(_) => {
                self.lifecycle = Lifecycle::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ObligationCommand::Create(cmd) => self.handle_create(cmd),
            ObligationCommand::RegisterPayment(cmd) => self.handle_register_payment(cmd),
            ObligationCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Obligation {
    fn ensure_obligation_id(&self, obligation_id: ObligationId) -> Result<(), DomainError> {
        if self.id != obligation_id {
            return Err(DomainError::invariant("obligation_id mismatch"));
        }
        Ok(())
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("obligation", self.id));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateObligation) -> Result<Vec<ObligationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("obligation already exists"));
        }
        self.ensure_obligation_id(cmd.obligation_id)?;

        let description = cmd.description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("description", "description is required"));
        }
        if !cmd.total.is_positive() {
            return Err(DomainError::validation("total_amount", "total amount must be positive"));
        }
        if cmd.due_date < cmd.issue_date {
            return Err(DomainError::validation(
                "due_date",
                "due date cannot precede the issue date",
            ));
        }

        let installments = build_installments(cmd)?;

        Ok(vec![ObligationEvent::Created(ObligationCreated {
            obligation_id: cmd.obligation_id,
            description: description.to_string(),
            payee: cmd.payee.clone(),
            expense_type: cmd.expense_type,
            category: cmd.category,
            total: cmd.total,
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            notes: cmd.notes.clone().filter(|n| !n.trim().is_empty()),
            installments,
            source_rule: cmd.source_rule,
            source_invoice: cmd.source_invoice,
        })])
    }

    fn handle_register_payment(
        &self,
        cmd: &RegisterPayment,
    ) -> Result<Vec<ObligationEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_obligation_id(cmd.obligation_id)?;

        match self.lifecycle {
            Lifecycle::Paid => return Err(DomainError::conflict("obligation is already paid")),
            Lifecycle::Cancelled => return Err(DomainError::conflict("obligation is cancelled")),
            Lifecycle::Pending => {}
        }
        cmd.expected_version.check(self.version)?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("amount", "paid amount must be positive"));
        }
        for (field, value) in [
            ("interest", cmd.interest),
            ("fine", cmd.fine),
            ("discount", cmd.discount),
        ] {
            if value.is_negative() {
                return Err(DomainError::validation(field, "cannot be negative"));
            }
        }

        let targets: Vec<&Installment> = match cmd.installment_id {
            Some(installment_id) => {
                let inst = self
                    .installment(installment_id)
                    .ok_or_else(|| DomainError::not_found("installment", installment_id))?;
                if inst.is_paid() {
                    return Err(DomainError::conflict(format!(
                        "installment {} is already paid",
                        inst.number
                    )));
                }
                vec![inst]
            }
            None => {
                let mut unpaid: Vec<&Installment> =
                    self.installments.iter().filter(|i| !i.is_paid()).collect();
                unpaid.sort_by_key(|i| i.number);
                unpaid
            }
        };
        if targets.is_empty() {
            return Err(DomainError::conflict("obligation has no unpaid installment"));
        }

        let settled = allocate_payment(&targets, cmd)?;

        let still_unpaid = self
            .installments
            .iter()
            .filter(|i| !i.is_paid())
            .filter(|i| !settled.iter().any(|s| s.installment_id == i.id))
            .count();

        Ok(vec![ObligationEvent::PaymentRegistered(PaymentRegistered {
            obligation_id: cmd.obligation_id,
            payment: Payment {
                id: cmd.payment_id,
                installment_id: cmd.installment_id,
                payment_date: cmd.payment_date,
                amount: cmd.amount,
                method: cmd.method,
                notes: cmd.notes.clone().filter(|n| !n.trim().is_empty()),
            },
            settled,
            obligation_settled: still_unpaid == 0,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelObligation) -> Result<Vec<ObligationEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_obligation_id(cmd.obligation_id)?;
        if self.lifecycle == Lifecycle::Cancelled {
            return Err(DomainError::conflict("obligation is already cancelled"));
        }
        cmd.expected_version.check(self.version)?;

        Ok(vec![ObligationEvent::Cancelled(ObligationCancelled {
            obligation_id: cmd.obligation_id,
            reason: cmd.reason.clone(),
            cancelled_on: cmd.cancelled_on,
        })])
    }
}

/// Spread a payment over `targets` (unpaid, in installment order).
///
/// A payment aimed at one installment settles it whatever the amount. Otherwise
/// installments are settled in order while the payment, net of surcharges and
/// discount, covers their face value; a payment that covers none is rejected. The
/// last settled installment takes the surcharges, the discount and any excess.
fn allocate_payment(
    targets: &[&Installment],
    cmd: &RegisterPayment,
) -> Result<Vec<SettledInstallment>, DomainError> {
    let overflow = || DomainError::validation("amount", "payment amounts overflow");

    let covered: Vec<&Installment> = if cmd.installment_id.is_some() {
        targets.to_vec()
    } else {
        let mut credit = Money::checked_sum([cmd.amount, cmd.discount])
            .and_then(|c| c.checked_sub(cmd.interest))
            .and_then(|c| c.checked_sub(cmd.fine))
            .ok_or_else(overflow)?;
        let mut covered = Vec::new();
        for inst in targets {
            if credit < inst.amount {
                break;
            }
            credit -= inst.amount;
            covered.push(*inst);
        }
        covered
    };

    let Some((last, leading)) = covered.split_last() else {
        let next = targets.first().map(|i| (i.number, i.amount));
        return Err(DomainError::validation(
            "amount",
            match next {
                Some((number, amount)) => format!(
                    "payment of {} does not cover installment {number} ({amount})",
                    cmd.amount
                ),
                None => "payment does not cover any installment".to_string(),
            },
        ));
    };

    let mut settled: Vec<SettledInstallment> = leading
        .iter()
        .map(|inst| SettledInstallment {
            installment_id: inst.id,
            paid_amount: inst.amount,
            interest: Money::ZERO,
            fine: Money::ZERO,
            discount: Money::ZERO,
        })
        .collect();

    let leading_total = Money::checked_sum(leading.iter().map(|i| i.amount)).ok_or_else(overflow)?;
    let last_paid = cmd.amount.checked_sub(leading_total).ok_or_else(overflow)?;
    if last_paid.is_negative() {
        return Err(DomainError::validation(
            "amount",
            format!(
                "payment of {} leaves {last_paid} for installment {}",
                cmd.amount, last.number
            ),
        ));
    }
    settled.push(SettledInstallment {
        installment_id: last.id,
        paid_amount: last_paid,
        interest: cmd.interest,
        fine: cmd.fine,
        discount: cmd.discount,
    });
    Ok(settled)
}

fn build_installments(cmd: &CreateObligation) -> Result<Vec<Installment>, DomainError> {
    match &cmd.plan {
        InstallmentPlan::Single => Ok(vec![Installment::pending(1, cmd.due_date, cmd.total)]),
        InstallmentPlan::Equal { count } => {
            if *count == 0 || *count > MAX_INSTALLMENTS {
                return Err(DomainError::validation(
                    "installments",
                    format!("installment count must be between 1 and {MAX_INSTALLMENTS}"),
                ));
            }
            // Every installment must carry at least one cent.
            if i64::from(*count) > cmd.total.cents() {
                return Err(DomainError::validation(
                    "installments",
                    format!("{} cannot be split into {count} installments", cmd.total),
                ));
            }
            cmd.total
                .split(*count)?
                .into_iter()
                .enumerate()
                .map(|(idx, amount)| {
                    let due = shift_months(cmd.due_date, idx as i64)?;
                    Ok(Installment::pending(idx as u32 + 1, due, amount))
                })
                .collect()
        }
        InstallmentPlan::Explicit { installments } => {
            if installments.is_empty() || installments.len() > MAX_INSTALLMENTS as usize {
                return Err(DomainError::validation(
                    "installments",
                    format!("between 1 and {MAX_INSTALLMENTS} installments are required"),
                ));
            }
            if let Some(bad) = installments.iter().find(|d| !d.amount.is_positive()) {
                return Err(DomainError::validation(
                    "installments",
                    format!("installment amount must be positive (got {})", bad.amount),
                ));
            }
            let sum = Money::checked_sum(installments.iter().map(|d| d.amount))
                .ok_or_else(|| DomainError::validation("installments", "installment amounts overflow"))?;
            if sum != cmd.total {
                return Err(DomainError::validation(
                    "installments",
                    format!("installments sum to {sum} but the total is {}", cmd.total),
                ));
            }
            let mut drafts = installments.clone();
            drafts.sort_by_key(|d| d.due_date);
            Ok(drafts
                .into_iter()
                .enumerate()
                .map(|(idx, d)| Installment::pending(idx as u32 + 1, d.due_date, d.amount))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn create_cmd(total: Money, plan: InstallmentPlan) -> CreateObligation {
        CreateObligation {
            obligation_id: ObligationId::new(),
            description: "Office rent".to_string(),
            payee: Payee::new("Imobiliária Central", None).unwrap(),
            expense_type: ExpenseType::Administrative,
            category: Category::Rent,
            total,
            issue_date: d(2024, 1, 2),
            due_date: d(2024, 1, 31),
            notes: None,
            plan,
            source_rule: None,
            source_invoice: None,
        }
    }

    fn pay(obligation: &Obligation, amount: Money) -> RegisterPayment {
        RegisterPayment::new(obligation.id_typed(), d(2024, 2, 2), amount, PaymentMethod::Pix)
    }

    #[test]
    fn single_plan_creates_one_installment_for_the_total() {
        let obligation = Obligation::create(create_cmd(Money::new(300, 0), InstallmentPlan::Single)).unwrap();
        assert_eq!(obligation.installments().len(), 1);
        assert_eq!(obligation.installments()[0].amount, Money::new(300, 0));
        assert_eq!(obligation.installments()[0].due_date, d(2024, 1, 31));
        assert_eq!(obligation.version(), 1);
        assert_eq!(obligation.lifecycle(), Lifecycle::Pending);
    }

    #[test]
    fn equal_plan_puts_residue_on_last_installment_and_clamps_months() {
        let obligation =
            Obligation::create(create_cmd(Money::new(100, 0), InstallmentPlan::Equal { count: 3 })).unwrap();
        let amounts: Vec<_> = obligation.installments().iter().map(|i| i.amount).collect();
        assert_eq!(
            amounts,
            vec![Money::from_cents(3333), Money::from_cents(3333), Money::from_cents(3334)]
        );
        let dues: Vec<_> = obligation.installments().iter().map(|i| i.due_date).collect();
        assert_eq!(dues, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31)]);
        let numbers: Vec<_> = obligation.installments().iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn explicit_plan_must_sum_to_total() {
        let plan = InstallmentPlan::Explicit {
            installments: vec![
                InstallmentDraft { due_date: d(2024, 2, 10), amount: Money::new(50, 0) },
                InstallmentDraft { due_date: d(2024, 1, 31), amount: Money::new(40, 0) },
            ],
        };
        let err = Obligation::create(create_cmd(Money::new(100, 0), plan)).unwrap_err();
        assert_eq!(err.field(), Some("installments"));

        let plan = InstallmentPlan::Explicit {
            installments: vec![
                InstallmentDraft { due_date: d(2024, 2, 10), amount: Money::new(60, 0) },
                InstallmentDraft { due_date: d(2024, 1, 31), amount: Money::new(40, 0) },
            ],
        };
        let obligation = Obligation::create(create_cmd(Money::new(100, 0), plan)).unwrap();
        assert_eq!(obligation.installments()[0].due_date, d(2024, 1, 31));
        assert_eq!(obligation.installments()[0].number, 1);
        assert_eq!(obligation.installments()[1].amount, Money::new(60, 0));
    }

    #[test]
    fn creation_validates_required_fields() {
        let mut cmd = create_cmd(Money::ZERO, InstallmentPlan::Single);
        assert_eq!(Obligation::create(cmd.clone()).unwrap_err().field(), Some("total_amount"));

        cmd.total = Money::new(10, 0);
        cmd.description = "  ".to_string();
        assert_eq!(Obligation::create(cmd.clone()).unwrap_err().field(), Some("description"));

        cmd.description = "x".to_string();
        cmd.due_date = d(2023, 12, 31);
        assert_eq!(Obligation::create(cmd.clone()).unwrap_err().field(), Some("due_date"));

        cmd.due_date = d(2024, 1, 31);
        cmd.plan = InstallmentPlan::Equal { count: 0 };
        assert_eq!(Obligation::create(cmd).unwrap_err().field(), Some("installments"));
    }

    #[test]
    fn creating_twice_is_a_conflict() {
        let cmd = create_cmd(Money::new(10, 0), InstallmentPlan::Single);
        let mut obligation = Obligation::create(cmd.clone()).unwrap();
        let err = obligation.execute(&ObligationCommand::Create(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn full_payment_marks_obligation_and_installments_paid() {
        let mut obligation = Obligation::create(create_cmd(Money::new(300, 0), InstallmentPlan::Single)).unwrap();
        let cmd = pay(&obligation, Money::new(300, 0));
        obligation.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap();

        assert_eq!(obligation.lifecycle(), Lifecycle::Paid);
        assert_eq!(obligation.payments().len(), 1);
        let inst = &obligation.installments()[0];
        assert!(inst.is_paid());
        assert_eq!(inst.payment_date, Some(d(2024, 2, 2)));
        assert_eq!(inst.paid_amount, Some(Money::new(300, 0)));
        assert_eq!(obligation.outstanding(), Money::ZERO);
    }

    #[test]
    fn second_payment_is_a_conflict_and_leaves_payments_untouched() {
        let mut obligation = Obligation::create(create_cmd(Money::new(300, 0), InstallmentPlan::Single)).unwrap();
        obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(300, 0))))
            .unwrap();
        let before = obligation.clone();

        let err = obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(300, 0))))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(obligation, before);
    }

    #[test]
    fn paying_one_installment_keeps_obligation_pending() {
        let mut obligation =
            Obligation::create(create_cmd(Money::new(100, 0), InstallmentPlan::Equal { count: 3 })).unwrap();
        let first = obligation.installments()[0].id;
        let mut cmd = pay(&obligation, Money::from_cents(3333));
        cmd.installment_id = Some(first);
        obligation.execute(&ObligationCommand::RegisterPayment(cmd.clone())).unwrap();

        assert_eq!(obligation.lifecycle(), Lifecycle::Pending);
        assert_eq!(obligation.outstanding(), Money::from_cents(6667));
        assert_eq!(obligation.effective_due_date(), d(2024, 2, 29));

        cmd.payment_id = PaymentId::new();
        let err = obligation.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(msg) if msg.contains("installment 1")));
    }

    #[test]
    fn settling_remaining_installments_pays_the_obligation() {
        let mut obligation =
            Obligation::create(create_cmd(Money::new(100, 0), InstallmentPlan::Equal { count: 2 })).unwrap();
        let mut cmd = pay(&obligation, Money::new(102, 0));
        cmd.interest = Money::new(2, 0);
        obligation.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap();

        assert_eq!(obligation.lifecycle(), Lifecycle::Paid);
        let paid: Vec<_> = obligation.installments().iter().map(|i| i.paid_amount).collect();
        assert_eq!(paid, vec![Some(Money::new(50, 0)), Some(Money::new(52, 0))]);
        assert_eq!(obligation.installments()[1].interest, Money::new(2, 0));
    }

    #[test]
    fn underpayment_settles_only_the_installments_it_covers() {
        let mut obligation =
            Obligation::create(create_cmd(Money::new(300, 0), InstallmentPlan::Equal { count: 3 })).unwrap();
        let before = obligation.clone();

        let err = obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(50, 0))))
            .unwrap_err();
        assert_eq!(err.field(), Some("amount"));
        assert_eq!(obligation, before);

        obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(250, 0))))
            .unwrap();
        assert_eq!(obligation.lifecycle(), Lifecycle::Pending);
        let paid: Vec<_> = obligation.installments().iter().map(|i| i.paid_amount).collect();
        assert_eq!(paid, vec![Some(Money::new(100, 0)), Some(Money::new(150, 0)), None]);
        assert_eq!(obligation.outstanding(), Money::new(100, 0));
        assert!(
            obligation
                .installments()
                .iter()
                .filter_map(|i| i.paid_amount)
                .all(|amount| !amount.is_negative())
        );

        obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(100, 0))))
            .unwrap();
        assert_eq!(obligation.lifecycle(), Lifecycle::Paid);
    }

    #[test]
    fn discount_counts_toward_face_value() {
        let mut obligation = Obligation::create(create_cmd(Money::new(300, 0), InstallmentPlan::Single)).unwrap();
        let mut cmd = pay(&obligation, Money::new(290, 0));
        cmd.discount = Money::new(10, 0);
        obligation.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap();

        assert_eq!(obligation.lifecycle(), Lifecycle::Paid);
        assert_eq!(obligation.installments()[0].paid_amount, Some(Money::new(290, 0)));
        assert_eq!(obligation.installments()[0].discount, Money::new(10, 0));
    }

    #[test]
    fn equal_plan_needs_a_cent_per_installment() {
        let err = Obligation::create(create_cmd(Money::from_cents(2), InstallmentPlan::Equal { count: 3 }))
            .unwrap_err();
        assert_eq!(err.field(), Some("installments"));

        let obligation =
            Obligation::create(create_cmd(Money::from_cents(3), InstallmentPlan::Equal { count: 3 })).unwrap();
        assert!(obligation.installments().iter().all(|i| i.amount == Money::from_cents(1)));
    }

    #[test]
    fn explicit_plan_overflow_is_a_validation_error() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        let plan = InstallmentPlan::Explicit {
            installments: vec![
                InstallmentDraft { due_date: d(2024, 1, 31), amount: huge },
                InstallmentDraft { due_date: d(2024, 2, 29), amount: huge },
            ],
        };
        let err = Obligation::create(create_cmd(Money::new(100, 0), plan)).unwrap_err();
        assert_eq!(err.field(), Some("installments"));
    }

    #[test]
    fn payment_validation_and_version_checks() {
        let mut obligation = Obligation::create(create_cmd(Money::new(10, 0), InstallmentPlan::Single)).unwrap();

        let err = obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::ZERO)))
            .unwrap_err();
        assert_eq!(err.field(), Some("amount"));

        let mut cmd = pay(&obligation, Money::new(10, 0));
        cmd.expected_version = ExpectedVersion::Exact(7);
        let err = obligation.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let mut cmd = pay(&obligation, Money::new(10, 0));
        cmd.installment_id = Some(InstallmentId::new());
        let err = obligation.execute(&ObligationCommand::RegisterPayment(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "installment", .. }));
    }

    #[test]
    fn cancelled_obligation_rejects_payment_and_second_cancel() {
        let mut obligation = Obligation::create(create_cmd(Money::new(10, 0), InstallmentPlan::Single)).unwrap();
        let cancel = CancelObligation {
            obligation_id: obligation.id_typed(),
            reason: Some("duplicate".to_string()),
            cancelled_on: d(2024, 1, 5),
            expected_version: ExpectedVersion::Any,
        };
        obligation.execute(&ObligationCommand::Cancel(cancel.clone())).unwrap();
        assert_eq!(obligation.lifecycle(), Lifecycle::Cancelled);

        let err = obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(10, 0))))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        let err = obligation.execute(&ObligationCommand::Cancel(cancel)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn overdue_is_derived_from_due_date_and_lifecycle() {
        let mut obligation = Obligation::create(create_cmd(Money::new(10, 0), InstallmentPlan::Single)).unwrap();
        assert_eq!(obligation.status_on(d(2024, 1, 31)), ObligationStatus::Pending);
        assert_eq!(obligation.status_on(d(2024, 2, 1)), ObligationStatus::Overdue);

        obligation
            .execute(&ObligationCommand::RegisterPayment(pay(&obligation, Money::new(10, 0))))
            .unwrap();
        assert_eq!(obligation.status_on(d(2024, 3, 1)), ObligationStatus::Paid);
    }

    #[test]
    fn payment_against_empty_aggregate_is_not_found() {
        let obligation = Obligation::empty(ObligationId::new());
        let cmd = pay(&obligation, Money::new(1, 0));
        let err = obligation.handle(&ObligationCommand::RegisterPayment(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "obligation", .. }));
    }

    #[test]
    fn payment_methods_parse_from_common_labels() {
        assert_eq!("boleto".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankSlip);
        assert_eq!("wire-transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::WireTransfer);
        assert_eq!("PIX".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pix);
        assert!("barter".parse::<PaymentMethod>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: installments always sum to the obligation total.
        #[test]
        fn installments_sum_to_total(cents in 60i64..100_000_000, count in 1u32..=60) {
            let obligation = Obligation::create(create_cmd(
                Money::from_cents(cents),
                InstallmentPlan::Equal { count },
            )).unwrap();
            let sum: Money = obligation.installments().iter().map(|i| i.amount).sum();
            prop_assert_eq!(sum, obligation.total());
            prop_assert_eq!(obligation.installments().len(), count as usize);
        }
    }
}
