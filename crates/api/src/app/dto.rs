use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use finops_core::{
    AggregateRoot, DomainError, DomainResult, ExpectedVersion, Money, ObligationId, PaymentId,
};
use finops_matching::ExtractedReceipt;
use finops_payables::{
    Category, ExpenseType, Installment, InstallmentDraft, InstallmentPlan, InvoiceFilter,
    InvoiceItem, NewInvoice, NewRecurringRule, Obligation, ObligationFilter, Payee,
    RegisterPayment,
};
use finops_infra::services::{
    ConfirmMatch, ConfirmedMatch, InvoiceDetail, InvoiceList, MatchCandidate, MaterializeReport,
    NewObligation, ObligationList, ScheduledRule,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListObligationsQuery {
    pub payee: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub expense_type: Option<String>,
}

impl ListObligationsQuery {
    pub fn into_filter(self) -> DomainResult<ObligationFilter> {
        Ok(ObligationFilter {
            payee: self.payee.filter(|p| !p.trim().is_empty()),
            due_from: self.from,
            due_to: self.to,
            status: parse_optional(self.status)?,
            category: parse_optional(self.category)?,
            expense_type: parse_optional(self.expense_type)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateObligationRequest {
    pub description: String,
    pub payee: String,
    #[serde(default)]
    pub payee_tax_id: Option<String>,
    pub expense_type: String,
    pub category: String,
    pub total_amount: Money,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    /// `{"kind": "single"}` (default), `{"kind": "equal", "count": n}` or
    /// `{"kind": "explicit", "installments": [{"due_date", "amount"}]}`.
    #[serde(default)]
    pub plan: InstallmentPlan,
}

impl CreateObligationRequest {
    pub fn into_new_obligation(self) -> DomainResult<NewObligation> {
        Ok(NewObligation {
            description: self.description,
            payee: Payee::new(self.payee, self.payee_tax_id.as_deref())?,
            expense_type: self.expense_type.parse()?,
            category: self.category.parse()?,
            total: self.total_amount,
            issue_date: self.issue_date,
            due_date: self.due_date,
            notes: self.notes,
            plan: self.plan,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    /// Supplier name or tax id.
    pub supplier: Option<String>,
    /// Issue-date bounds.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
}

impl ListInvoicesQuery {
    pub fn into_filter(self) -> DomainResult<InvoiceFilter> {
        Ok(InvoiceFilter {
            supplier: self.supplier.filter(|s| !s.trim().is_empty()),
            issued_from: self.from,
            issued_to: self.to,
            status: parse_optional(self.status)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestInvoiceRequest {
    pub number: String,
    #[serde(default)]
    pub series: Option<String>,
    pub supplier: String,
    pub supplier_tax_id: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub total_amount: Money,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub net_amount: Option<Money>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub installments: Vec<InstallmentDraft>,
    /// Defaults to suppliers.
    #[serde(default)]
    pub category: Option<String>,
    /// Defaults to operational.
    #[serde(default)]
    pub expense_type: Option<String>,
}

impl IngestInvoiceRequest {
    pub fn into_new_invoice(self) -> DomainResult<NewInvoice> {
        Ok(NewInvoice {
            number: self.number,
            series: self.series,
            supplier: Payee::new(self.supplier, Some(self.supplier_tax_id.as_str()))?,
            issue_date: self.issue_date,
            due_date: self.due_date,
            total: self.total_amount,
            discount: self.discount.unwrap_or_default(),
            net: self.net_amount,
            access_key: self.access_key,
            notes: self.notes,
            items: self.items,
            installments: self.installments,
            category: parse_optional(self.category)?.unwrap_or(Category::Suppliers),
            expense_type: parse_optional(self.expense_type)?.unwrap_or(ExpenseType::Operational),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterPaymentRequest {
    pub amount: Money,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub method: String,
    #[serde(default)]
    pub installment_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub interest: Option<Money>,
    #[serde(default)]
    pub fine: Option<Money>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl RegisterPaymentRequest {
    pub fn into_command(
        self,
        obligation_id: ObligationId,
        today: NaiveDate,
    ) -> DomainResult<RegisterPayment> {
        Ok(RegisterPayment {
            obligation_id,
            installment_id: parse_optional(self.installment_id)?,
            payment_id: PaymentId::new(),
            payment_date: self.payment_date.unwrap_or(today),
            amount: self.amount,
            method: self.method.parse()?,
            notes: self.notes,
            interest: self.interest.unwrap_or_default(),
            fine: self.fine.unwrap_or_default(),
            discount: self.discount.unwrap_or_default(),
            expected_version: ExpectedVersion::from(self.expected_version),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelObligationRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecurringRuleRequest {
    pub description: String,
    pub payee: String,
    #[serde(default)]
    pub payee_tax_id: Option<String>,
    pub category: String,
    pub expense_type: String,
    pub amount: Money,
    pub periodicity: String,
    pub due_day: u32,
    /// Anchor of the cycle; defaults to today.
    #[serde(default)]
    pub starts_on: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateRecurringRuleRequest {
    pub fn into_new_rule(self, today: NaiveDate) -> DomainResult<NewRecurringRule> {
        Ok(NewRecurringRule {
            description: self.description,
            payee: Payee::new(self.payee, self.payee_tax_id.as_deref())?,
            category: self.category.parse()?,
            expense_type: self.expense_type.parse()?,
            amount: self.amount,
            periodicity: self.periodicity.parse()?,
            due_day: self.due_day,
            starts_on: self.starts_on.unwrap_or(today),
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterializeRequest {
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmMatchRequest {
    pub obligation_id: String,
    #[serde(default)]
    pub installment_id: Option<String>,
    pub receipt: ExtractedReceipt,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl ConfirmMatchRequest {
    pub fn into_confirm(self) -> DomainResult<ConfirmMatch> {
        Ok(ConfirmMatch {
            obligation_id: self.obligation_id.parse()?,
            installment_id: parse_optional(self.installment_id)?,
            receipt: self.receipt,
            payment_method: parse_optional(self.payment_method)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
pub struct ComparativeQuery {
    pub year: i32,
}

/// Blank strings count as absent.
fn parse_optional<T>(raw: Option<String>) -> DomainResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse())
        .transpose()
}

// -------------------------
// Response mapping
// -------------------------

pub fn obligation_to_json(ob: &Obligation, today: NaiveDate) -> serde_json::Value {
    json!({
        "id": ob.id_typed(),
        "description": ob.description(),
        "payee": ob.payee(),
        "expense_type": ob.expense_type(),
        "category": ob.category(),
        "category_label": ob.category().label(),
        "total_amount": ob.total(),
        "total_paid": ob.total_paid(),
        "outstanding_amount": ob.outstanding(),
        "issue_date": ob.issue_date(),
        "due_date": ob.due_date(),
        "next_due_date": ob.next_installment().map(|i| i.due_date),
        "status": ob.status_on(today),
        "notes": ob.notes(),
        "source_rule": ob.source_rule(),
        "source_invoice": ob.source_invoice(),
        "version": ob.version(),
        "installments": ob.installments().iter().map(|i| json!({
            "id": i.id,
            "number": i.number,
            "due_date": i.due_date,
            "amount": i.amount,
            "status": installment_status(i, today),
            "payment_date": i.payment_date,
            "paid_amount": i.paid_amount,
            "interest": i.interest,
            "fine": i.fine,
            "discount": i.discount,
        })).collect::<Vec<_>>(),
        "payments": ob.payments(),
    })
}

fn installment_status(installment: &Installment, today: NaiveDate) -> &'static str {
    if installment.is_paid() {
        "paid"
    } else if installment.is_overdue_on(today) {
        "overdue"
    } else {
        "pending"
    }
}

pub fn obligation_list_to_json(list: ObligationList) -> serde_json::Value {
    json!({
        "as_of": list.as_of,
        "items": list
            .items
            .iter()
            .map(|ob| obligation_to_json(ob, list.as_of))
            .collect::<Vec<_>>(),
        "totals": list.totals,
    })
}

pub fn categories_to_json() -> serde_json::Value {
    json!({
        "items": Category::ALL
            .iter()
            .map(|c| json!({ "slug": c.slug(), "label": c.label() }))
            .collect::<Vec<_>>(),
    })
}

pub fn scheduled_rule_to_json(scheduled: ScheduledRule) -> serde_json::Value {
    let rule = scheduled.rule;
    json!({
        "id": rule.id,
        "description": rule.description,
        "payee": rule.payee,
        "category": rule.category,
        "expense_type": rule.expense_type,
        "amount": rule.amount,
        "periodicity": rule.periodicity,
        "due_day": rule.due_day,
        "starts_on": rule.starts_on,
        "active": rule.active,
        "last_materialized": rule.last_materialized,
        "notes": rule.notes,
        "next_due_date": scheduled.next_due_date,
        "upcoming": scheduled.upcoming,
    })
}

pub fn materialize_report_to_json(report: MaterializeReport, today: NaiveDate) -> serde_json::Value {
    json!({
        "created": report
            .created
            .iter()
            .map(|ob| obligation_to_json(ob, today))
            .collect::<Vec<_>>(),
        "not_due": report.not_due,
    })
}

pub fn candidate_to_json(candidate: &MatchCandidate, today: NaiveDate) -> serde_json::Value {
    json!({
        "obligation": obligation_to_json(&candidate.obligation, today),
        "score": candidate.score.score,
        "confidence": candidate.score.confidence,
        "confirmable": candidate.score.confirmable,
        "breakdown": candidate.score.breakdown,
    })
}

pub fn confirmed_match_to_json(confirmed: ConfirmedMatch, today: NaiveDate) -> serde_json::Value {
    json!({
        "payment": confirmed.payment,
        "score": confirmed.score.score,
        "confidence": confirmed.score.confidence,
        "obligation": obligation_to_json(&confirmed.obligation, today),
    })
}

pub fn invoice_to_json(detail: &InvoiceDetail, today: NaiveDate) -> serde_json::Value {
    let invoice = &detail.invoice;
    json!({
        "id": invoice.id,
        "number": invoice.number,
        "series": invoice.series,
        "reference": invoice.reference(),
        "supplier": invoice.supplier,
        "issue_date": invoice.issue_date,
        "due_date": invoice.due_date,
        "total_amount": invoice.total,
        "discount": invoice.discount,
        "net_amount": invoice.net,
        "access_key": invoice.access_key,
        "notes": invoice.notes,
        "status": detail.obligation.status_on(today),
        "items": invoice.items,
        "obligation": obligation_to_json(&detail.obligation, today),
    })
}

pub fn invoice_list_to_json(list: InvoiceList) -> serde_json::Value {
    json!({
        "as_of": list.as_of,
        "items": list
            .items
            .iter()
            .map(|detail| invoice_to_json(detail, list.as_of))
            .collect::<Vec<_>>(),
    })
}
