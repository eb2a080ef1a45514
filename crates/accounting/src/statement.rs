//! Income statement (DRE) aggregation.
//!
//! Section order: gross revenue, deductions, net revenue, cost of sales, gross profit,
//! operating expenses (operational, administrative, sales), other revenue, other
//! expenses, financial expenses, profit before tax, income tax, net profit.
//!
//! Node sums are exact cent sums and every subtotal is plain arithmetic on them, so
//! there is no re-rounding anywhere but in the margin ratios.

use std::collections::BTreeMap;

use serde::Serialize;

use finops_core::{DomainError, DomainResult, Money, Period, text};

use crate::chart::{AccountPlan, AccountType};
use crate::journal::JournalEntry;

/// Statement bucket an account feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementGroup {
    GrossRevenue,
    Deductions,
    CostOfSales,
    OperationalExpenses,
    AdministrativeExpenses,
    SalesExpenses,
    FinancialExpenses,
    OtherRevenue,
    OtherExpenses,
    IncomeTax,
}

fn group_key(group: &str) -> Option<StatementGroup> {
    let key = text::slug(group);
    let key = key.as_str();
    if key.starts_with("dedu") {
        return Some(StatementGroup::Deductions);
    }
    if key.starts_with("custo") || key == "cost_of_sales" || key == "costs" {
        return Some(StatementGroup::CostOfSales);
    }
    match key {
        "receita_bruta" | "gross_revenue" => Some(StatementGroup::GrossRevenue),
        "despesas_operacionais" | "operacional" | "operacionais" | "operational" => {
            Some(StatementGroup::OperationalExpenses)
        }
        "despesas_administrativas" | "administrativa" | "administrativas" | "administrative" => {
            Some(StatementGroup::AdministrativeExpenses)
        }
        "despesas_vendas" | "vendas" | "sales" => Some(StatementGroup::SalesExpenses),
        "despesas_financeiras" | "financeira" | "financeiras" | "financial"
        | "resultado_financeiro" => Some(StatementGroup::FinancialExpenses),
        "outras_receitas" | "other_revenue" => Some(StatementGroup::OtherRevenue),
        "outras_despesas" | "outras" | "other" | "other_expenses" => {
            Some(StatementGroup::OtherExpenses)
        }
        "impostos" | "ir_csll" | "provisao_ir" | "income_tax" => Some(StatementGroup::IncomeTax),
        _ => None,
    }
}

/// Bucket for an account of `account_type` whose (resolved) group key is `group`.
pub fn classify(account_type: AccountType, group: &str) -> StatementGroup {
    let key = group_key(group);
    match account_type {
        AccountType::Cost => StatementGroup::CostOfSales,
        AccountType::Revenue => match key {
            Some(StatementGroup::Deductions) => StatementGroup::Deductions,
            Some(
                StatementGroup::OtherRevenue
                | StatementGroup::FinancialExpenses
                | StatementGroup::OtherExpenses,
            ) => StatementGroup::OtherRevenue,
            _ => StatementGroup::GrossRevenue,
        },
        AccountType::Expense => match key {
            Some(
                g @ (StatementGroup::OperationalExpenses
                | StatementGroup::AdministrativeExpenses
                | StatementGroup::SalesExpenses
                | StatementGroup::FinancialExpenses
                | StatementGroup::CostOfSales
                | StatementGroup::IncomeTax),
            ) => g,
            _ => StatementGroup::OtherExpenses,
        },
    }
}

/// Per-account detail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownLine {
    pub code: String,
    pub name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementSection {
    pub total: Money,
    /// Ordered by account code.
    pub lines: Vec<BreakdownLine>,
}

impl StatementSection {
    fn push(&mut self, code: &str, name: &str, amount: Money) {
        self.total += amount;
        self.lines.push(BreakdownLine {
            code: code.to_string(),
            name: name.to_string(),
            amount,
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperatingExpenses {
    pub operational: StatementSection,
    pub administrative: StatementSection,
    pub sales: StatementSection,
    pub total: Money,
}

/// Ratios over net revenue, rounded to four decimals; zero when net revenue is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Margins {
    pub gross: f64,
    pub operational: f64,
    pub net: f64,
}

fn margin(value: Money, net_revenue: Money) -> f64 {
    (value.ratio_of(net_revenue) * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeStatement {
    pub period: Period,
    pub gross_revenue: StatementSection,
    pub deductions: StatementSection,
    pub net_revenue: Money,
    pub cost_of_sales: StatementSection,
    pub gross_profit: Money,
    pub operating_expenses: OperatingExpenses,
    pub operating_profit: Money,
    pub other_revenue: StatementSection,
    pub other_expenses: StatementSection,
    pub financial_expenses: StatementSection,
    pub profit_before_tax: Money,
    pub income_tax: StatementSection,
    pub net_profit: Money,
    pub margins: Margins,
    /// Journal entries that fell inside the period.
    pub entry_count: usize,
}

/// Aggregate the entries dated inside `period` into an income statement.
///
/// Entries outside the period are ignored. An entry against an account code the
/// chart does not know is an error.
pub fn generate<'a>(
    plan: &AccountPlan,
    entries: impl IntoIterator<Item = &'a JournalEntry>,
    period: Period,
) -> DomainResult<IncomeStatement> {
    let range = period.range();

    // Plan indices follow code order, so iterating the map yields lines by code.
    let mut sums: BTreeMap<usize, Money> = BTreeMap::new();
    let mut entry_count = 0usize;
    for entry in entries.into_iter().filter(|e| range.contains(e.date)) {
        let idx = plan.index_of(&entry.account_code).ok_or_else(|| {
            DomainError::invariant(format!(
                "journal entry {} references unknown account {}",
                entry.id, entry.account_code
            ))
        })?;
        *sums.entry(idx).or_default() += entry.amount;
        entry_count += 1;
    }

    let mut gross_revenue = StatementSection::default();
    let mut deductions = StatementSection::default();
    let mut cost_of_sales = StatementSection::default();
    let mut operating = OperatingExpenses::default();
    let mut other_revenue = StatementSection::default();
    let mut other_expenses = StatementSection::default();
    let mut financial_expenses = StatementSection::default();
    let mut income_tax = StatementSection::default();

    for (idx, amount) in sums {
        let node = plan.node(idx);
        let section = match classify(node.account_type, plan.resolved_group(idx)) {
            StatementGroup::GrossRevenue => &mut gross_revenue,
            StatementGroup::Deductions => &mut deductions,
            StatementGroup::CostOfSales => &mut cost_of_sales,
            StatementGroup::OperationalExpenses => &mut operating.operational,
            StatementGroup::AdministrativeExpenses => &mut operating.administrative,
            StatementGroup::SalesExpenses => &mut operating.sales,
            StatementGroup::FinancialExpenses => &mut financial_expenses,
            StatementGroup::OtherRevenue => &mut other_revenue,
            StatementGroup::OtherExpenses => &mut other_expenses,
            StatementGroup::IncomeTax => &mut income_tax,
        };
        section.push(&node.code, &node.name, amount);
    }
    operating.total =
        operating.operational.total + operating.administrative.total + operating.sales.total;

    let net_revenue = gross_revenue.total - deductions.total;
    let gross_profit = net_revenue - cost_of_sales.total;
    let operating_profit = gross_profit - operating.total;
    let profit_before_tax =
        operating_profit + other_revenue.total - other_expenses.total - financial_expenses.total;
    let net_profit = profit_before_tax - income_tax.total;

    let margins = Margins {
        gross: margin(gross_profit, net_revenue),
        operational: margin(profit_before_tax, net_revenue),
        net: margin(net_profit, net_revenue),
    };

    tracing::debug!(
        period = %period,
        entries = entry_count,
        net_revenue = %net_revenue,
        net_profit = %net_profit,
        "income statement generated"
    );

    Ok(IncomeStatement {
        period,
        gross_revenue,
        deductions,
        net_revenue,
        cost_of_sales,
        gross_profit,
        operating_expenses: operating,
        operating_profit,
        other_revenue,
        other_expenses,
        financial_expenses,
        profit_before_tax,
        income_tax,
        net_profit,
        margins,
        entry_count,
    })
}

/// The twelve monthly statements of `year`, January first.
pub fn comparative(
    plan: &AccountPlan,
    entries: &[JournalEntry],
    year: i32,
) -> DomainResult<Vec<IncomeStatement>> {
    Period::months_of(year)?
        .into_iter()
        .map(|period| generate(plan, entries, period))
        .collect()
}
