//! Expense classification: the fixed category set and the expense type.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use finops_core::DomainError;

/// Broad expense nature of an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Operational,
    Administrative,
    Financial,
}

impl ExpenseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseType::Operational => "operational",
            ExpenseType::Administrative => "administrative",
            ExpenseType::Financial => "financial",
        }
    }
}

impl FromStr for ExpenseType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "operational" | "operacional" => Ok(ExpenseType::Operational),
            "administrative" | "administrativa" => Ok(ExpenseType::Administrative),
            "financial" | "financeira" => Ok(ExpenseType::Financial),
            other => Err(DomainError::validation(
                "expense_type",
                format!("unknown expense type {other:?} (expected operational, administrative or financial)"),
            )),
        }
    }
}

/// The fixed set of expense categories an obligation can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Water,
    Electricity,
    Rent,
    Payroll,
    Internet,
    Telephone,
    Taxes,
    Suppliers,
    OfficeSupplies,
    Maintenance,
    Marketing,
    AccountingServices,
    BankFees,
    Insurance,
    Transport,
    Other,
}

impl Category {
    pub const ALL: [Category; 16] = [
        Category::Water,
        Category::Electricity,
        Category::Rent,
        Category::Payroll,
        Category::Internet,
        Category::Telephone,
        Category::Taxes,
        Category::Suppliers,
        Category::OfficeSupplies,
        Category::Maintenance,
        Category::Marketing,
        Category::AccountingServices,
        Category::BankFees,
        Category::Insurance,
        Category::Transport,
        Category::Other,
    ];

    /// Stable slug (matches the serde representation).
    pub fn slug(self) -> &'static str {
        match self {
            Category::Water => "water",
            Category::Electricity => "electricity",
            Category::Rent => "rent",
            Category::Payroll => "payroll",
            Category::Internet => "internet",
            Category::Telephone => "telephone",
            Category::Taxes => "taxes",
            Category::Suppliers => "suppliers",
            Category::OfficeSupplies => "office_supplies",
            Category::Maintenance => "maintenance",
            Category::Marketing => "marketing",
            Category::AccountingServices => "accounting_services",
            Category::BankFees => "bank_fees",
            Category::Insurance => "insurance",
            Category::Transport => "transport",
            Category::Other => "other",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Water => "Água",
            Category::Electricity => "Energia elétrica",
            Category::Rent => "Aluguel",
            Category::Payroll => "Folha de pagamento",
            Category::Internet => "Internet",
            Category::Telephone => "Telefone",
            Category::Taxes => "Impostos",
            Category::Suppliers => "Fornecedores",
            Category::OfficeSupplies => "Material de escritório",
            Category::Maintenance => "Manutenção",
            Category::Marketing => "Marketing",
            Category::AccountingServices => "Serviços contábeis",
            Category::BankFees => "Tarifas bancárias",
            Category::Insurance => "Seguros",
            Category::Transport => "Transporte",
            Category::Other => "Outros",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    /// Accepts the slug or the display label (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == needle || c.label().to_lowercase() == needle)
            .ok_or_else(|| DomainError::validation("category", format!("unknown category {s:?}")))
    }
}
