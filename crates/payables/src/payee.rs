use serde::{Deserialize, Serialize};

use finops_core::{DomainError, DomainResult, ValueObject};

/// Who an obligation is owed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payee {
    name: String,
    /// CPF (11 digits) or CNPJ (14 digits), stored without punctuation.
    tax_id: Option<String>,
}

impl ValueObject for Payee {}

impl Payee {
    pub fn new(name: impl Into<String>, tax_id: Option<&str>) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("payee", "payee name is required"));
        }

        let tax_id = match tax_id.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => {
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                let only_punctuation = raw
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' '));
                if !only_punctuation || !matches!(digits.len(), 11 | 14) {
                    return Err(DomainError::validation(
                        "payee_tax_id",
                        "tax id must have 11 (CPF) or 14 (CNPJ) digits",
                    ));
                }
                Some(digits)
            }
        };

        Ok(Self { name, tax_id })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_id_punctuation_is_stripped() {
        let payee = Payee::new("Copel Distribuição", Some("12.345.678/0001-90")).unwrap();
        assert_eq!(payee.tax_id(), Some("12345678000190"));
        assert_eq!(payee.name(), "Copel Distribuição");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Payee::new("   ", None).unwrap_err();
        assert_eq!(err.field(), Some("payee"));
    }

    #[test]
    fn malformed_tax_id_is_rejected() {
        assert_eq!(
            Payee::new("Acme", Some("123")).unwrap_err().field(),
            Some("payee_tax_id")
        );
        assert!(Payee::new("Acme", Some("1234567890a")).is_err());
        assert_eq!(Payee::new("Acme", Some("")).unwrap().tax_id(), None);
    }
}
