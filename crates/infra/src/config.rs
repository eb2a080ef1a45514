//! Process configuration from `FINOPS_*` environment variables.
//!
//! Missing variables take defaults. Malformed values are logged with `tracing::warn!`
//! and replaced by the default, except the matching configuration, which is validated
//! as a whole and rejected when inconsistent.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use finops_accounting::{CategoryAccountMap, LedgerDatePolicy, SyncSettings};
use finops_matching::MatchingConfig;
use finops_observability::LogFormat;
use finops_payables::Category;

use crate::error::ServiceError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub log_format: LogFormat,
    pub matching: MatchingConfig,
    pub sync: SyncSettings,
    /// Recurring cycles due within this many days of the reference date are issued.
    pub recurring_lead_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_format: LogFormat::default(),
            matching: MatchingConfig::default(),
            sync: SyncSettings::default(),
            recurring_lead_days: 0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceError> {
        let defaults = AppConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut matching = defaults.matching.clone();
        matching.amount_band_pct =
            parsed(get("FINOPS_MATCH_AMOUNT_BAND_PCT"), "FINOPS_MATCH_AMOUNT_BAND_PCT", matching.amount_band_pct);
        matching.date_grace_days =
            parsed(get("FINOPS_MATCH_GRACE_DAYS"), "FINOPS_MATCH_GRACE_DAYS", matching.date_grace_days);
        matching.date_cutoff_days =
            parsed(get("FINOPS_MATCH_CUTOFF_DAYS"), "FINOPS_MATCH_CUTOFF_DAYS", matching.date_cutoff_days);
        matching.confirm_threshold = parsed(
            get("FINOPS_MATCH_CONFIRM_THRESHOLD"),
            "FINOPS_MATCH_CONFIRM_THRESHOLD",
            matching.confirm_threshold,
        );
        matching.validate()?;

        let date_policy: LedgerDatePolicy = parsed(
            get("FINOPS_LEDGER_DATE_POLICY"),
            "FINOPS_LEDGER_DATE_POLICY",
            LedgerDatePolicy::default(),
        );
        let accounts = category_accounts(
            get("FINOPS_CATEGORY_ACCOUNTS"),
            get("FINOPS_FALLBACK_ACCOUNT"),
        );

        Ok(Self {
            bind_addr: get("FINOPS_BIND_ADDR").unwrap_or(defaults.bind_addr),
            log_format: parsed(get("FINOPS_LOG_FORMAT"), "FINOPS_LOG_FORMAT", defaults.log_format),
            matching,
            sync: SyncSettings {
                accounts,
                date_policy,
            },
            recurring_lead_days: parsed(
                get("FINOPS_RECURRING_LEAD_DAYS"),
                "FINOPS_RECURRING_LEAD_DAYS",
                defaults.recurring_lead_days,
            ),
        })
    }
}

fn parsed<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%key, value = %raw, %default, error = %err, "malformed setting; using default");
                default
            }
        },
    }
}

/// Default mapping overlaid with `{category_slug: account_code}`; an empty code
/// unmaps the category.
fn category_accounts(overrides: Option<String>, fallback: Option<String>) -> CategoryAccountMap {
    let mut map = CategoryAccountMap::default_mapping();

    if let Some(raw) = overrides {
        match serde_json::from_str::<BTreeMap<Category, String>>(&raw) {
            Ok(entries) => {
                for (category, code) in entries {
                    let code = code.trim().to_string();
                    map = if code.is_empty() {
                        map.without_account(category)
                    } else {
                        map.with_account(category, code)
                    };
                }
            }
            Err(err) => {
                tracing::warn!(key = "FINOPS_CATEGORY_ACCOUNTS", error = %err, "malformed category mapping; using default");
            }
        }
    }

    if let Some(code) = fallback {
        map = map.with_fallback(Some(code.trim().to_string()));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ServiceError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.matching, MatchingConfig::default());
        assert_eq!(cfg.sync.date_policy, LedgerDatePolicy::DueDate);
        assert_eq!(cfg.sync.accounts, CategoryAccountMap::default_mapping());
        assert_eq!(cfg.recurring_lead_days, 0);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("FINOPS_BIND_ADDR", "127.0.0.1:9000"),
            ("FINOPS_LOG_FORMAT", "pretty"),
            ("FINOPS_MATCH_CONFIRM_THRESHOLD", "55"),
            ("FINOPS_MATCH_GRACE_DAYS", "5"),
            ("FINOPS_LEDGER_DATE_POLICY", "payment_date"),
            ("FINOPS_RECURRING_LEAD_DAYS", "7"),
            ("FINOPS_CATEGORY_ACCOUNTS", r#"{"water": "5.5.1", "other": ""}"#),
            ("FINOPS_FALLBACK_ACCOUNT", "5.5.1"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.matching.confirm_threshold, 55);
        assert_eq!(cfg.matching.date_grace_days, 5);
        assert_eq!(cfg.sync.date_policy, LedgerDatePolicy::PaymentDate);
        assert_eq!(cfg.recurring_lead_days, 7);
        assert_eq!(cfg.sync.accounts.account_for(Category::Water), Some("5.5.1"));
        assert_eq!(cfg.sync.accounts.fallback(), Some("5.5.1"));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let cfg = config(&[
            ("FINOPS_MATCH_CONFIRM_THRESHOLD", "high"),
            ("FINOPS_LOG_FORMAT", "xml"),
            ("FINOPS_CATEGORY_ACCOUNTS", "not json"),
        ])
        .unwrap();
        assert_eq!(cfg.matching.confirm_threshold, 30);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.sync.accounts, CategoryAccountMap::default_mapping());
    }

    #[test]
    fn inconsistent_matching_windows_are_rejected() {
        let err = config(&[("FINOPS_MATCH_CUTOFF_DAYS", "2")]).unwrap_err();
        assert_eq!(err.field(), Some("date_cutoff_days"));
    }
}
