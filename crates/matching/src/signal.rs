//! Scoring signals. Each returns a normalized contribution in [0, 1]; the engine
//! applies the weights.

use finops_payables::Obligation;

use crate::config::MatchingConfig;
use crate::normalize::payee_similarity;
use crate::receipt::ExtractedReceipt;

pub trait Signal: Send + Sync {
    fn name(&self) -> &'static str;

    /// Strength of the evidence in [0, 1]. Missing receipt fields yield 0.
    fn evaluate(&self, receipt: &ExtractedReceipt, candidate: &Obligation, config: &MatchingConfig) -> f64;
}

/// Receipt amount against the candidate's outstanding amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountSignal;

impl Signal for AmountSignal {
    fn name(&self) -> &'static str {
        "amount"
    }

    fn evaluate(&self, receipt: &ExtractedReceipt, candidate: &Obligation, config: &MatchingConfig) -> f64 {
        let Some(amount) = receipt.amount else {
            return 0.0;
        };
        let expected = candidate.outstanding();
        if !expected.is_positive() {
            return 0.0;
        }

        // Out-of-range receipt amounts are no evidence at all.
        let Some(diff) = amount.checked_sub(expected).and_then(|d| d.cents().checked_abs()) else {
            return 0.0;
        };
        let diff = diff as f64;
        let tolerance = config.amount_tolerance.cents() as f64;
        if diff <= tolerance {
            return 1.0;
        }

        let band = expected.cents() as f64 * config.amount_band_pct / 100.0;
        if band <= tolerance || diff >= band {
            return 0.0;
        }
        1.0 - (diff - tolerance) / (band - tolerance)
    }
}

/// Receipt beneficiary against the candidate payee name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayeeSignal;

impl Signal for PayeeSignal {
    fn name(&self) -> &'static str {
        "payee"
    }

    fn evaluate(&self, receipt: &ExtractedReceipt, candidate: &Obligation, _config: &MatchingConfig) -> f64 {
        receipt
            .payee
            .as_deref()
            .map(|payee| payee_similarity(payee, candidate.payee_name()))
            .unwrap_or(0.0)
    }
}

/// Receipt date against the due date of the earliest unpaid installment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateSignal;

impl Signal for DateSignal {
    fn name(&self) -> &'static str {
        "date"
    }

    fn evaluate(&self, receipt: &ExtractedReceipt, candidate: &Obligation, config: &MatchingConfig) -> f64 {
        let Some(paid_on) = receipt.payment_date else {
            return 0.0;
        };
        let days_late = (paid_on - candidate.effective_due_date()).num_days();
        let cutoff = config.date_cutoff_days as f64;

        if days_late < 0 {
            // Early payment: decays from the due date with no grace window.
            let early = (-days_late) as f64;
            return (1.0 - early / cutoff).max(0.0);
        }
        if days_late <= config.date_grace_days {
            return 1.0;
        }
        let grace = config.date_grace_days as f64;
        (1.0 - (days_late as f64 - grace) / (cutoff - grace)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use finops_core::{Money, ObligationId};
    use finops_payables::{Category, CreateObligation, ExpenseType, InstallmentPlan, Payee};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn candidate() -> Obligation {
        Obligation::create(CreateObligation {
            obligation_id: ObligationId::new(),
            description: "Energia janeiro".into(),
            payee: Payee::new("Copel Distribuição", None).unwrap(),
            expense_type: ExpenseType::Operational,
            category: Category::Electricity,
            total: Money::new(1000, 0),
            issue_date: d(2024, 1, 2),
            due_date: d(2024, 1, 31),
            notes: None,
            plan: InstallmentPlan::Single,
            source_rule: None,
            source_invoice: None,
        })
        .unwrap()
    }

    fn receipt_with_amount(cents: i64) -> ExtractedReceipt {
        ExtractedReceipt {
            amount: Some(Money::from_cents(cents)),
            ..Default::default()
        }
    }

    #[test]
    fn amount_signal_decays_linearly_inside_the_band() {
        let config = MatchingConfig::default();
        let ob = candidate();
        assert_eq!(AmountSignal.evaluate(&receipt_with_amount(100_001), &ob, &config), 1.0);
        let half = AmountSignal.evaluate(&receipt_with_amount(102_500), &ob, &config);
        assert!((half - 0.5).abs() < 0.01, "half was {half}");
        assert_eq!(AmountSignal.evaluate(&receipt_with_amount(105_000), &ob, &config), 0.0);
        assert_eq!(AmountSignal.evaluate(&ExtractedReceipt::default(), &ob, &config), 0.0);
    }

    #[test]
    fn amount_signal_scores_extreme_receipt_amounts_as_zero() {
        let config = MatchingConfig::default();
        let ob = candidate();
        assert_eq!(AmountSignal.evaluate(&receipt_with_amount(i64::MIN + 7), &ob, &config), 0.0);
        assert_eq!(AmountSignal.evaluate(&receipt_with_amount(i64::MAX), &ob, &config), 0.0);

        let parsed: ExtractedReceipt =
            serde_json::from_str(r#"{"amount": "-92233720368547758.07"}"#).unwrap_or_default();
        assert_eq!(AmountSignal.evaluate(&parsed, &ob, &config), 0.0);
    }

    #[test]
    fn date_signal_has_grace_after_due_date_only() {
        let config = MatchingConfig::default();
        let ob = candidate();
        let at = |date| {
            let receipt = ExtractedReceipt { payment_date: Some(date), ..Default::default() };
            DateSignal.evaluate(&receipt, &ob, &config)
        };
        assert_eq!(at(d(2024, 1, 31)), 1.0);
        assert_eq!(at(d(2024, 2, 3)), 1.0);
        assert!(at(d(2024, 2, 4)) < 1.0);
        assert!(at(d(2024, 1, 30)) < 1.0);
        assert_eq!(at(d(2024, 3, 15)), 0.0);
        assert_eq!(at(d(2023, 12, 1)), 0.0);
    }

    #[test]
    fn payee_signal_uses_normalized_similarity() {
        let config = MatchingConfig::default();
        let ob = candidate();
        let receipt = ExtractedReceipt { payee: Some("COPEL DISTRIBUICAO".into()), ..Default::default() };
        assert_eq!(PayeeSignal.evaluate(&receipt, &ob, &config), 1.0);
        assert_eq!(PayeeSignal.evaluate(&ExtractedReceipt::default(), &ob, &config), 0.0);
    }
}
