use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Days, NaiveDate};
use finops_accounting::{statement, AccountPlan, JournalEntry};
use finops_core::{JournalEntryId, Money, Period};

/// A year of entries spread over every account of the default chart.
fn synthetic_year(plan: &AccountPlan, per_day: usize) -> Vec<JournalEntry> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let codes: Vec<&str> = plan.nodes().iter().map(|n| n.code.as_str()).collect();
    let mut entries = Vec::with_capacity(366 * per_day);
    for day in 0..366u64 {
        let date = start.checked_add_days(Days::new(day)).unwrap();
        for n in 0..per_day {
            let code = codes[(day as usize * per_day + n) % codes.len()];
            entries.push(JournalEntry {
                id: JournalEntryId::new(),
                account_code: code.to_string(),
                date,
                amount: Money::from_cents(10_000 + (n as i64 * 137) % 90_000),
                description: format!("synthetic {day}/{n}"),
                document: None,
                source: None,
            });
        }
    }
    entries
}

fn bench_monthly_statement(c: &mut Criterion) {
    let plan = AccountPlan::default_plan();
    let period = Period::new(2024, 6).unwrap();

    let mut group = c.benchmark_group("statement_generate");
    for per_day in [10usize, 100, 500] {
        let entries = synthetic_year(&plan, per_day);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_with_input(BenchmarkId::new("month_of_year", per_day), &entries, |b, entries| {
            b.iter(|| statement::generate(black_box(&plan), black_box(entries), period).unwrap())
        });
    }
    group.finish();
}

fn bench_comparative_year(c: &mut Criterion) {
    let plan = AccountPlan::default_plan();
    let entries = synthetic_year(&plan, 100);

    c.bench_function("statement_comparative_year", |b| {
        b.iter(|| statement::comparative(black_box(&plan), black_box(&entries), 2024).unwrap())
    });
}

criterion_group!(benches, bench_monthly_statement, bench_comparative_year);
criterion_main!(benches);
