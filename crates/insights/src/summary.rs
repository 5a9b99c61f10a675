use extrato_core::{Amount, MonthKey, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub sum: Amount,
    /// Rounded to cents.
    pub mean: Amount,
    pub max: Amount,
    pub min: Amount,
    pub count: usize,
}

/// One row per calendar month that has transactions, oldest first.
pub fn summarize(transactions: &[Transaction]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<MonthKey, Vec<Amount>> = BTreeMap::new();
    for tx in transactions {
        months.entry(MonthKey::of(tx.date)).or_default().push(tx.amount);
    }

    months
        .into_iter()
        .filter_map(|(month, amounts)| {
            let max = amounts.iter().copied().max()?;
            let min = amounts.iter().copied().min()?;
            let sum = amounts.iter().fold(Decimal::ZERO, |acc, a| acc + a.as_decimal());
            let mean = (sum / Decimal::from(amounts.len())).round_dp(2);
            Some(MonthlySummary {
                month,
                sum: Amount::new(sum),
                mean: Amount::new(mean),
                max,
                min,
                count: amounts.len(),
            })
        })
        .collect()
}

pub fn to_markdown(summaries: &[MonthlySummary]) -> String {
    let mut out = String::from("| mês | soma | média | máximo | mínimo | transações |\n");
    out.push_str("|---|---:|---:|---:|---:|---:|\n");
    for s in summaries {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            s.month, s.sum, s.mean, s.max, s.min, s.count
        );
    }
    out
}
