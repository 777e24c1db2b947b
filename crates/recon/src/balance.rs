use std::collections::BTreeMap;

use crate::amount::{round2, Coercion};
use crate::model::{BalanceReport, BalanceStats, RawEntry, VoucherBalance};

type VoucherKey = (String, Option<String>, Option<String>, String);

/// Sum debit and credit per (book, year, month, voucher id) and report the
/// vouchers whose rounded difference exceeds `tolerance`.
pub fn verify_balance(entries: &[RawEntry], tolerance: f64) -> BalanceReport {
    if entries.is_empty() {
        return BalanceReport {
            skipped: Some("no journal rows in scope".into()),
            ..BalanceReport::default()
        };
    }
    if entries.iter().all(|e| e.voucher.is_none()) {
        log::warn!("journal has no voucher column; skipping balance check");
        return BalanceReport {
            skipped: Some("journal has no voucher column".into()),
            ..BalanceReport::default()
        };
    }

    let mut coercion = Coercion::default();
    let mut missing_voucher_rows = 0;
    let mut sums: BTreeMap<VoucherKey, (f64, f64)> = BTreeMap::new();

    for entry in entries {
        let voucher = entry.voucher.as_deref().unwrap_or_default().trim();
        if voucher.is_empty() {
            missing_voucher_rows += 1;
            continue;
        }
        let key = (
            entry.book.clone().unwrap_or_default(),
            entry.year.as_ref().map(|y| y.trim().to_string()),
            entry.month.as_ref().map(|m| m.trim().to_string()),
            voucher.to_string(),
        );
        let slot = sums.entry(key).or_insert((0.0, 0.0));
        slot.0 += coercion.coerce(&entry.debit);
        slot.1 += coercion.coerce(&entry.credit);
    }

    let mut unbalanced = Vec::new();
    for ((book, year, month, voucher_id), (debit, credit)) in &sums {
        let debit_total = round2(*debit);
        let credit_total = round2(*credit);
        let delta = round2(debit_total - credit_total);
        if delta.abs() > tolerance && delta != 0.0 {
            unbalanced.push(VoucherBalance {
                book: book.clone(),
                year: year.clone(),
                month: month.clone(),
                voucher_id: voucher_id.clone(),
                debit_total,
                credit_total,
                delta,
            });
        }
    }

    let total = sums.len();
    let balanced = total - unbalanced.len();
    let balanced_pct = if total > 0 {
        balanced as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    log::info!(
        "balance: {total} voucher(s), {balanced} balanced, {} unbalanced ({balanced_pct:.2}%)",
        unbalanced.len()
    );
    if missing_voucher_rows > 0 {
        log::warn!("{missing_voucher_rows} row(s) without a voucher id were skipped");
    }

    BalanceReport {
        skipped: None,
        stats: BalanceStats {
            total,
            balanced,
            unbalanced: unbalanced.len(),
            balanced_pct,
            missing_voucher_rows,
            unparsable_amounts: coercion.unparsable,
        },
        unbalanced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TOLERANCE;

    fn line(voucher: &str, debit: &str, credit: &str) -> RawEntry {
        RawEntry::new("A", "1001", debit, credit).with_voucher("2025", "1", voucher)
    }

    #[test]
    fn balanced_voucher_not_reported() {
        let rows = vec![line("记-1", "100", "0"), line("记-1", "0", "100")];
        let report = verify_balance(&rows, DEFAULT_TOLERANCE);
        assert!(report.unbalanced.is_empty());
        assert_eq!(report.stats.total, 1);
        assert_eq!(report.stats.balanced_pct, 100.0);
    }

    #[test]
    fn unbalanced_voucher_reported() {
        let rows = vec![
            line("记-1", "1,000.00", "0"),
            line("记-1", "0", "950"),
            line("记-2", "5", "5"),
        ];
        let report = verify_balance(&rows, DEFAULT_TOLERANCE);
        assert_eq!(report.unbalanced.len(), 1);
        let v = &report.unbalanced[0];
        assert_eq!(v.voucher_id, "记-1");
        assert_eq!(v.debit_total, 1000.0);
        assert_eq!(v.credit_total, 950.0);
        assert_eq!(v.delta, 50.0);
        assert_eq!(v.year.as_deref(), Some("2025"));
        assert_eq!(report.stats.balanced, 1);
        assert_eq!(report.stats.balanced_pct, 50.0);
    }

    #[test]
    fn rounding_boundary() {
        let rows = vec![line("1", "100.004", "0"), line("1", "0", "100.006")];
        let strict = verify_balance(&rows, 0.005);
        assert_eq!(strict.unbalanced.len(), 1);
        assert_eq!(strict.unbalanced[0].delta.abs(), 0.01);

        assert!(verify_balance(&rows, 0.01).unbalanced.is_empty());
        assert!(verify_balance(&rows, 0.02).unbalanced.is_empty());
    }

    #[test]
    fn float_residue_is_balanced() {
        let rows = vec![
            line("1", "0.1", "0"),
            line("1", "0.2", "0"),
            line("1", "0", "0.3"),
        ];
        assert!(verify_balance(&rows, 0.0).unbalanced.is_empty());
    }

    #[test]
    fn same_id_in_other_period_is_separate() {
        let rows = vec![
            line("记-1", "10", "0"),
            RawEntry::new("A", "1001", "0", "10").with_voucher("2025", "2", "记-1"),
        ];
        let report = verify_balance(&rows, DEFAULT_TOLERANCE);
        assert_eq!(report.stats.total, 2);
        assert_eq!(report.unbalanced.len(), 2);
    }

    #[test]
    fn blank_voucher_rows_skipped_and_counted() {
        let rows = vec![line("", "10", "0"), line("记-1", "1", "1")];
        let report = verify_balance(&rows, DEFAULT_TOLERANCE);
        assert_eq!(report.stats.missing_voucher_rows, 1);
        assert_eq!(report.stats.total, 1);
    }

    #[test]
    fn unparsable_amounts_read_as_zero() {
        let rows = vec![line("1", "abc", "0"), line("1", "0", "0")];
        let report = verify_balance(&rows, DEFAULT_TOLERANCE);
        assert!(report.unbalanced.is_empty());
        assert_eq!(report.stats.unparsable_amounts, 1);
    }

    #[test]
    fn no_voucher_column_is_skipped() {
        let rows = vec![RawEntry::new("A", "1001", "1", "0")];
        let report = verify_balance(&rows, DEFAULT_TOLERANCE);
        assert!(report.skipped.is_some());
        assert_eq!(report.stats.total, 0);
    }
}
