use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::amount::within_tolerance;
use crate::error::ReconError;
use crate::model::{
    AccountKey, AggregateRecord, EmptyReason, JoinMode, MatchBucket, MatchOutput, MatchRecord,
    NormalizedLedger,
};

/// Book every key is moved onto when either side lacks a real book column.
pub const UNIFIED_BOOK: &str = "统一账簿";

type Records = BTreeMap<AccountKey, AggregateRecord>;

/// Move every record onto [`UNIFIED_BOOK`]. Keys that collapse together
/// are summed, with `exists` OR-ed.
fn rekey(records: &Records) -> Records {
    let mut out = Records::new();
    for (key, rec) in records {
        let slot = out.entry(AccountKey::new(UNIFIED_BOOK, key.code.clone())).or_default();
        slot.debit += rec.debit;
        slot.credit += rec.credit;
        slot.exists |= rec.exists;
        slot.row_count += rec.row_count;
    }
    out
}

/// Full outer join of two normalized ledgers on [`AccountKey`], bucketing
/// each key by existence and by `|delta| <= threshold` on debit and credit
/// independently.
pub fn match_ledgers(
    a: &NormalizedLedger,
    b: &NormalizedLedger,
    threshold: f64,
) -> Result<MatchOutput, ReconError> {
    let join = if a.book_dimension.is_synthetic() || b.book_dimension.is_synthetic() {
        JoinMode::CodeOnly {
            unified_book: UNIFIED_BOOK.to_string(),
        }
    } else {
        JoinMode::BookAndCode
    };

    let empty_reason = match (a.records.is_empty(), b.records.is_empty()) {
        (true, true) => Some(EmptyReason::BothEmpty),
        (true, false) => Some(EmptyReason::SourceAEmpty),
        (false, true) => Some(EmptyReason::SourceBEmpty),
        (false, false) => None,
    };
    if let Some(reason) = empty_reason {
        log::warn!("nothing to reconcile: {reason}");
        return Ok(MatchOutput::empty(join, reason));
    }

    let (left, right): (Cow<Records>, Cow<Records>) = match &join {
        JoinMode::BookAndCode => (Cow::Borrowed(&a.records), Cow::Borrowed(&b.records)),
        JoinMode::CodeOnly { unified_book } => {
            log::warn!(
                "a source has no book column; matching on account code only under '{unified_book}'"
            );
            (Cow::Owned(rekey(&a.records)), Cow::Owned(rekey(&b.records)))
        }
    };

    let keys: BTreeSet<&AccountKey> = left.keys().chain(right.keys()).collect();
    let absent = AggregateRecord::default();

    let mut output = MatchOutput {
        join,
        empty_reason: None,
        aligned: Vec::new(),
        differing: Vec::new(),
        source_a_only: Vec::new(),
        source_b_only: Vec::new(),
    };

    for key in keys {
        let ra = left.get(key).unwrap_or(&absent);
        let rb = right.get(key).unwrap_or(&absent);
        let debit_delta = ra.debit - rb.debit;
        let credit_delta = ra.credit - rb.credit;

        let bucket = match (ra.exists, rb.exists) {
            (true, true) => {
                if within_tolerance(debit_delta, threshold)
                    && within_tolerance(credit_delta, threshold)
                {
                    MatchBucket::MatchedAligned
                } else {
                    MatchBucket::MatchedDiffering
                }
            }
            (true, false) => MatchBucket::SourceAOnly,
            (false, true) => MatchBucket::SourceBOnly,
            (false, false) => {
                return Err(ReconError::Invariant(format!(
                    "key ({}, {}) exists in neither source",
                    key.book, key.code
                )))
            }
        };

        let record = MatchRecord {
            bucket,
            book: key.book.clone(),
            account_code: key.code.clone(),
            debit_a: ra.debit,
            credit_a: ra.credit,
            debit_b: rb.debit,
            credit_b: rb.credit,
            debit_delta,
            credit_delta,
            exists_a: ra.exists,
            exists_b: rb.exists,
        };

        match bucket {
            MatchBucket::MatchedAligned => output.aligned.push(record),
            MatchBucket::MatchedDiffering => output.differing.push(record),
            MatchBucket::SourceAOnly => output.source_a_only.push(record),
            MatchBucket::SourceBOnly => output.source_b_only.push(record),
        }
    }

    log::info!(
        "match: {} aligned, {} differing, {} journal-only, {} trial-balance-only",
        output.aligned.len(),
        output.differing.len(),
        output.source_a_only.len(),
        output.source_b_only.len()
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookDimension, NormalizeDiagnostics, Side};

    fn ledger(side: Side, dimension: BookDimension, rows: &[(&str, &str, f64, f64)]) -> NormalizedLedger {
        let records = rows
            .iter()
            .map(|&(book, code, debit, credit)| {
                (
                    AccountKey::new(book, code),
                    AggregateRecord {
                        debit,
                        credit,
                        exists: true,
                        row_count: 1,
                    },
                )
            })
            .collect();
        NormalizedLedger {
            side,
            book_dimension: dimension,
            records,
            diagnostics: NormalizeDiagnostics::default(),
        }
    }

    fn je(rows: &[(&str, &str, f64, f64)]) -> NormalizedLedger {
        ledger(Side::Journal, BookDimension::Real, rows)
    }

    fn tb(rows: &[(&str, &str, f64, f64)]) -> NormalizedLedger {
        ledger(Side::TrialBalance, BookDimension::Real, rows)
    }

    #[test]
    fn four_buckets() {
        let a = je(&[
            ("A", "1001", 100.0, 0.0),
            ("A", "1002", 50.0, 0.0),
            ("A", "1003", 10.0, 0.0),
        ]);
        let b = tb(&[
            ("A", "1001", 100.005, 0.0),
            ("A", "1002", 40.0, 0.0),
            ("A", "1004", 0.0, 7.0),
        ]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(out.join, JoinMode::BookAndCode);
        assert_eq!(out.aligned.len(), 1);
        assert_eq!(out.aligned[0].account_code, "1001");
        assert_eq!(out.differing.len(), 1);
        assert_eq!(out.differing[0].debit_delta, 10.0);
        assert_eq!(out.source_a_only[0].account_code, "1003");
        assert_eq!(out.source_b_only[0].account_code, "1004");
        assert_eq!(out.source_b_only[0].credit_delta, -7.0);
    }

    #[test]
    fn every_key_lands_in_exactly_one_bucket() {
        let a = je(&[("A", "1", 1.0, 0.0), ("A", "2", 2.0, 0.0), ("B", "1", 3.0, 0.0)]);
        let b = tb(&[("A", "2", 2.0, 0.0), ("A", "3", 0.0, 1.0), ("B", "1", 3.5, 0.0)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        let mut seen: Vec<(String, String)> = out
            .records()
            .map(|r| (r.book.clone(), r.account_code.clone()))
            .collect();
        seen.sort();
        let before = seen.len();
        seen.dedup();
        assert_eq!(before, seen.len());
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn source_a_only_keeps_full_amounts_as_delta() {
        let a = je(&[("A", "1001", 100.0, 100.0), ("A", "9", 1.0, 0.0)]);
        let b = tb(&[("A", "9", 1.0, 0.0)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(out.source_a_only.len(), 1);
        let r = &out.source_a_only[0];
        assert_eq!((r.debit_delta, r.credit_delta), (100.0, 100.0));
        assert!(r.exists_a);
        assert!(!r.exists_b);
    }

    #[test]
    fn present_but_zero_is_not_absent() {
        let a = je(&[("A", "1001", 0.0, 0.0)]);
        let b = tb(&[("A", "1001", 0.0, 0.0), ("A", "1002", 0.0, 0.0)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(out.aligned.len(), 1);
        assert_eq!(out.source_b_only.len(), 1);
        assert_eq!(out.source_b_only[0].account_code, "1002");
    }

    #[test]
    fn threshold_applies_to_each_side_independently() {
        // Debit and credit both off by 0.01: each within tolerance on its own
        let a = je(&[("A", "1", 10.01, 5.0)]);
        let b = tb(&[("A", "1", 10.0, 5.01)]);
        let out = match_ledgers(&a, &b, 0.0101).unwrap();
        assert_eq!(out.aligned.len(), 1);

        let a = je(&[("A", "1", 10.0, 5.0)]);
        let b = tb(&[("A", "1", 10.0, 5.5)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(out.differing.len(), 1);
    }

    #[test]
    fn one_cent_delta_at_cent_threshold_is_aligned() {
        let a = je(&[("A", "1001", 100.01, 0.0), ("A", "1002", 0.0, 250.37)]);
        let b = tb(&[("A", "1001", 100.00, 0.0), ("A", "1002", 0.0, 250.36)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(out.aligned.len(), 2);
        assert!(out.differing.is_empty());

        let b = tb(&[("A", "1001", 99.99, 0.0), ("A", "1002", 0.0, 250.37)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(out.differing.len(), 1);
        assert_eq!(out.differing[0].account_code, "1001");
    }

    #[test]
    fn synthetic_book_rekeys_both_sides() {
        let a = je(&[("ACME-1", "1001", 60.0, 0.0), ("ACME-2", "1001", 40.0, 0.0)]);
        let b = ledger(
            Side::TrialBalance,
            BookDimension::Synthetic("ACME".into()),
            &[("ACME", "1001", 100.0, 0.0)],
        );
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert_eq!(
            out.join,
            JoinMode::CodeOnly {
                unified_book: UNIFIED_BOOK.into()
            }
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out.aligned[0].book, UNIFIED_BOOK);
        assert_eq!(out.aligned[0].debit_a, 100.0);
    }

    #[test]
    fn empty_side_reports_reason() {
        let a = je(&[]);
        let b = tb(&[("A", "1", 1.0, 0.0)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.empty_reason, Some(EmptyReason::SourceAEmpty));

        let out = match_ledgers(&a, &tb(&[]), 0.01).unwrap();
        assert_eq!(out.empty_reason, Some(EmptyReason::BothEmpty));
    }

    #[test]
    fn rows_sorted_by_key() {
        let a = je(&[("B", "1", 1.0, 0.0), ("A", "2", 1.0, 0.0), ("A", "10", 1.0, 0.0)]);
        let b = tb(&[("B", "1", 1.0, 0.0), ("A", "2", 1.0, 0.0), ("A", "10", 1.0, 0.0)]);
        let out = match_ledgers(&a, &b, 0.01).unwrap();
        let keys: Vec<_> = out.aligned.iter().map(|r| format!("{}/{}", r.book, r.account_code)).collect();
        assert_eq!(keys, vec!["A/10", "A/2", "B/1"]);
    }
}
