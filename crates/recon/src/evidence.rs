use crate::model::{DeltaTotals, MatchOutput, MatchSummary};

/// Per-bucket counts plus the amount totals a reviewer reconciles against:
/// Σ deltas over differing keys, Σ journal amounts over journal-only keys,
/// and −Σ trial-balance amounts over trial-balance-only keys.
pub fn compute_summary(output: &MatchOutput) -> MatchSummary {
    let mut differing_totals = DeltaTotals::default();
    for r in &output.differing {
        differing_totals.debit += r.debit_delta;
        differing_totals.credit += r.credit_delta;
    }

    let mut source_a_only_totals = DeltaTotals::default();
    for r in &output.source_a_only {
        source_a_only_totals.debit += r.debit_a;
        source_a_only_totals.credit += r.credit_a;
    }

    let mut source_b_only_totals = DeltaTotals::default();
    for r in &output.source_b_only {
        source_b_only_totals.debit -= r.debit_b;
        source_b_only_totals.credit -= r.credit_b;
    }

    let net_totals = DeltaTotals {
        debit: differing_totals.debit + source_a_only_totals.debit + source_b_only_totals.debit,
        credit: differing_totals.credit + source_a_only_totals.credit + source_b_only_totals.credit,
    };

    MatchSummary {
        total_keys: output.len(),
        aligned: output.aligned.len(),
        differing: output.differing.len(),
        source_a_only: output.source_a_only.len(),
        source_b_only: output.source_b_only.len(),
        differing_totals,
        source_a_only_totals,
        source_b_only_totals,
        net_totals,
    }
}
