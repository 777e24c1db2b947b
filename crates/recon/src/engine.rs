use crate::balance::verify_balance;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::gaps::detect_gaps;
use crate::matcher::match_ledgers;
use crate::model::{ReconMeta, ReconResult, Side, SourceReport};
use crate::normalize::{normalize, scope_entries};
use crate::source::SourceTable;

/// Pre-loaded tables for one run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub journal: SourceTable,
    pub trial_balance: SourceTable,
}

/// Reconcile journal against trial balance, then check the journal's
/// voucher sequence and per-voucher balance.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let je = input
        .journal
        .entries(Side::Journal, &config.columns(Side::Journal))?;
    let tb = input
        .trial_balance
        .entries(Side::TrialBalance, &config.columns(Side::TrialBalance))?;

    let je_ledger = normalize(&je, config);
    let tb_ledger = normalize(&tb, config);

    let matches = match_ledgers(&je_ledger, &tb_ledger, config.threshold)?;
    let summary = compute_summary(&matches);

    // Sequence and balance checks see every in-scope journal row, zero rows included
    let scoped = scope_entries(&je, config);
    let gaps = detect_gaps(&scoped);
    let balance = verify_balance(&scoped, config.balance_tolerance);

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            threshold: config.threshold,
            balance_tolerance: config.balance_tolerance,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        journal: SourceReport {
            book_dimension: je_ledger.book_dimension,
            diagnostics: je_ledger.diagnostics,
        },
        trial_balance: SourceReport {
            book_dimension: tb_ledger.book_dimension,
            diagnostics: tb_ledger.diagnostics,
        },
        summary,
        matches,
        gaps,
        balance,
    })
}
