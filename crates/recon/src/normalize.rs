use std::collections::BTreeMap;

use crate::amount::Coercion;
use crate::config::ReconConfig;
use crate::model::{
    AccountKey, AggregateRecord, BookDimension, NormalizeDiagnostics, NormalizedLedger, RawEntry,
    SourceEntries,
};

/// Built-in subtotal markers; a subject containing any of them is a summary row.
pub const SUMMARY_KEYWORDS: [&str; 4] = ["合计", "小计", "总计", "汇总"];

/// Aggregates with both sums inside this band count as zero.
pub const ZERO_EPSILON: f64 = 1e-6;

/// Account code of a subject path: the text before the first separator,
/// or the whole subject when there is none. Trimmed either way.
pub fn account_code(subject: &str, separator: char) -> &str {
    let subject = subject.trim();
    match subject.split_once(separator) {
        Some((code, _)) => code.trim(),
        None => subject,
    }
}

/// Subtotal, grand-total and report-footer rows that must not be aggregated.
pub fn is_summary_row(subject: &str, config: &ReconConfig) -> bool {
    let s = subject.trim();
    SUMMARY_KEYWORDS.iter().any(|k| s.contains(k))
        || config.summary_patterns.iter().any(|p| !p.is_empty() && s.contains(p.as_str()))
        || config.filter_invalid_codes.iter().any(|c| s == c)
        || config.filter_patterns.iter().any(|p| !p.is_empty() && s.contains(p.as_str()))
}

fn in_target(book: &str, config: &ReconConfig) -> bool {
    config.target_patterns.is_empty()
        || config.target_patterns.iter().any(|p| book.contains(p.as_str()))
}

fn book_dimension(source: &SourceEntries, config: &ReconConfig) -> BookDimension {
    if source.book_column {
        BookDimension::Real
    } else {
        BookDimension::Synthetic(config.synthetic_book().to_string())
    }
}

/// Entries inside the target books, each carrying a book name. Sources
/// without a book column are all in scope under the synthetic book.
pub fn scope_entries(source: &SourceEntries, config: &ReconConfig) -> Vec<RawEntry> {
    match book_dimension(source, config) {
        BookDimension::Real => source
            .entries
            .iter()
            .filter(|e| in_target(e.book.as_deref().unwrap_or_default(), config))
            .cloned()
            .collect(),
        BookDimension::Synthetic(name) => source
            .entries
            .iter()
            .map(|e| RawEntry {
                book: Some(name.clone()),
                ..e.clone()
            })
            .collect(),
    }
}

/// Reduce one source to per-(book, code) aggregates.
pub fn normalize(source: &SourceEntries, config: &ReconConfig) -> NormalizedLedger {
    let side = source.side;
    let zero_filter = config.zero_filter(side);
    let filter_summary = config.filter_summary_rows(side);
    let separator = config.separator();
    let dimension = book_dimension(source, config);

    if let BookDimension::Synthetic(name) = &dimension {
        log::warn!("{side}: no book column, using synthetic book '{name}' for every row");
    }

    let mut diag = NormalizeDiagnostics {
        input_rows: source.entries.len(),
        ..NormalizeDiagnostics::default()
    };
    let mut coercion = Coercion::default();
    let mut records: BTreeMap<AccountKey, AggregateRecord> = BTreeMap::new();

    for entry in &source.entries {
        let book = match &dimension {
            BookDimension::Real => {
                let book = entry.book.as_deref().unwrap_or_default();
                if !in_target(book, config) {
                    diag.outside_target += 1;
                    continue;
                }
                book
            }
            BookDimension::Synthetic(name) => name.as_str(),
        };

        if filter_summary && is_summary_row(&entry.subject, config) {
            diag.summary_rows += 1;
            continue;
        }

        let code = account_code(&entry.subject, separator);
        if code.is_empty() {
            diag.empty_code += 1;
            continue;
        }

        let debit = coercion.coerce(&entry.debit);
        let credit = coercion.coerce(&entry.credit);
        if zero_filter.raw_rows() && debit == 0.0 && credit == 0.0 {
            diag.zero_rows += 1;
            continue;
        }

        let record = records.entry(AccountKey::new(book, code)).or_default();
        record.debit += debit;
        record.credit += credit;
        record.exists = true;
        record.row_count += 1;
    }

    if zero_filter.aggregates() {
        let before = records.len();
        records.retain(|_, r| !(r.debit.abs() <= ZERO_EPSILON && r.credit.abs() <= ZERO_EPSILON));
        diag.zero_aggregates = before - records.len();
    }

    diag.unparsable_amounts = coercion.unparsable;
    diag.header_echo_amounts = coercion.header_echo;
    diag.aggregated_keys = records.len();

    log::info!(
        "{side}: {} rows -> {} keys (outside target {}, summary {}, empty code {}, zero rows {}, zero aggregates {})",
        diag.input_rows,
        diag.aggregated_keys,
        diag.outside_target,
        diag.summary_rows,
        diag.empty_code,
        diag.zero_rows,
        diag.zero_aggregates
    );
    if diag.unparsable_amounts > 0 {
        log::warn!("{side}: {} amount cell(s) could not be parsed and were read as 0", diag.unparsable_amounts);
    }

    NormalizedLedger {
        side,
        book_dimension: dimension,
        records,
        diagnostics: diag,
    }
}
