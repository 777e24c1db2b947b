use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which of the two ledgers a row or table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Detailed journal entries (source A).
    Journal,
    /// Summarized trial balance (source B).
    TrialBalance,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Journal => write!(f, "journal"),
            Self::TrialBalance => write!(f, "trial_balance"),
        }
    }
}

/// One source row, cells still as text. Optional fields are `None` when the
/// source has no such column, and `Some("")` when the column exists but the
/// cell is blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub book: Option<String>,
    pub subject: String,
    pub debit: String,
    pub credit: String,
    pub year: Option<String>,
    pub month: Option<String>,
    pub voucher: Option<String>,
    pub currency: Option<String>,
    pub source_system: Option<String>,
}

impl RawEntry {
    pub fn new(
        book: impl Into<String>,
        subject: impl Into<String>,
        debit: impl Into<String>,
        credit: impl Into<String>,
    ) -> Self {
        Self {
            book: Some(book.into()),
            subject: subject.into(),
            debit: debit.into(),
            credit: credit.into(),
            ..Self::default()
        }
    }

    pub fn with_voucher(
        mut self,
        year: impl Into<String>,
        month: impl Into<String>,
        voucher: impl Into<String>,
    ) -> Self {
        self.year = Some(year.into());
        self.month = Some(month.into());
        self.voucher = Some(voucher.into());
        self
    }
}

/// Rows extracted from one source, plus whether it had a book column at all.
#[derive(Debug, Clone)]
pub struct SourceEntries {
    pub side: Side,
    pub book_column: bool,
    pub entries: Vec<RawEntry>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Reconciliation unit: (book, normalized account code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AccountKey {
    pub book: String,
    pub code: String,
}

impl AccountKey {
    pub fn new(book: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            code: code.into(),
        }
    }
}

/// Per-key sums for one source. `exists` records that at least one row
/// contributed, which is not the same thing as non-zero sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub debit: f64,
    pub credit: f64,
    pub exists: bool,
    pub row_count: usize,
}

/// Whether a source's book values are real or a single substituted name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum BookDimension {
    Real,
    Synthetic(String),
}

impl BookDimension {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

/// Row counts for every drop or coercion the normalizer performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeDiagnostics {
    pub input_rows: usize,
    pub outside_target: usize,
    pub summary_rows: usize,
    pub empty_code: usize,
    pub zero_rows: usize,
    pub zero_aggregates: usize,
    pub unparsable_amounts: usize,
    pub header_echo_amounts: usize,
    pub aggregated_keys: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizedLedger {
    pub side: Side,
    pub book_dimension: BookDimension,
    pub records: BTreeMap<AccountKey, AggregateRecord>,
    pub diagnostics: NormalizeDiagnostics,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBucket {
    MatchedAligned,
    MatchedDiffering,
    SourceAOnly,
    SourceBOnly,
}

impl std::fmt::Display for MatchBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchedAligned => write!(f, "matched_aligned"),
            Self::MatchedDiffering => write!(f, "matched_differing"),
            Self::SourceAOnly => write!(f, "source_a_only"),
            Self::SourceBOnly => write!(f, "source_b_only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub bucket: MatchBucket,
    pub book: String,
    pub account_code: String,
    pub debit_a: f64,
    pub credit_a: f64,
    pub debit_b: f64,
    pub credit_b: f64,
    pub debit_delta: f64,
    pub credit_delta: f64,
    pub exists_a: bool,
    pub exists_b: bool,
}

/// How the outer join was keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JoinMode {
    BookAndCode,
    /// At least one side had no book column; both were re-keyed onto one book.
    CodeOnly { unified_book: String },
}

/// Why a reconciliation produced no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    SourceAEmpty,
    SourceBEmpty,
    BothEmpty,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceAEmpty => write!(f, "journal has no rows left after filtering"),
            Self::SourceBEmpty => write!(f, "trial balance has no rows left after filtering"),
            Self::BothEmpty => write!(f, "neither source has rows left after filtering"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutput {
    pub join: JoinMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_reason: Option<EmptyReason>,
    pub aligned: Vec<MatchRecord>,
    pub differing: Vec<MatchRecord>,
    pub source_a_only: Vec<MatchRecord>,
    pub source_b_only: Vec<MatchRecord>,
}

impl MatchOutput {
    pub fn empty(join: JoinMode, reason: EmptyReason) -> Self {
        Self {
            join,
            empty_reason: Some(reason),
            aligned: Vec::new(),
            differing: Vec::new(),
            source_a_only: Vec::new(),
            source_b_only: Vec::new(),
        }
    }

    /// Total classified keys across all four buckets.
    pub fn len(&self) -> usize {
        self.aligned.len() + self.differing.len() + self.source_a_only.len() + self.source_b_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, in bucket order.
    pub fn records(&self) -> impl Iterator<Item = &MatchRecord> {
        self.aligned
            .iter()
            .chain(&self.differing)
            .chain(&self.source_a_only)
            .chain(&self.source_b_only)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeltaTotals {
    pub debit: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total_keys: usize,
    pub aligned: usize,
    pub differing: usize,
    pub source_a_only: usize,
    pub source_b_only: usize,
    /// Sum of deltas over differing keys.
    pub differing_totals: DeltaTotals,
    /// Sum of source A amounts over A-only keys.
    pub source_a_only_totals: DeltaTotals,
    /// Negated sum of source B amounts over B-only keys.
    pub source_b_only_totals: DeltaTotals,
    pub net_totals: DeltaTotals,
}

// ---------------------------------------------------------------------------
// Voucher sequence
// ---------------------------------------------------------------------------

/// A missing run of voucher numbers inside one (book, year, month, prefix) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub book: String,
    pub year: Option<i32>,
    pub month: Option<String>,
    pub prefix: String,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    pub start_id: String,
    pub end_id: String,
    /// Observed identifier right before the gap.
    pub before_id: String,
    /// Observed identifier right after the gap.
    pub after_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub book: String,
    pub year: Option<i32>,
    pub month: Option<String>,
    pub prefix: String,
    pub voucher_count: usize,
    pub min_id: String,
    pub max_id: String,
    pub gap_count: usize,
    pub missing_total: u64,
    pub has_gaps: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodRange {
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: i32,
    pub end_month: u32,
}

impl std::fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{:02} ~ {}-{:02}",
            self.start_year, self.start_month, self.end_year, self.end_month
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapStats {
    pub books: Vec<String>,
    pub voucher_types: Vec<String>,
    pub group_count: usize,
    pub voucher_count: usize,
    pub gap_count: usize,
    pub missing_total: u64,
    pub period_range: Option<PeriodRange>,
    pub unparsable_ids: usize,
    pub invalid_period_rows: usize,
    pub groups: Vec<GroupStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub gaps: Vec<Gap>,
    pub stats: GapStats,
}

// ---------------------------------------------------------------------------
// Voucher balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoucherBalance {
    pub book: String,
    pub year: Option<String>,
    pub month: Option<String>,
    pub voucher_id: String,
    pub debit_total: f64,
    pub credit_total: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceStats {
    pub total: usize,
    pub balanced: usize,
    pub unbalanced: usize,
    pub balanced_pct: f64,
    pub missing_voucher_rows: usize,
    pub unparsable_amounts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub unbalanced: Vec<VoucherBalance>,
    pub stats: BalanceStats,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub book_dimension: BookDimension,
    pub diagnostics: NormalizeDiagnostics,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub threshold: f64,
    pub balance_tolerance: f64,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub journal: SourceReport,
    pub trial_balance: SourceReport,
    pub summary: MatchSummary,
    pub matches: MatchOutput,
    pub gaps: GapReport,
    pub balance: BalanceReport,
}

impl ReconResult {
    /// Anything a reviewer has to look at: differences, one-sided keys,
    /// voucher gaps or unbalanced vouchers.
    pub fn has_findings(&self) -> bool {
        self.summary.differing > 0
            || self.summary.source_a_only > 0
            || self.summary.source_b_only > 0
            || !self.gaps.gaps.is_empty()
            || !self.balance.unbalanced.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Json(e.to_string()))
    }
}
