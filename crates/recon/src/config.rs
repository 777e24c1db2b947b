use serde::Deserialize;

use crate::error::ReconError;
use crate::fields::LogicalField;
use crate::model::Side;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One immutable run configuration, built once and passed by reference to
/// every stage. Every key has a default, so an empty TOML document is valid.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Max absolute debit/credit delta still considered aligned.
    #[serde(default = "default_tolerance")]
    pub threshold: f64,
    /// Max absolute per-voucher debit/credit delta still considered balanced.
    #[serde(default = "default_tolerance")]
    pub balance_tolerance: f64,
    /// Synthetic book name for sources without a book column (when no
    /// target pattern is configured).
    #[serde(default = "default_book")]
    pub default_book: String,
    /// Book-name substrings; a row is in scope if its book contains any.
    /// Empty means every book is in scope.
    #[serde(default)]
    pub target_patterns: Vec<String>,
    /// Subjects equal to one of these are dropped.
    #[serde(default = "default_invalid_codes")]
    pub filter_invalid_codes: Vec<String>,
    /// Subjects containing one of these are dropped.
    #[serde(default = "default_filter_patterns")]
    pub filter_patterns: Vec<String>,
    /// Extra subtotal markers on top of the built-in keywords.
    #[serde(default)]
    pub summary_patterns: Vec<String>,
    /// Character separating the account code from the rest of a subject path.
    #[serde(default = "default_separator")]
    pub subject_separator: String,
    #[serde(default)]
    pub journal: SourceConfig,
    #[serde(default)]
    pub trial_balance: SourceConfig,
}

fn default_name() -> String {
    "reconciliation".into()
}

/// Default for both `threshold` and `balance_tolerance`.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_book() -> String {
    "默认账簿".into()
}

fn default_invalid_codes() -> Vec<String> {
    ["总计", "核算账簿累计", "合计", "nan", "币种累计", "科目编码"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_filter_patterns() -> Vec<String> {
    ["币种累计", "核算单位", "制单人", "打印时间"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_separator() -> String {
    "\\".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            threshold: default_tolerance(),
            balance_tolerance: default_tolerance(),
            default_book: default_book(),
            target_patterns: Vec::new(),
            filter_invalid_codes: default_invalid_codes(),
            filter_patterns: default_filter_patterns(),
            summary_patterns: Vec::new(),
            subject_separator: default_separator(),
            journal: SourceConfig::default(),
            trial_balance: SourceConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-source settings
// ---------------------------------------------------------------------------

/// Settings for one side. Unset values fall back to the side's defaults,
/// see [`ReconConfig::columns`] and friends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Input files, relative to the config file. Only the CLI reads these.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub zero_filter: Option<ZeroFilter>,
    #[serde(default)]
    pub filter_summary_rows: Option<bool>,
    /// Zero-based header row in the raw file. Unset means row 0 for the
    /// journal and auto-detection for the trial balance.
    #[serde(default)]
    pub header_row: Option<usize>,
    #[serde(default)]
    pub columns: ColumnOverrides,
}

/// When rows or aggregates whose debit and credit are both zero get dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFilter {
    None,
    /// Drop raw rows with debit == 0 and credit == 0 before aggregation.
    RawRows,
    /// Drop aggregates whose sums are both within 1e-6 of zero.
    Aggregates,
    Both,
}

impl ZeroFilter {
    pub fn raw_rows(&self) -> bool {
        matches!(self, Self::RawRows | Self::Both)
    }

    pub fn aggregates(&self) -> bool {
        matches!(self, Self::Aggregates | Self::Both)
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// How book candidates are compared with header names. Exact matches are
/// always tried first; `contains` then accepts a header that contains a
/// candidate, so `账簿` also finds `核算账簿名称（本位币）`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMatch {
    #[default]
    Exact,
    Contains,
}

/// A header name or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Candidates {
    One(String),
    Many(Vec<String>),
}

impl Candidates {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnOverrides {
    pub book: Option<Candidates>,
    pub subject: Option<Candidates>,
    pub debit: Option<Candidates>,
    pub credit: Option<Candidates>,
    pub year: Option<Candidates>,
    pub month: Option<Candidates>,
    pub voucher: Option<Candidates>,
    pub currency: Option<Candidates>,
    pub source_system: Option<Candidates>,
    pub book_match: Option<HeaderMatch>,
    /// Zero-based column positions; they win over header names when in range.
    pub debit_index: Option<usize>,
    pub credit_index: Option<usize>,
}

/// Fully resolved candidate lists, in priority order, for every logical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub book: Vec<String>,
    pub subject: Vec<String>,
    pub debit: Vec<String>,
    pub credit: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    pub voucher: Vec<String>,
    pub currency: Vec<String>,
    pub source_system: Vec<String>,
    pub book_match: HeaderMatch,
    pub debit_index: Option<usize>,
    pub credit_index: Option<usize>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl ColumnConfig {
    pub fn journal_defaults() -> Self {
        Self {
            book: names(&["账簿"]),
            subject: names(&["科目"]),
            debit: names(&["借方本币"]),
            credit: names(&["贷方本币"]),
            year: names(&["年"]),
            month: names(&["月"]),
            voucher: names(&["凭证号"]),
            currency: names(&["币种"]),
            source_system: names(&["来源系统"]),
            book_match: HeaderMatch::Exact,
            debit_index: None,
            credit_index: None,
        }
    }

    pub fn trial_balance_defaults() -> Self {
        Self {
            book: names(&["核算账簿名称", "主体账簿", "账簿"]),
            subject: names(&["科目编码"]),
            debit: names(&["本期借方.1", "本期借方发生.1", "本期借方", "借方累计.1", "借方累计"]),
            credit: names(&["本期贷方.1", "本期贷方发生.1", "本期贷方", "贷方累计.1", "贷方累计"]),
            year: Vec::new(),
            month: Vec::new(),
            voucher: Vec::new(),
            currency: names(&["币种"]),
            source_system: Vec::new(),
            book_match: HeaderMatch::Contains,
            debit_index: None,
            credit_index: None,
        }
    }

    pub fn defaults_for(side: Side) -> Self {
        match side {
            Side::Journal => Self::journal_defaults(),
            Side::TrialBalance => Self::trial_balance_defaults(),
        }
    }

    pub fn with_overrides(mut self, o: &ColumnOverrides) -> Self {
        let apply = |slot: &mut Vec<String>, value: &Option<Candidates>| {
            if let Some(c) = value {
                *slot = c.to_vec();
            }
        };
        apply(&mut self.book, &o.book);
        apply(&mut self.subject, &o.subject);
        apply(&mut self.debit, &o.debit);
        apply(&mut self.credit, &o.credit);
        apply(&mut self.year, &o.year);
        apply(&mut self.month, &o.month);
        apply(&mut self.voucher, &o.voucher);
        apply(&mut self.currency, &o.currency);
        apply(&mut self.source_system, &o.source_system);
        if let Some(m) = o.book_match {
            self.book_match = m;
        }
        self.debit_index = o.debit_index.or(self.debit_index);
        self.credit_index = o.credit_index.or(self.credit_index);
        self
    }

    pub fn candidates(&self, field: LogicalField) -> &[String] {
        match field {
            LogicalField::Book => &self.book,
            LogicalField::Subject => &self.subject,
            LogicalField::Debit => &self.debit,
            LogicalField::Credit => &self.credit,
            LogicalField::Year => &self.year,
            LogicalField::Month => &self.month,
            LogicalField::Voucher => &self.voucher,
            LogicalField::Currency => &self.currency,
            LogicalField::SourceSystem => &self.source_system,
        }
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn source(&self, side: Side) -> &SourceConfig {
        match side {
            Side::Journal => &self.journal,
            Side::TrialBalance => &self.trial_balance,
        }
    }

    pub fn columns(&self, side: Side) -> ColumnConfig {
        ColumnConfig::defaults_for(side).with_overrides(&self.source(side).columns)
    }

    /// Header row handed to [`crate::SourceTable::from_csv`]; `None` asks
    /// it to detect one.
    pub fn header_row(&self, side: Side) -> Option<usize> {
        self.source(side).header_row.or(match side {
            Side::Journal => Some(0),
            Side::TrialBalance => None,
        })
    }

    /// Journal rows are zero-filtered before aggregation, trial-balance
    /// aggregates after it, unless configured otherwise.
    pub fn zero_filter(&self, side: Side) -> ZeroFilter {
        self.source(side).zero_filter.unwrap_or(match side {
            Side::Journal => ZeroFilter::RawRows,
            Side::TrialBalance => ZeroFilter::Aggregates,
        })
    }

    /// Summary/subtotal row filtering is on for the trial balance only by default.
    pub fn filter_summary_rows(&self, side: Side) -> bool {
        self.source(side)
            .filter_summary_rows
            .unwrap_or(side == Side::TrialBalance)
    }

    /// Book name used for a source that has no book column.
    pub fn synthetic_book(&self) -> &str {
        self.target_patterns
            .first()
            .map(String::as_str)
            .unwrap_or(self.default_book.as_str())
    }

    pub fn separator(&self) -> char {
        self.subject_separator.chars().next().unwrap_or('\\')
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (key, value) in [
            ("threshold", self.threshold),
            ("balance_tolerance", self.balance_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "{key} must be a finite, non-negative number, got {value}"
                )));
            }
        }

        if self.subject_separator.chars().count() != 1 {
            return Err(ReconError::ConfigValidation(format!(
                "subject_separator must be exactly one character, got '{}'",
                self.subject_separator
            )));
        }

        if self.target_patterns.iter().any(|p| p.is_empty()) {
            return Err(ReconError::ConfigValidation(
                "target_patterns must not contain empty strings".into(),
            ));
        }

        for side in [Side::Journal, Side::TrialBalance] {
            let columns = self.columns(side);
            for field in LogicalField::ALL.iter().filter(|f| f.is_mandatory()) {
                if columns.candidates(*field).is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "{side}: column list for '{field}' is empty"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Annotated starter config written by `ledgercheck init`.
pub const SAMPLE_CONFIG: &str = r#"# ledgercheck configuration
name = "year-end reconciliation"

# Max absolute debit/credit difference still treated as "no difference".
threshold = 0.01
# Max absolute per-voucher debit/credit difference.
balance_tolerance = 0.01

# Book-name substrings to keep (empty = all books).
target_patterns = ["COMPANY_PATTERN_1", "COMPANY_PATTERN_2"]
# Book name used when a source has no book column and no target pattern is set.
default_book = "默认账簿"

filter_invalid_codes = ["总计", "核算账簿累计", "合计", "nan", "币种累计", "科目编码"]
filter_patterns = ["币种累计", "核算单位", "制单人", "打印时间"]
summary_patterns = []
subject_separator = "\\"

[journal]
files = ["je1-6.csv", "je7-12.csv"]
zero_filter = "raw_rows"

[journal.columns]
book = "账簿"
subject = "科目"
debit = "借方本币"
credit = "贷方本币"
year = "年"
month = "月"
voucher = "凭证号"

[trial_balance]
files = ["tb.csv"]
zero_filter = "aggregates"

[trial_balance.columns]
book = ["核算账簿名称", "主体账簿", "账簿"]
subject = "科目编码"
debit = ["本期借方.1", "本期借方发生.1", "本期借方", "借方累计.1", "借方累计"]
credit = ["本期贷方.1", "本期贷方发生.1", "本期贷方", "贷方累计.1", "贷方累计"]
# "contains" also accepts a header that merely contains a book candidate.
book_match = "contains"
# Pick debit/credit by zero-based position instead, e.g. for repeated names.
# debit_index = 5
# credit_index = 6
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
