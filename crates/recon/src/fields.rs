//! Logical field resolution: maps configured candidate header names onto
//! column positions of one source table.
//!
//! Each logical field carries an ordered list of acceptable header names.
//! The first candidate present in the headers wins; header order plays no
//! part. A mandatory field with no hit is a [`ReconError::Configuration`],
//! never a silent substitution of some other column.
//!
//! Two escapes exist for awkward exports: debit/credit may be pinned to a
//! column position, and the book column may be matched by substring
//! ([`HeaderMatch::Contains`]).

use serde::Serialize;

use crate::config::{ColumnConfig, HeaderMatch};
use crate::error::ReconError;
use crate::model::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    Book,
    Subject,
    Debit,
    Credit,
    Year,
    Month,
    Voucher,
    Currency,
    SourceSystem,
}

impl LogicalField {
    pub const ALL: [LogicalField; 9] = [
        Self::Book,
        Self::Subject,
        Self::Debit,
        Self::Credit,
        Self::Year,
        Self::Month,
        Self::Voucher,
        Self::Currency,
        Self::SourceSystem,
    ];

    /// Subject, debit and credit are required to build aggregates at all.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::Subject | Self::Debit | Self::Credit)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Subject => "subject",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Year => "year",
            Self::Month => "month",
            Self::Voucher => "voucher",
            Self::Currency => "currency",
            Self::SourceSystem => "source_system",
        }
    }
}

impl std::fmt::Display for LogicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column positions for every logical field of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub subject: usize,
    pub debit: usize,
    pub credit: usize,
    pub book: Option<usize>,
    pub year: Option<usize>,
    pub month: Option<usize>,
    pub voucher: Option<usize>,
    pub currency: Option<usize>,
    pub source_system: Option<usize>,
}

/// Position of the first candidate (in priority order) that names a header.
pub fn find_column(headers: &[String], candidates: &[String]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        let candidate = candidate.trim();
        headers.iter().position(|h| h.trim() == candidate)
    })
}

/// Position of the first candidate (in priority order) contained in a header.
pub fn find_column_containing(headers: &[String], candidates: &[String]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }
        headers.iter().position(|h| h.contains(candidate))
    })
}

/// Resolve every logical field of `side` against `headers`.
pub fn resolve_columns(
    side: Side,
    headers: &[String],
    columns: &ColumnConfig,
) -> Result<ResolvedColumns, ReconError> {
    let lookup = |field: LogicalField| -> Option<usize> {
        let candidates = columns.candidates(field);
        let idx = match find_column(headers, candidates) {
            None if field == LogicalField::Book && columns.book_match == HeaderMatch::Contains => {
                find_column_containing(headers, candidates)
            }
            exact => exact,
        };
        match idx {
            Some(i) => log::debug!("{side}: '{field}' -> column '{}'", headers[i]),
            None => log::debug!("{side}: '{field}' unresolved"),
        }
        idx
    };
    let required = |field: LogicalField| -> Result<usize, ReconError> {
        lookup(field).ok_or_else(|| ReconError::Configuration {
            side,
            field,
            candidates: columns.candidates(field).to_vec(),
        })
    };

    let pinned = |field: LogicalField, index: Option<usize>| -> Result<usize, ReconError> {
        match index {
            Some(i) if i < headers.len() => {
                log::debug!("{side}: '{field}' -> column #{i} '{}'", headers[i]);
                Ok(i)
            }
            Some(i) => {
                log::warn!(
                    "{side}: {field}_index {i} is past the last column ({} columns); using header names",
                    headers.len()
                );
                required(field)
            }
            None => required(field),
        }
    };

    Ok(ResolvedColumns {
        subject: required(LogicalField::Subject)?,
        debit: pinned(LogicalField::Debit, columns.debit_index)?,
        credit: pinned(LogicalField::Credit, columns.credit_index)?,
        book: lookup(LogicalField::Book),
        year: lookup(LogicalField::Year),
        month: lookup(LogicalField::Month),
        voucher: lookup(LogicalField::Voucher),
        currency: lookup(LogicalField::Currency),
        source_system: lookup(LogicalField::SourceSystem),
    })
}
