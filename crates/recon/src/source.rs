//! Tabular source data and its CSV adapter.
//!
//! Exports from ledger systems often carry title lines above the real
//! header and repeat column names (original currency vs. local currency).
//! [`SourceTable::from_csv`] locates the header row and de-duplicates the
//! names the way spreadsheet readers do (`本期借方`, `本期借方.1`, ...), so
//! candidate lists can address the second occurrence explicitly.

use std::collections::HashSet;

use crate::config::ColumnConfig;
use crate::error::ReconError;
use crate::fields::resolve_columns;
use crate::model::{RawEntry, Side, SourceEntries};

/// Keywords that mark a header row when auto-detecting.
pub const HEADER_KEYWORDS: [&str; 6] = ["科目编码", "科目名称", "借方", "贷方", "账簿", "核算账簿"];

/// Only the first few raw lines are scanned for a header.
const HEADER_SCAN_ROWS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Parse CSV text. `header_row` is a zero-based index into the raw
    /// records; `None` auto-detects it.
    pub fn from_csv(data: &str, header_row: Option<usize>) -> Result<Self, ReconError> {
        let data = data.strip_prefix('\u{feff}').unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut records: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(record.iter().map(|c| c.to_string()).collect());
        }

        if records.is_empty() {
            return Ok(Self::default());
        }

        let header_idx = match header_row {
            Some(idx) if idx < records.len() => idx,
            Some(idx) => {
                return Err(ReconError::ConfigValidation(format!(
                    "header_row {idx} is past the end of the data ({} rows)",
                    records.len()
                )))
            }
            None => detect_header_row(&records),
        };

        let mut rows = records.split_off(header_idx);
        let raw_headers = rows.remove(0);
        let headers = dedupe_headers(&raw_headers);
        let before = rows.len();
        rows.retain(|r| !is_blank(r));
        log::debug!(
            "csv: header at row {header_idx}, {} data rows ({} blank dropped)",
            rows.len(),
            before - rows.len()
        );

        Ok(Self { headers, rows })
    }

    /// Stack several tables. If their headers differ, only the columns
    /// common to all of them survive, in the first table's order.
    pub fn concat(tables: Vec<SourceTable>) -> SourceTable {
        let mut iter = tables.into_iter();
        let Some(first) = iter.next() else {
            return SourceTable::default();
        };
        let rest: Vec<SourceTable> = iter.collect();
        if rest.iter().all(|t| t.headers == first.headers) {
            let mut rows = first.rows;
            for t in rest {
                rows.extend(t.rows);
            }
            return SourceTable {
                headers: first.headers,
                rows,
            };
        }

        let common: Vec<String> = first
            .headers
            .iter()
            .filter(|h| rest.iter().all(|t| t.headers.contains(h)))
            .cloned()
            .collect();
        log::warn!(
            "input files have different columns; keeping {} common column(s): {}",
            common.len(),
            common.join(", ")
        );

        let mut rows = Vec::new();
        for table in std::iter::once(&first).chain(rest.iter()) {
            let positions: Vec<Option<usize>> = common
                .iter()
                .map(|h| table.headers.iter().position(|x| x == h))
                .collect();
            for row in &table.rows {
                rows.push(
                    positions
                        .iter()
                        .map(|p| p.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                        .collect(),
                );
            }
        }
        SourceTable {
            headers: common,
            rows,
        }
    }

    /// Resolve the logical fields and turn every row into a [`RawEntry`].
    pub fn entries(&self, side: Side, columns: &ColumnConfig) -> Result<SourceEntries, ReconError> {
        let cols = resolve_columns(side, &self.headers, columns)?;

        let cell = |row: &[String], idx: usize| -> String {
            row.get(idx).map(|c| c.trim().to_string()).unwrap_or_default()
        };
        let optional = |row: &[String], idx: Option<usize>| idx.map(|i| cell(row, i));

        let entries = self
            .rows
            .iter()
            .map(|row| RawEntry {
                book: optional(row, cols.book),
                subject: cell(row, cols.subject),
                debit: cell(row, cols.debit),
                credit: cell(row, cols.credit),
                year: optional(row, cols.year),
                month: optional(row, cols.month),
                voucher: optional(row, cols.voucher),
                currency: optional(row, cols.currency),
                source_system: optional(row, cols.source_system),
            })
            .collect();

        Ok(SourceEntries {
            side,
            book_column: cols.book.is_some(),
            entries,
        })
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// First of the leading rows that mentions a header keyword and holds no
/// numeric cell, else row 0. Data rows often carry book names such as
/// `ACME主账簿`, so a keyword alone is not enough.
pub fn detect_header_row(records: &[Vec<String>]) -> usize {
    records
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| {
            row.iter()
                .any(|cell| HEADER_KEYWORDS.iter().any(|k| cell.contains(k)))
                && !row.iter().any(|cell| is_numeric(cell))
        })
        .unwrap_or(0)
}

fn is_numeric(cell: &str) -> bool {
    let cell = cell.trim().replace(',', "");
    !cell.is_empty() && cell.parse::<f64>().is_ok()
}

/// Rename repeated header names to `name.1`, `name.2`, ... Blank names
/// become `Unnamed: {idx}`.
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for (idx, name) in raw.iter().enumerate() {
        let base = match name.trim() {
            "" => format!("Unnamed: {idx}"),
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{base}.{n}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_on_first_line() {
        let csv = "\
年,月,账簿,凭证号,科目,借方本币,贷方本币
2025,1,A,记-1,1001\\现金,100,0
";
        let t = SourceTable::from_csv(csv, None).unwrap();
        assert_eq!(t.headers[4], "科目");
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][4], "1001\\现金");
    }

    #[test]
    fn detects_header_below_title_lines() {
        let csv = "\
科目余额表,,,
编制单位：ACME,,,
科目编码,科目名称,本期借方,本期贷方
1001,现金,10,0
,,,
1002,银行,0,5
";
        let t = SourceTable::from_csv(csv, None).unwrap();
        assert_eq!(t.headers, strings(&["科目编码", "科目名称", "本期借方", "本期贷方"]));
        // blank row dropped
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1][0], "1002");
    }

    #[test]
    fn data_row_with_book_keyword_is_not_a_header() {
        let csv = "\
year,month,book,voucher,subject,dr,cr
2025,1,ACME主账簿,记-1,1001,100,0
2025,1,ACME主账簿,记-1,6001,0,100
";
        let t = SourceTable::from_csv(csv, None).unwrap();
        assert_eq!(t.headers, strings(&["year", "month", "book", "voucher", "subject", "dr", "cr"]));
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0][2], "ACME主账簿");
    }

    #[test]
    fn explicit_header_row_wins() {
        let csv = "\
账簿,x
code,dr,cr
1001,1,0
";
        let t = SourceTable::from_csv(csv, Some(1)).unwrap();
        assert_eq!(t.headers, strings(&["code", "dr", "cr"]));
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn byte_order_mark_stripped() {
        let t = SourceTable::from_csv("\u{feff}科目编码,本期借方\n1001,1\n", None).unwrap();
        assert_eq!(t.headers[0], "科目编码");
    }

    #[test]
    fn header_row_out_of_range() {
        let err = SourceTable::from_csv("a,b\n1,2\n", Some(5)).unwrap_err();
        assert!(err.to_string().contains("header_row 5"));
    }

    #[test]
    fn empty_input_is_empty_table() {
        let t = SourceTable::from_csv("", None).unwrap();
        assert!(t.headers.is_empty());
        assert!(t.rows.is_empty());
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let raw = strings(&["本期借方", "本期贷方", "本期借方", "本期贷方", "本期借方", ""]);
        assert_eq!(
            dedupe_headers(&raw),
            strings(&["本期借方", "本期贷方", "本期借方.1", "本期贷方.1", "本期借方.2", "Unnamed: 5"])
        );
    }

    #[test]
    fn concat_same_headers_appends() {
        let a = SourceTable::new(strings(&["x", "y"]), vec![strings(&["1", "2"])]);
        let b = SourceTable::new(strings(&["x", "y"]), vec![strings(&["3", "4"])]);
        let t = SourceTable::concat(vec![a, b]);
        assert_eq!(t.rows, vec![strings(&["1", "2"]), strings(&["3", "4"])]);
    }

    #[test]
    fn concat_keeps_common_columns() {
        let a = SourceTable::new(strings(&["x", "y", "z"]), vec![strings(&["1", "2", "3"])]);
        let b = SourceTable::new(strings(&["z", "x"]), vec![strings(&["30", "10"])]);
        let t = SourceTable::concat(vec![a, b]);
        assert_eq!(t.headers, strings(&["x", "z"]));
        assert_eq!(t.rows, vec![strings(&["1", "3"]), strings(&["10", "30"])]);
    }

    #[test]
    fn entries_mark_missing_columns_as_none() {
        let t = SourceTable::new(
            strings(&["科目编码", "本期借方", "本期贷方"]),
            vec![strings(&[" 1001 ", "1,000", "0"])],
        );
        let src = t
            .entries(Side::TrialBalance, &ColumnConfig::trial_balance_defaults())
            .unwrap();
        assert!(!src.book_column);
        let e = &src.entries[0];
        assert_eq!(e.book, None);
        assert_eq!(e.subject, "1001");
        assert_eq!(e.debit, "1,000");
        assert_eq!(e.voucher, None);
    }

    #[test]
    fn short_rows_read_as_blank_cells() {
        let t = SourceTable::new(
            strings(&["账簿", "科目", "借方本币", "贷方本币", "凭证号"]),
            vec![strings(&["A", "1001", "5"])],
        );
        let src = t.entries(Side::Journal, &ColumnConfig::journal_defaults()).unwrap();
        let e = &src.entries[0];
        assert_eq!(e.credit, "");
        assert_eq!(e.voucher.as_deref(), Some(""));
    }
}
