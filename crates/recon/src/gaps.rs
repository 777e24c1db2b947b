//! Voucher sequence analysis: missing numbers inside each
//! (year, month, book, voucher type) group.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Gap, GapReport, GapStats, GroupStats, PeriodRange, RawEntry};
use crate::voucher::{parse_voucher_id, render_id, VoucherId};

/// Missing runs between adjacent values of a sorted, de-duplicated
/// sequence, as inclusive `(start, end)` pairs.
pub fn find_gaps(sorted: &[u64]) -> Vec<(u64, u64)> {
    sorted
        .windows(2)
        .filter(|w| w[1] > w[0] + 1)
        .map(|w| (w[0] + 1, w[1] - 1))
        .collect()
}

/// Leading decimal digits of a month label: `"12A"` → 12, `"03"` → 3.
pub fn leading_number(month: &str) -> Option<u32> {
    let digits: String = month.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn parse_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    // spreadsheet exports write integer columns as floats
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

fn valid_month(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() || s == "nan" {
        None
    } else {
        Some(s.to_string())
    }
}

type GroupKey = (Option<i32>, Option<String>, String, String);

/// Group scoped journal rows and report every gap plus per-group and
/// overall statistics. Rows must already carry a book name.
pub fn detect_gaps(entries: &[RawEntry]) -> GapReport {
    if entries.is_empty() {
        return GapReport {
            skipped: Some("no journal rows in scope".into()),
            ..GapReport::default()
        };
    }
    if entries.iter().all(|e| e.voucher.is_none()) {
        log::warn!("journal has no voucher column; skipping sequence check");
        return GapReport {
            skipped: Some("journal has no voucher column".into()),
            ..GapReport::default()
        };
    }

    let mut stats = GapStats::default();
    let mut groups: BTreeMap<GroupKey, BTreeSet<u64>> = BTreeMap::new();

    for entry in entries {
        let year = match entry.year.as_deref() {
            None => None,
            Some(raw) => match parse_year(raw) {
                Some(y) => Some(y),
                None => {
                    stats.invalid_period_rows += 1;
                    continue;
                }
            },
        };
        let month = match entry.month.as_deref() {
            None => None,
            Some(raw) => match valid_month(raw) {
                Some(m) => Some(m),
                None => {
                    stats.invalid_period_rows += 1;
                    continue;
                }
            },
        };

        let raw_id = entry.voucher.as_deref().unwrap_or_default();
        let VoucherId::Parsed { prefix, number } = parse_voucher_id(raw_id) else {
            log::debug!("unparsable voucher id '{raw_id}'");
            stats.unparsable_ids += 1;
            continue;
        };

        let book = entry.book.clone().unwrap_or_default();
        groups
            .entry((year, month, book, prefix))
            .or_default()
            .insert(number);
    }

    let mut gaps = Vec::new();
    let mut books = BTreeSet::new();
    let mut voucher_types = BTreeSet::new();

    for ((year, month, book, prefix), numbers) in &groups {
        let sorted: Vec<u64> = numbers.iter().copied().collect();
        let runs = find_gaps(&sorted);
        let missing: u64 = runs.iter().map(|(s, e)| e - s + 1).sum();

        for &(start, end) in &runs {
            gaps.push(Gap {
                book: book.clone(),
                year: *year,
                month: month.clone(),
                prefix: prefix.clone(),
                start,
                end,
                size: end - start + 1,
                start_id: render_id(prefix, start),
                end_id: render_id(prefix, end),
                before_id: render_id(prefix, start - 1),
                after_id: render_id(prefix, end + 1),
            });
        }

        // groups are only created on insert, so both ends exist
        let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
        stats.groups.push(GroupStats {
            book: book.clone(),
            year: *year,
            month: month.clone(),
            prefix: prefix.clone(),
            voucher_count: sorted.len(),
            min_id: render_id(prefix, min),
            max_id: render_id(prefix, max),
            gap_count: runs.len(),
            missing_total: missing,
            has_gaps: !runs.is_empty(),
        });

        books.insert(book.clone());
        voucher_types.insert(prefix.clone());
        stats.voucher_count += sorted.len();
        stats.gap_count += runs.len();
        stats.missing_total += missing;

        if let (Some(y), Some(m)) = (year, month.as_deref().and_then(leading_number)) {
            let period = (*y, m);
            stats.period_range = Some(match stats.period_range {
                None => PeriodRange {
                    start_year: period.0,
                    start_month: period.1,
                    end_year: period.0,
                    end_month: period.1,
                },
                Some(r) => {
                    let (start_year, start_month) = (r.start_year, r.start_month).min(period);
                    let (end_year, end_month) = (r.end_year, r.end_month).max(period);
                    PeriodRange {
                        start_year,
                        start_month,
                        end_year,
                        end_month,
                    }
                }
            });
        }
    }

    stats.books = books.into_iter().collect();
    stats.voucher_types = voucher_types.into_iter().collect();
    stats.group_count = stats.groups.len();

    if stats.unparsable_ids > 0 {
        log::warn!("{} voucher id(s) could not be parsed and were skipped", stats.unparsable_ids);
    }
    if stats.invalid_period_rows > 0 {
        log::warn!("{} row(s) with invalid year/month were skipped", stats.invalid_period_rows);
    }
    log::info!(
        "sequence: {} group(s), {} voucher(s), {} gap(s), {} missing",
        stats.group_count,
        stats.voucher_count,
        stats.gap_count,
        stats.missing_total
    );

    GapReport {
        skipped: None,
        gaps,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(book: &str, year: &str, month: &str, id: &str) -> RawEntry {
        RawEntry::new(book, "1001", "1", "0").with_voucher(year, month, id)
    }

    #[test]
    fn find_gaps_basic() {
        assert_eq!(find_gaps(&[1, 2, 3, 7, 8, 10]), vec![(4, 6), (9, 9)]);
        assert!(find_gaps(&[5]).is_empty());
        assert!(find_gaps(&[]).is_empty());
        assert!(find_gaps(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn gaps_with_prefix_and_context_ids() {
        let rows: Vec<RawEntry> = ["记-1", "记-2", "记-3", "记-7", "记-8", "记-10"]
            .iter()
            .map(|id| v("A", "2025", "1", id))
            .collect();
        let report = detect_gaps(&rows);
        assert_eq!(report.gaps.len(), 2);

        let g = &report.gaps[0];
        assert_eq!((g.start, g.end, g.size), (4, 6, 3));
        assert_eq!(g.start_id, "记-4");
        assert_eq!(g.end_id, "记-6");
        assert_eq!(g.before_id, "记-3");
        assert_eq!(g.after_id, "记-7");
        assert_eq!(g.year, Some(2025));
        assert_eq!(g.month.as_deref(), Some("1"));

        let g = &report.gaps[1];
        assert_eq!((g.start, g.end, g.size), (9, 9, 1));

        assert_eq!(report.stats.missing_total, 4);
        assert_eq!(report.stats.voucher_count, 6);
        let group = &report.stats.groups[0];
        assert_eq!(group.min_id, "记-1");
        assert_eq!(group.max_id, "记-10");
        assert!(group.has_gaps);
    }

    #[test]
    fn groups_split_by_prefix_book_and_period() {
        let rows = vec![
            v("A", "2025", "1", "记-1"),
            v("A", "2025", "1", "收-3"),
            v("B", "2025", "1", "记-3"),
            v("A", "2025", "2", "记-3"),
        ];
        let report = detect_gaps(&rows);
        assert!(report.gaps.is_empty());
        assert_eq!(report.stats.group_count, 4);
        assert_eq!(report.stats.books, vec!["A", "B"]);
        assert_eq!(report.stats.voucher_types, vec!["收", "记"]);
    }

    #[test]
    fn duplicate_ids_count_once() {
        let rows = vec![
            v("A", "2025", "1", "1"),
            v("A", "2025", "1", "1"),
            v("A", "2025", "1", "3"),
        ];
        let report = detect_gaps(&rows);
        assert_eq!(report.stats.voucher_count, 2);
        assert_eq!(report.gaps[0].start_id, "2");
    }

    #[test]
    fn month_labels_are_opaque() {
        let rows = vec![
            v("A", "2025", "12", "记-1"),
            v("A", "2025", "12A", "记-3"),
        ];
        let report = detect_gaps(&rows);
        // 12 and 12A are different periods, so no gap across them
        assert!(report.gaps.is_empty());
        assert_eq!(report.stats.group_count, 2);
        let range = report.stats.period_range.unwrap();
        assert_eq!(range.to_string(), "2025-12 ~ 2025-12");
    }

    #[test]
    fn period_range_spans_years() {
        let rows = vec![
            v("A", "2024", "11", "1"),
            v("A", "2025", "2", "1"),
            v("A", "2024", "3", "1"),
        ];
        let report = detect_gaps(&rows);
        let range = report.stats.period_range.unwrap();
        assert_eq!(range.to_string(), "2024-03 ~ 2025-02");
    }

    #[test]
    fn unparsable_and_invalid_rows_counted() {
        let rows = vec![
            v("A", "2025", "1", "记-1"),
            v("A", "2025", "1", "作废"),
            v("A", "二〇二五", "1", "记-2"),
            v("A", "2025", "nan", "记-3"),
            v("A", "2025.0", "1", "记-4"),
        ];
        let report = detect_gaps(&rows);
        assert_eq!(report.stats.unparsable_ids, 1);
        assert_eq!(report.stats.invalid_period_rows, 2);
        assert_eq!(report.stats.voucher_count, 2);
        assert_eq!(report.gaps[0].start_id, "记-2");
        assert_eq!(report.gaps[0].end_id, "记-3");
    }

    #[test]
    fn missing_period_columns_group_as_unknown() {
        let rows = vec![
            RawEntry {
                voucher: Some("5".into()),
                ..RawEntry::new("A", "1001", "1", "0")
            },
            RawEntry {
                voucher: Some("8".into()),
                ..RawEntry::new("A", "1001", "1", "0")
            },
        ];
        let report = detect_gaps(&rows);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].year, None);
        assert_eq!(report.gaps[0].month, None);
        assert_eq!(report.stats.period_range, None);
    }

    #[test]
    fn no_voucher_column_is_skipped() {
        let rows = vec![RawEntry::new("A", "1001", "1", "0")];
        let report = detect_gaps(&rows);
        assert!(report.skipped.is_some());
        assert!(report.gaps.is_empty());
        assert!(detect_gaps(&[]).skipped.is_some());
    }
}
