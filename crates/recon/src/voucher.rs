//! Composite voucher identifiers: an optional type prefix plus a numeric
//! sequence suffix (`记-12`, `PZ_0007`, `305`).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoucherId {
    Parsed { prefix: String, number: u64 },
    Unparsed,
}

/// Split a raw id into prefix and number.
///
/// The number is the maximal trailing run of ASCII digits. The prefix is
/// whatever precedes it, minus one trailing `-` or `_`, trimmed. Numeric
/// ids exported as floats (`"12.0"`) are read as their integer.
pub fn parse_voucher_id(raw: &str) -> VoucherId {
    let s = strip_float_suffix(raw.trim());
    let digits_start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    let Some(start) = digits_start else {
        return VoucherId::Unparsed;
    };
    let Ok(number) = s[start..].parse::<u64>() else {
        return VoucherId::Unparsed;
    };

    let head = s[..start].trim_end();
    let head = head
        .strip_suffix('-')
        .or_else(|| head.strip_suffix('_'))
        .unwrap_or(head);

    VoucherId::Parsed {
        prefix: head.trim().to_string(),
        number,
    }
}

fn strip_float_suffix(s: &str) -> &str {
    match s.split_once('.') {
        Some((int, frac))
            if !int.is_empty()
                && int.bytes().all(|b| b.is_ascii_digit())
                && !frac.is_empty()
                && frac.bytes().all(|b| b == b'0') =>
        {
            int
        }
        _ => s,
    }
}

/// Display form of one sequence member: `{prefix}-{n}`, or `{n}` alone.
pub fn render_id(prefix: &str, number: u64) -> String {
    if prefix.is_empty() {
        number.to_string()
    } else {
        format!("{prefix}-{number}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(prefix: &str, number: u64) -> VoucherId {
        VoucherId::Parsed {
            prefix: prefix.to_string(),
            number,
        }
    }

    #[test]
    fn parse_table() {
        let cases = [
            ("记-12", parsed("记", 12)),
            ("PZ_0007", parsed("PZ", 7)),
            ("收-001", parsed("收", 1)),
            ("AB12", parsed("AB", 12)),
            ("305", parsed("", 305)),
            (" 42 ", parsed("", 42)),
            ("12.0", parsed("", 12)),
            ("转 - 8", parsed("转", 8)),
            ("X-1-15", parsed("X-1", 15)),
            ("记--3", parsed("记-", 3)),
            ("记", VoucherId::Unparsed),
            ("", VoucherId::Unparsed),
            ("12a", VoucherId::Unparsed),
            ("99999999999999999999999", VoucherId::Unparsed),
        ];
        for (raw, expected) in cases {
            assert_eq!(parse_voucher_id(raw), expected, "input {raw:?}");
        }
    }

    #[test]
    fn renders_with_and_without_prefix() {
        assert_eq!(render_id("记", 4), "记-4");
        assert_eq!(render_id("", 4), "4");
    }
}
