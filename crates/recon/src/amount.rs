//! Amount text → number coercion and the tolerance helpers shared by the
//! matcher and the balance verifier.
//!
//! Amounts never abort a run: blanks, header echoes and garbage all become
//! `0.0`, and [`Coercion`] counts what was substituted so reports can
//! disclose it.

/// Cell values that are column titles repeated inside the data area
/// (sub-header rows, "nan" from upstream exports). They read as zero.
pub const HEADER_ECHO_TOKENS: [&str; 6] = ["本币", "原币", "币种", "科目编码", "nan", "NaN"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedAmount {
    Value(f64),
    Blank,
    HeaderEcho,
    Unparsable,
}

/// Parse one amount cell: `"1,234.50"`, `"- 12.00"`, `"-7"`, `""`.
pub fn parse_amount(raw: &str) -> ParsedAmount {
    let s = raw.trim();
    if s.is_empty() {
        return ParsedAmount::Blank;
    }
    if HEADER_ECHO_TOKENS.contains(&s) {
        return ParsedAmount::HeaderEcho;
    }

    let mut cleaned = s.replace(',', "");
    if let Some(rest) = cleaned.strip_prefix("- ") {
        cleaned = format!("-{}", rest.trim_start());
    }

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => ParsedAmount::Value(v),
        _ => ParsedAmount::Unparsable,
    }
}

/// Running tally of substituted amounts for one pass over a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coercion {
    pub unparsable: usize,
    pub header_echo: usize,
}

impl Coercion {
    pub fn coerce(&mut self, raw: &str) -> f64 {
        match parse_amount(raw) {
            ParsedAmount::Value(v) => v,
            ParsedAmount::Blank => 0.0,
            ParsedAmount::HeaderEcho => {
                self.header_echo += 1;
                0.0
            }
            ParsedAmount::Unparsable => {
                log::warn!("cannot parse amount '{raw}', using 0");
                self.unparsable += 1;
                0.0
            }
        }
    }
}

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Slack for binary float residue, far below a cent.
const FLOAT_SLACK: f64 = 1e-9;

/// `|delta| <= tolerance`: inside tolerance counts as no difference.
/// `100.01 - 100.00` is `0.010000000000005116` in f64 and still counts as
/// inside a 0.01 tolerance.
pub fn within_tolerance(delta: f64, tolerance: f64) -> bool {
    delta.abs() <= tolerance + FLOAT_SLACK
}
