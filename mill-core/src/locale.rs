//! Regional number handling: parsing operator input, the masked sample
//! field, and display formatting.
//!
//! The mill works in the Brazilian convention by default: `,` is the decimal
//! mark and `.` groups thousands (`1.234,5`).

use std::fmt;

use chrono::{DateTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_half_up;

/// Digits kept by the masked sample field; further keystrokes are ignored.
pub const MAX_MASKED_DIGITS: usize = 15;

/// Error returned when text cannot be parsed as a localized number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid number '{input}'")]
pub struct ParseError {
    input: String,
}

impl ParseError {
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Decimal mark and digit grouping convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberLocale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl NumberLocale {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PtBr => "pt-BR",
            Self::EnUs => "en-US",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "pt-BR" | "pt_BR" => Some(Self::PtBr),
            "en-US" | "en_US" => Some(Self::EnUs),
            _ => None,
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            Self::PtBr => ',',
            Self::EnUs => '.',
        }
    }

    pub fn grouping_separator(&self) -> char {
        match self {
            Self::PtBr => '.',
            Self::EnUs => ',',
        }
    }

    /// Parses operator text such as `"1.234,50"` into a [`Decimal`].
    ///
    /// Grouping separators are stripped and the decimal mark is normalized
    /// before parsing. Empty or whitespace-only input is treated as 0 (no
    /// sample provided). Anything else that is not a plain signed number is
    /// an error.
    pub fn parse_decimal(
        &self,
        text: &str,
    ) -> Result<Decimal, ParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != self.grouping_separator())
            .map(|c| if c == self.decimal_separator() { '.' } else { c })
            .collect();

        if !is_plain_number(&normalized) {
            tracing::warn!(input = %text, locale = self.code(), "rejected numeric input");
            return Err(ParseError {
                input: text.to_string(),
            });
        }

        normalized.parse().map_err(|e| {
            tracing::warn!(input = %text, "invalid decimal: {}", e);
            ParseError {
                input: text.to_string(),
            }
        })
    }

    /// Renders `value` with grouping and between `min_fraction` and
    /// `max_fraction` fraction digits. Trailing zeros beyond `min_fraction`
    /// are dropped; midpoints round away from zero.
    pub fn format_decimal(
        &self,
        value: Decimal,
        min_fraction: u32,
        max_fraction: u32,
    ) -> String {
        let rounded = round_half_up(value, max_fraction);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let plain = rounded.abs().to_string();
        let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

        let mut fraction = fraction.trim_end_matches('0').to_string();
        while fraction.len() < min_fraction as usize {
            fraction.push('0');
        }

        let mut out = String::with_capacity(plain.len() + whole.len() / 3 + 2);
        if negative {
            out.push('-');
        }
        out.push_str(&group_digits(whole, self.grouping_separator()));
        if !fraction.is_empty() {
            out.push(self.decimal_separator());
            out.push_str(&fraction);
        }
        out
    }

    /// Hourly rate for a result card: grouping, at most one fraction digit.
    pub fn format_rate(
        &self,
        value: Decimal,
    ) -> String {
        self.format_decimal(value, 0, 1)
    }

    /// Yield for a result card, e.g. `75%` or `33,3%`.
    pub fn format_yield(
        &self,
        value: Decimal,
    ) -> String {
        format!("{}%", self.format_decimal(value, 0, 1))
    }

    /// Always exactly `digits` fraction digits, e.g. the history badge `75,0`.
    pub fn format_fixed(
        &self,
        value: Decimal,
        digits: u32,
    ) -> String {
        self.format_decimal(value, digits, digits)
    }

    /// Rounded to whole units with grouping, e.g. `1.080`.
    pub fn format_whole(
        &self,
        value: Decimal,
    ) -> String {
        self.format_decimal(value, 0, 0)
    }

    /// Calendar rendering of a stored timestamp in the zone it carries.
    pub fn format_timestamp<Tz>(
        &self,
        timestamp: &DateTime<Tz>,
    ) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let pattern = match self {
            Self::PtBr => "%d/%m/%Y %H:%M",
            Self::EnUs => "%m/%d/%Y %H:%M",
        };
        timestamp.format(pattern).to_string()
    }

    /// Re-renders a masked field from whatever the operator has typed.
    ///
    /// Every digit in `raw` is kept, everything else is ignored, and the
    /// accumulated digits are shown as hundredths: `"123"` becomes `"1,23"`.
    /// Returns an empty string when `raw` has no digits. Formatting the
    /// digits of a previous output reproduces that output.
    pub fn format_masked_input(
        &self,
        raw: &str,
    ) -> String {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return String::new();
        }

        let significant = digits.trim_start_matches('0');
        let kept = &significant[..significant.len().min(MAX_MASKED_DIGITS)];
        let hundredths = if kept.is_empty() {
            0
        } else {
            // 1 to 15 ASCII digits, always fits an i64.
            kept.parse::<i64>().unwrap_or_default()
        };

        self.format_decimal(Decimal::new(hundredths, 2), 2, 2)
    }
}

impl fmt::Display for NumberLocale {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Optional sign, digits, at most one `.`, at least one digit.
fn is_plain_number(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let mut seen_digit = false;
    let mut seen_point = false;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    seen_digit
}

fn group_digits(
    whole: &str,
    separator: char,
) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// A sample field that re-renders on every keystroke.
///
/// ```
/// use mill_core::MaskedInput;
///
/// let mut field = MaskedInput::default();
/// field.push('1');
/// field.push('2');
/// assert_eq!(field.push('3'), "1,23");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskedInput {
    locale: NumberLocale,
    display: String,
}

impl MaskedInput {
    pub fn new(locale: NumberLocale) -> Self {
        Self {
            locale,
            display: String::new(),
        }
    }

    /// Applies one keystroke and returns the new display.
    pub fn push(
        &mut self,
        key: char,
    ) -> &str {
        let mut raw = std::mem::take(&mut self.display);
        raw.push(key);
        self.display = self.locale.format_masked_input(&raw);
        &self.display
    }

    /// Removes the last typed digit.
    pub fn backspace(&mut self) -> &str {
        let mut digits: String = self.display.chars().filter(char::is_ascii_digit).collect();
        digits.pop();
        let remaining = digits.trim_start_matches('0');
        self.display = if remaining.is_empty() {
            String::new()
        } else {
            self.locale.format_masked_input(remaining)
        };
        &self.display
    }

    pub fn clear(&mut self) {
        self.display.clear();
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// The value currently shown, 0 when the field is empty.
    pub fn value(&self) -> Result<Decimal, ParseError> {
        self.locale.parse_decimal(&self.display)
    }
}
