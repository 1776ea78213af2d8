//! Plain-text views for the terminal.

use std::fmt::{self, Write};

use chrono::{DateTime, TimeZone};
use mill_core::calculations::common::round_half_up;
use mill_core::{CalculationResult, NumberLocale, SavedExtraction};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Characters in a full distribution bar.
pub const BAR_WIDTH: u32 = 20;

/// The four result cards: flour, bran and total kg/h plus the yield.
pub fn result_cards(
    locale: NumberLocale,
    result: &CalculationResult,
) -> String {
    let mut out = String::new();
    let rows = [
        ("Flour per hour", format!("{} kg/h", locale.format_rate(result.flour_per_hour))),
        ("Bran per hour", format!("{} kg/h", locale.format_rate(result.bran_per_hour))),
        ("Total per hour", format!("{} kg/h", locale.format_rate(result.total_per_hour))),
        ("Flour yield", locale.format_yield(result.yield_percentage)),
    ];
    for (label, value) in rows {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{label:<16}{value:>16}");
    }
    out
}

/// Flour/bran split as proportional bars.
pub fn distribution(
    locale: NumberLocale,
    result: &CalculationResult,
) -> String {
    let mut out = String::from("Distribution\n");
    for slice in result.distribution() {
        let filled = filled_cells(slice.share);
        let _ = writeln!(
            out,
            "  {:<6}{}{}  {}",
            slice.label,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH as usize - filled),
            locale.format_yield(slice.share)
        );
    }
    out
}

fn filled_cells(share: Decimal) -> usize {
    let share = share.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let cells = round_half_up(share * Decimal::from(BAR_WIDTH) / Decimal::ONE_HUNDRED, 0);
    cells.to_usize().unwrap_or(0).min(BAR_WIDTH as usize)
}

/// One history entry: date and yield badge, then both hourly rates.
pub fn history_entry<Tz>(
    locale: NumberLocale,
    entry: &SavedExtraction,
    zone: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let local: DateTime<Tz> = entry.created_at.with_timezone(zone);
    format!(
        "{}  [{}%]\n  Flour {}   Bran {}\n",
        locale.format_timestamp(&local),
        locale.format_fixed(entry.yield_percentage, 1),
        hourly_rate(locale, entry.flour_per_hour()),
        hourly_rate(locale, entry.bran_per_hour()),
    )
}

fn hourly_rate(
    locale: NumberLocale,
    rate: Option<Decimal>,
) -> String {
    match rate {
        Some(rate) => format!("{} kg/h", locale.format_whole(rate)),
        None => "out of range".to_string(),
    }
}
