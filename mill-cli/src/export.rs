//! CSV export of an operator's extraction history.
//!
//! ## Columns
//!
//! | Column             | Notes                                  |
//! |--------------------|----------------------------------------|
//! | `id`               | store-assigned                         |
//! | `date`             | RFC 3339, UTC                          |
//! | `flour`, `bran`    | sample weights as entered (kg / 10 s)  |
//! | `flour_per_hour`   | kg/h                                   |
//! | `bran_per_hour`    | kg/h                                   |
//! | `yield_percentage` | flour share of the total, in %         |
//!
//! Decimals are written without trailing zeros. A rate column is left
//! empty when its stored sample is too large to project.
//! The decimal mark is always `.` so the file loads in any spreadsheet
//! locale.

use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;
use mill_core::SavedExtraction;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize)]
struct CsvRow {
    id: i64,
    date: String,
    flour: Decimal,
    bran: Decimal,
    /// Empty when the stored sample is too large to project.
    flour_per_hour: Option<Decimal>,
    bran_per_hour: Option<Decimal>,
    yield_percentage: Decimal,
}

impl From<&SavedExtraction> for CsvRow {
    fn from(entry: &SavedExtraction) -> Self {
        Self {
            id: entry.id,
            date: entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            flour: entry.flour,
            bran: entry.bran,
            flour_per_hour: entry.flour_per_hour().map(|r| r.normalize()),
            bran_per_hour: entry.bran_per_hour().map(|r| r.normalize()),
            yield_percentage: entry.yield_percentage.normalize(),
        }
    }
}

/// Writes a header and one row per record, in the given order.
/// Returns the number of rows written.
pub fn write_csv<W: Write>(
    writer: W,
    records: &[SavedExtraction],
) -> Result<usize, ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serde only emits the header alongside the first row.
        csv.write_record([
            "id",
            "date",
            "flour",
            "bran",
            "flour_per_hour",
            "bran_per_hour",
            "yield_percentage",
        ])?;
    }
    for entry in records {
        csv.serialize(CsvRow::from(entry))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(records.len())
}

/// Creates (or truncates) `path` and writes the export into it.
pub fn export_to_file(
    path: &Path,
    records: &[SavedExtraction],
) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv(file, records)
}
