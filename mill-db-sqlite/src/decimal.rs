use mill_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::{Row, TypeInfo, ValueRef};

/// Get a decimal value from a row.
///
/// Amounts are written as TEXT so they round-trip exactly, but INTEGER and
/// REAL cells (rows written by hand or by older tooling) are accepted too.
pub fn get_decimal(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    let type_info = value_ref.type_info();
    let type_name = type_info.name();

    match type_name {
        "TEXT" => {
            let val: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
            })?;
            val.trim().parse::<Decimal>().map_err(|e| {
                RepositoryError::Database(format!("Failed to parse decimal '{}': {}", val, e))
            })
        }
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to get INTEGER from '{}': {}",
                    column, e
                ))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        "NULL" => Err(RepositoryError::Database(format!(
            "Column '{}' is NULL",
            column
        ))),
        _ => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            type_name, column
        ))),
    }
}

/// Convert a Decimal to its exact text form for storage.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> sqlx::sqlite::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE test_decimals (
                id INTEGER PRIMARY KEY,
                value
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn fetch(
        pool: &sqlx::sqlite::SqlitePool,
        insert: &str,
    ) -> sqlx::sqlite::SqliteRow {
        sqlx::query(insert)
            .execute(pool)
            .await
            .expect("Failed to insert test data");
        sqlx::query("SELECT value FROM test_decimals WHERE id = 1")
            .fetch_one(pool)
            .await
            .expect("Failed to fetch row")
    }

    #[tokio::test]
    async fn test_get_decimal_from_text() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, '0.50')").await;

        assert_eq!(get_decimal(&row, "value"), Ok(dec!(0.50)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_integer() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 540)").await;

        assert_eq!(get_decimal(&row, "value"), Ok(dec!(540)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_real() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 1.5)").await;

        assert_eq!(get_decimal(&row, "value"), Ok(dec!(1.5)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_null_is_error() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, NULL)").await;

        assert!(matches!(
            get_decimal(&row, "value"),
            Err(RepositoryError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_get_decimal_from_garbage_text_is_error() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 'abc')").await;

        assert!(get_decimal(&row, "value").is_err());
    }

    #[tokio::test]
    async fn test_get_decimal_missing_column() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO test_decimals VALUES (1, 1)").await;

        assert!(get_decimal(&row, "nope").is_err());
    }

    #[test]
    fn test_decimal_to_text_is_exact() {
        assert_eq!(decimal_to_text(dec!(0.10)), "0.10");
        assert_eq!(decimal_to_text(dec!(33.3333333333)), "33.3333333333");
    }
}
