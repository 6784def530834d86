use sqlx::Row;

use crate::DbPool;

pub const CUSTOMERS_TABLE: &str = "customers";

/// Columns the oracle selects from `customers`.
pub const REQUIRED_COLUMNS: &[&str] = &["customer_id", "name", "address", "email", "status"];

pub async fn customers_table_present(pool: &DbPool) -> Result<bool, sqlx::Error> {
    let present: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(CUSTOMERS_TABLE)
    .fetch_one(pool)
    .await?;

    Ok(present > 0)
}

/// Required columns absent from `customers`. A missing table reports all of them.
pub async fn missing_columns(pool: &DbPool) -> Result<Vec<&'static str>, sqlx::Error> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?)")
        .bind(CUSTOMERS_TABLE)
        .fetch_all(pool)
        .await?;

    let mut present = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        present.push(name.to_ascii_lowercase());
    }

    Ok(REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !present.iter().any(|name| name == column))
        .collect())
}
