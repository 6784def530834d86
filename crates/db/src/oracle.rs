use async_trait::async_trait;
use crosscheck_core::domain::customer::{CustomerId, CustomerRecord, PersistedCustomer};
use crosscheck_core::errors::OracleError;
use crosscheck_core::ports::PersistenceOracle;
use sqlx::{sqlite::SqliteRow, Row};

use crate::DbPool;

/// Reads the `customers` table directly, bypassing the service under test.
pub struct SqlCustomerOracle {
    pool: DbPool,
}

impl SqlCustomerOracle {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceOracle for SqlCustomerOracle {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>, OracleError> {
        let row = sqlx::query(
            r#"
            SELECT customer_id, name, address, email, status
            FROM customers
            WHERE customer_id = ?
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(|r| customer_from_row(&r)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, OracleError> {
        let row = sqlx::query(
            r#"
            SELECT customer_id, name, address, email, status
            FROM customers
            WHERE email = ?
            ORDER BY customer_id
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(|r| customer_from_row(&r)).transpose()
    }

    async fn count_by_email(&self, email: &str) -> Result<u64, OracleError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        u64::try_from(count).map_err(|_| OracleError::Decode(format!("negative row count {count}")))
    }

    async fn exists_by_id(&self, id: CustomerId) -> Result<bool, OracleError> {
        let present: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE customer_id = ?)")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(query_error)?;

        Ok(present != 0)
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<CustomerRecord, OracleError> {
    let decode = |err: sqlx::Error| OracleError::Decode(err.to_string());

    let persisted = PersistedCustomer {
        customer_id: row.try_get("customer_id").map_err(decode)?,
        name: row.try_get("name").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        status: row.try_get("status").map_err(decode)?,
    };

    Ok(persisted.into())
}

fn query_error(err: sqlx::Error) -> OracleError {
    OracleError::Query(err.to_string())
}

#[cfg(test)]
mod tests {
    use crosscheck_core::domain::customer::{CustomerId, CustomerRecord};
    use crosscheck_core::errors::OracleError;
    use crosscheck_core::ports::PersistenceOracle;

    use super::SqlCustomerOracle;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 1).await.expect("pool");
        sqlx::query(
            r#"
            CREATE TABLE customers (
                customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                address TEXT,
                email TEXT NOT NULL UNIQUE,
                status BOOLEAN NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .expect("create customers");
        pool
    }

    async fn insert(pool: &DbPool, name: &str, address: Option<&str>, email: &str, status: bool) -> i64 {
        sqlx::query("INSERT INTO customers (name, address, email, status) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(address)
            .bind(email)
            .bind(status)
            .execute(pool)
            .await
            .expect("insert customer")
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn reads_rows_by_id_and_email() {
        let pool = setup_pool().await;
        let id = insert(&pool, "Alice", Some("Stockholm"), "alice@test.com", true).await;
        let oracle = SqlCustomerOracle::new(pool);

        let expected = CustomerRecord {
            id: CustomerId(id),
            name: "Alice".to_string(),
            address: Some("Stockholm".to_string()),
            email: "alice@test.com".to_string(),
            active: true,
        };
        assert_eq!(oracle.find_by_id(CustomerId(id)).await.expect("by id"), Some(expected.clone()));
        assert_eq!(oracle.find_by_email("alice@test.com").await.expect("by email"), Some(expected));
        assert_eq!(oracle.count_by_email("alice@test.com").await.expect("count"), 1);
        assert!(oracle.exists_by_id(CustomerId(id)).await.expect("exists"));
    }

    #[tokio::test]
    async fn absent_rows_are_none_not_errors() {
        let pool = setup_pool().await;
        insert(&pool, "Bob", None, "bob@test.com", false).await;
        let oracle = SqlCustomerOracle::new(pool);

        assert_eq!(oracle.find_by_id(CustomerId(999)).await.expect("by id"), None);
        assert_eq!(oracle.find_by_email("nobody@test.com").await.expect("by email"), None);
        assert_eq!(oracle.count_by_email("nobody@test.com").await.expect("count"), 0);
        assert!(!oracle.exists_by_id(CustomerId(999)).await.expect("exists"));

        let bob = oracle.find_by_email("bob@test.com").await.expect("by email").expect("bob row");
        assert_eq!(bob.address, None);
        assert!(!bob.active);
    }

    #[tokio::test]
    async fn missing_table_surfaces_as_query_error() {
        let pool = connect_with_settings("sqlite::memory:", 1, 1).await.expect("pool");
        let oracle = SqlCustomerOracle::new(pool);

        let result = oracle.find_by_id(CustomerId(1)).await;
        assert!(matches!(result, Err(OracleError::Query(_))), "{result:?}");
    }
}
