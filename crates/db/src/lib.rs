pub mod connection;
pub mod oracle;
pub mod schema;

pub use connection::{connect_oracle, connect_with_settings, DbPool};
pub use oracle::SqlCustomerOracle;
pub use schema::{customers_table_present, missing_columns};
