use async_trait::async_trait;

use crate::domain::customer::{CustomerId, CustomerRecord};
use crate::domain::http::{HttpRequest, HttpResponse};
use crate::errors::{OracleError, TransportError};

/// Sends one request to the service under test. Any status code is a
/// successful send; only a missing response is an error.
#[async_trait]
pub trait HttpAdapter: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Read-only view of the store backing the service under test.
#[async_trait]
pub trait PersistenceOracle: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>, OracleError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, OracleError>;

    async fn count_by_email(&self, email: &str) -> Result<u64, OracleError>;

    async fn exists_by_id(&self, id: CustomerId) -> Result<bool, OracleError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}
