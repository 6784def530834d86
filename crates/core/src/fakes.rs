//! In-memory stand-ins for the service under test and its store.
//!
//! `ServiceBehavior` switches on known service bugs so the verifier can be
//! shown to catch them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::customer::{CustomerDraft, CustomerId, CustomerRecord, Field, WireCustomer};
use crate::domain::http::{HttpMethod, HttpRequest, HttpResponse, APPLICATION_JSON, CONTENT_TYPE};
use crate::errors::{OracleError, TransportError};
use crate::ports::{HttpAdapter, PersistenceOracle};

const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 100;
const ADDRESS_MAX: usize = 255;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreWriteError {
    #[error("email `{0}` is already taken")]
    DuplicateEmail(String),
    #[error("column `{0}` is not nullable")]
    MissingField(Field),
    #[error("customer {0} not found")]
    NotFound(CustomerId),
}

struct Row {
    current: Option<CustomerRecord>,
    stale: Option<CustomerRecord>,
    visible_at: Instant,
}

impl Row {
    fn visible(&self, now: Instant) -> Option<&CustomerRecord> {
        if now >= self.visible_at {
            self.current.as_ref()
        } else {
            self.stale.as_ref()
        }
    }
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

impl StoreState {
    fn email_taken(&self, email: &str, except: Option<CustomerId>) -> bool {
        self.rows.values().filter_map(|row| row.current.as_ref()).any(|record| {
            record.email == email && Some(record.id) != except
        })
    }

    fn push(&mut self, draft: &CustomerDraft, lag: Duration) -> Result<CustomerRecord, StoreWriteError> {
        let name = draft.name.clone().ok_or(StoreWriteError::MissingField(Field::Name))?;
        let email = draft.email.clone().ok_or(StoreWriteError::MissingField(Field::Email))?;
        self.next_id += 1;
        let record = CustomerRecord {
            id: CustomerId(self.next_id),
            name,
            address: draft.address.clone(),
            email,
            active: draft.active,
        };
        self.rows.insert(
            self.next_id,
            Row { current: Some(record.clone()), stale: None, visible_at: Instant::now() + lag },
        );
        Ok(record)
    }
}

/// Customer table whose writes become visible to readers after `lag`.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    state: RwLock<StoreState>,
    lag: Duration,
    unavailable: AtomicBool,
}

impl InMemoryCustomerStore {
    pub fn with_visibility_lag(lag: Duration) -> Self {
        Self { lag, ..Self::default() }
    }

    /// Makes every oracle read fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn insert(&self, draft: &CustomerDraft) -> Result<CustomerRecord, StoreWriteError> {
        let mut state = self.state.write().await;
        if let Some(email) = draft.email.as_deref() {
            if state.email_taken(email, None) {
                return Err(StoreWriteError::DuplicateEmail(email.to_string()));
            }
        }
        state.push(draft, self.lag)
    }

    /// Inserts without the unique-email constraint, as a broken schema would.
    pub async fn force_insert(&self, draft: &CustomerDraft) -> Result<CustomerRecord, StoreWriteError> {
        let mut state = self.state.write().await;
        state.push(draft, self.lag)
    }

    pub async fn replace(&self, record: &CustomerRecord) -> Result<CustomerRecord, StoreWriteError> {
        let mut state = self.state.write().await;
        if state.email_taken(&record.email, Some(record.id)) {
            return Err(StoreWriteError::DuplicateEmail(record.email.clone()));
        }
        let now = Instant::now();
        let row = state
            .rows
            .get_mut(&record.id.0)
            .filter(|row| row.current.is_some())
            .ok_or(StoreWriteError::NotFound(record.id))?;
        row.stale = row.visible(now).cloned();
        row.current = Some(record.clone());
        row.visible_at = now + self.lag;
        Ok(record.clone())
    }

    pub async fn remove(&self, id: CustomerId) -> bool {
        let mut state = self.state.write().await;
        let now = Instant::now();
        match state.rows.get_mut(&id.0) {
            Some(row) if row.current.is_some() => {
                row.stale = row.visible(now).cloned();
                row.current = None;
                row.visible_at = now + self.lag;
                true
            }
            _ => false,
        }
    }

    async fn current(&self, id: CustomerId) -> Option<CustomerRecord> {
        let state = self.state.read().await;
        state.rows.get(&id.0).and_then(|row| row.current.clone())
    }

    fn check_available(&self) -> Result<(), OracleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Query("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceOracle for InMemoryCustomerStore {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>, OracleError> {
        self.check_available()?;
        let state = self.state.read().await;
        let now = Instant::now();
        Ok(state.rows.get(&id.0).and_then(|row| row.visible(now)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, OracleError> {
        self.check_available()?;
        let state = self.state.read().await;
        let now = Instant::now();
        Ok(state
            .rows
            .values()
            .filter_map(|row| row.visible(now))
            .find(|record| record.email == email)
            .cloned())
    }

    async fn count_by_email(&self, email: &str) -> Result<u64, OracleError> {
        self.check_available()?;
        let state = self.state.read().await;
        let now = Instant::now();
        let count =
            state.rows.values().filter_map(|row| row.visible(now)).filter(|r| r.email == email).count();
        Ok(count as u64)
    }
}

/// Switches for the in-memory service. The default is a well-behaved service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceBehavior {
    pub persist_invalid: bool,
    pub ignore_updates: bool,
    pub sanitize_markup: bool,
    pub reject_sql_metacharacters: bool,
    pub enforce_unique_email: bool,
    pub duplicate_status: u16,
    pub validation_status: u16,
}

impl Default for ServiceBehavior {
    fn default() -> Self {
        Self {
            persist_invalid: false,
            ignore_updates: false,
            sanitize_markup: true,
            reject_sql_metacharacters: true,
            enforce_unique_email: true,
            duplicate_status: 409,
            validation_status: 400,
        }
    }
}

enum Route {
    Collection,
    Item(CustomerId),
}

/// Customer CRUD service answering over the [`HttpAdapter`] port.
pub struct InMemoryCustomerService {
    store: Arc<InMemoryCustomerStore>,
    endpoint: String,
    behavior: ServiceBehavior,
    served: AtomicUsize,
}

impl InMemoryCustomerService {
    pub fn new(store: Arc<InMemoryCustomerStore>, endpoint: impl Into<String>) -> Self {
        Self::with_behavior(store, endpoint, ServiceBehavior::default())
    }

    pub fn with_behavior(
        store: Arc<InMemoryCustomerStore>,
        endpoint: impl Into<String>,
        behavior: ServiceBehavior,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { store, endpoint, behavior, served: AtomicUsize::new(0) }
    }

    pub fn requests_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    fn route(&self, path: &str) -> Option<Route> {
        let rest = path.strip_prefix(self.endpoint.as_str())?;
        match rest.trim_end_matches('/') {
            "" => Some(Route::Collection),
            item => item.strip_prefix('/')?.parse::<i64>().ok().map(|id| Route::Item(CustomerId(id))),
        }
    }

    async fn create(&self, request: &HttpRequest) -> HttpResponse {
        let wire = match parse_body(request) {
            Ok(wire) => wire,
            Err(response) => return response,
        };
        let draft = match self.validate(&wire) {
            Ok(draft) => draft,
            Err(message) => return self.reject_invalid(&wire, &message).await,
        };
        let inserted = if self.behavior.enforce_unique_email {
            self.store.insert(&draft).await
        } else {
            self.store.force_insert(&draft).await
        };
        match inserted {
            Ok(record) => echo(200, &record),
            Err(StoreWriteError::DuplicateEmail(email)) => error_response(
                self.behavior.duplicate_status,
                &format!("email `{email}` is already registered"),
            ),
            Err(error) => error_response(self.behavior.validation_status, &error.to_string()),
        }
    }

    async fn update(&self, id: CustomerId, request: &HttpRequest) -> HttpResponse {
        let wire = match parse_body(request) {
            Ok(wire) => wire,
            Err(response) => return response,
        };
        let draft = match self.validate(&wire) {
            Ok(draft) => draft,
            Err(message) => return error_response(self.behavior.validation_status, &message),
        };
        if self.store.current(id).await.is_none() {
            return error_response(404, &format!("customer {id} not found"));
        }
        let intended = CustomerRecord {
            id,
            name: draft.name.unwrap_or_default(),
            address: draft.address,
            email: draft.email.unwrap_or_default(),
            active: draft.active,
        };
        if self.behavior.ignore_updates {
            return echo(200, &intended);
        }
        match self.store.replace(&intended).await {
            Ok(record) => echo(200, &record),
            Err(StoreWriteError::NotFound(_)) => error_response(404, &format!("customer {id} not found")),
            Err(error) => error_response(self.behavior.duplicate_status, &error.to_string()),
        }
    }

    async fn read(&self, id: CustomerId) -> HttpResponse {
        match self.store.current(id).await {
            Some(record) => echo(200, &record),
            None => error_response(404, &format!("customer {id} not found")),
        }
    }

    async fn delete(&self, id: CustomerId) -> HttpResponse {
        if self.store.remove(id).await {
            HttpResponse::new(200)
        } else {
            error_response(404, &format!("customer {id} not found"))
        }
    }

    async fn reject_invalid(&self, wire: &WireCustomer, message: &str) -> HttpResponse {
        if self.behavior.persist_invalid {
            let leaked = CustomerDraft {
                name: wire.name.clone(),
                address: wire.address.clone(),
                email: wire.email.clone(),
                active: wire.active.unwrap_or(false),
            };
            let _ = self.store.insert(&leaked).await;
        }
        error_response(self.behavior.validation_status, message)
    }

    fn validate(&self, wire: &WireCustomer) -> Result<CustomerDraft, String> {
        let name = wire.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err("name is required".to_string());
        }
        if name.chars().count() > NAME_MAX {
            return Err(format!("name must be at most {NAME_MAX} characters"));
        }
        if self.behavior.reject_sql_metacharacters
            && (name.contains(';') || name.contains("--"))
        {
            return Err("name contains forbidden characters".to_string());
        }

        let email = wire.email.as_deref().unwrap_or_default();
        if email.is_empty() {
            return Err("email is required".to_string());
        }
        if email.chars().count() > EMAIL_MAX || !well_formed_email(email) {
            return Err("email is not valid".to_string());
        }

        if wire.address.as_deref().is_some_and(|address| address.chars().count() > ADDRESS_MAX) {
            return Err(format!("address must be at most {ADDRESS_MAX} characters"));
        }

        let name = if self.behavior.sanitize_markup {
            name.replace('<', "&lt;").replace('>', "&gt;")
        } else {
            name.to_string()
        };

        Ok(CustomerDraft {
            name: Some(name),
            address: wire.address.clone(),
            email: Some(email.to_string()),
            active: wire.active.unwrap_or(false),
        })
    }
}

#[async_trait]
impl HttpAdapter for InMemoryCustomerService {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.served.fetch_add(1, Ordering::SeqCst);
        let Some(route) = self.route(&request.path) else {
            return Ok(error_response(404, &format!("no route for `{}`", request.path)));
        };
        let response = match (request.method, route) {
            (HttpMethod::Post, Route::Collection) => self.create(&request).await,
            (method, Route::Collection) => {
                error_response(405, &format!("{method} is not supported on the collection"))
            }
            (HttpMethod::Get, Route::Item(id)) => self.read(id).await,
            (HttpMethod::Put, Route::Item(id)) => self.update(id, &request).await,
            (HttpMethod::Delete, Route::Item(id)) => self.delete(id).await,
            (HttpMethod::Post, Route::Item(_)) => {
                error_response(405, "POST is not supported on a single customer")
            }
        };
        Ok(response)
    }
}

fn parse_body(request: &HttpRequest) -> Result<WireCustomer, HttpResponse> {
    let media = request
        .header(CONTENT_TYPE)
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if !media.eq_ignore_ascii_case(APPLICATION_JSON) {
        return Err(error_response(415, &format!("content type `{media}` is not supported")));
    }
    let body = request.body.as_deref().unwrap_or_default();
    serde_json::from_str(body)
        .map_err(|error| error_response(400, &format!("malformed request body: {error}")))
}

fn well_formed_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

fn echo(status: u16, record: &CustomerRecord) -> HttpResponse {
    HttpResponse::new(status)
        .with_header(CONTENT_TYPE, APPLICATION_JSON)
        .with_body(record.to_json_literal())
}

fn error_response(status: u16, message: &str) -> HttpResponse {
    let reason = match status {
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        _ => "Error",
    };
    HttpResponse::json(status, &json!({ "status": status, "error": reason, "message": message }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::customer::{CustomerDraft, WireCustomer};
    use crate::domain::http::{HttpMethod, HttpRequest};
    use crate::fakes::{InMemoryCustomerService, InMemoryCustomerStore, ServiceBehavior};
    use crate::ports::{HttpAdapter, PersistenceOracle};

    const ENDPOINT: &str = "/api/customer";

    fn service() -> (Arc<InMemoryCustomerStore>, InMemoryCustomerService) {
        let store = Arc::new(InMemoryCustomerStore::default());
        let service = InMemoryCustomerService::new(Arc::clone(&store), ENDPOINT);
        (store, service)
    }

    fn post(body: &str) -> HttpRequest {
        HttpRequest::json(HttpMethod::Post, ENDPOINT, body)
    }

    #[tokio::test]
    async fn create_assigns_id_and_persists() {
        let (store, service) = service();
        let draft = CustomerDraft::new("Alice", "Stockholm", "alice@test.com", true);

        let response = service.send(post(&draft.to_json_literal())).await.expect("send");
        let wire: WireCustomer = response.decode().expect("decode");
        let record = wire.into_record().expect("complete");

        assert_eq!(response.status, 200);
        assert!(record.id.is_assigned());
        assert_eq!(store.find_by_id(record.id).await.expect("read"), Some(record));
    }

    #[tokio::test]
    async fn malformed_json_and_bad_email_are_rejected() {
        let (store, service) = service();

        let trailing = service
            .send(post(r#"{"name":"testName","email":"test@gmail.com",}"#))
            .await
            .expect("send");
        let invalid = service
            .send(post(&CustomerDraft::new("testName", "Stockholm", "test@@gmail.com", true).to_json_literal()))
            .await
            .expect("send");

        assert_eq!(trailing.status, 400);
        assert!(trailing.is_json());
        assert_eq!(invalid.status, 400);
        assert_eq!(store.count_by_email("test@@gmail.com").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn collection_get_and_plain_text_use_their_status_codes() {
        let (_, service) = service();

        let get = service.send(HttpRequest::new(HttpMethod::Get, ENDPOINT)).await.expect("send");
        let plain = service
            .send(post("name=testName").with_content_type("text/plain"))
            .await
            .expect("send");

        assert_eq!(get.status, 405);
        assert_eq!(plain.status, 415);
    }

    #[tokio::test]
    async fn duplicate_email_answers_with_configured_status() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let service = InMemoryCustomerService::with_behavior(
            Arc::clone(&store),
            ENDPOINT,
            ServiceBehavior { duplicate_status: 400, ..ServiceBehavior::default() },
        );
        let body = CustomerDraft::new("Bob", "Oslo", "dup@test.com", true).to_json_literal();

        let first = service.send(post(&body)).await.expect("send");
        let second = service.send(post(&body)).await.expect("send");

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 400);
        assert_eq!(store.count_by_email("dup@test.com").await.expect("count"), 1);
    }

    #[tokio::test]
    async fn markup_is_escaped_and_null_status_defaults_to_inactive() {
        let (_, service) = service();

        let xss = service
            .send(post(r#"{"name":"<b>x</b>","email":"xss@test.com","status":true}"#))
            .await
            .expect("send");
        let null_status = service
            .send(post(r#"{"name":"Test Customer","address":"Stockholm","email":"nullstatus@test.com","status":null}"#))
            .await
            .expect("send");

        let xss: WireCustomer = xss.decode().expect("decode");
        let null_status: WireCustomer = null_status.decode().expect("decode");
        assert_eq!(xss.name.as_deref(), Some("&lt;b&gt;x&lt;/b&gt;"));
        assert_eq!(null_status.active, Some(false));
    }

    #[tokio::test]
    async fn leaky_service_persists_rejected_input() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let service = InMemoryCustomerService::with_behavior(
            Arc::clone(&store),
            ENDPOINT,
            ServiceBehavior { persist_invalid: true, ..ServiceBehavior::default() },
        );

        let response = service
            .send(post(&CustomerDraft::new("testName", "Stockholm", "testgmail.com", true).to_json_literal()))
            .await
            .expect("send");

        assert_eq!(response.status, 400);
        assert!(store.find_by_email("testgmail.com").await.expect("read").is_some());
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (_, service) = service();
        let created = service
            .send(post(&CustomerDraft::new("Alice", "Stockholm", "alice@test.com", true).to_json_literal()))
            .await
            .expect("send");
        let id = created.decode::<WireCustomer>().expect("decode").customer_id.expect("id");
        let item = format!("{ENDPOINT}/{id}");

        let deleted = service.send(HttpRequest::new(HttpMethod::Delete, &item)).await.expect("send");
        let again = service.send(HttpRequest::new(HttpMethod::Delete, &item)).await.expect("send");
        let read = service.send(HttpRequest::new(HttpMethod::Get, &item)).await.expect("send");

        assert_eq!(deleted.status, 200);
        assert_eq!(again.status, 404);
        assert_eq!(read.status, 404);
        assert_eq!(service.requests_served(), 4);
    }
}
