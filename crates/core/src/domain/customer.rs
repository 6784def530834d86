use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Identifier assigned by the service under test. `0` is the unassigned default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl CustomerId {
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Address,
    Email,
    Active,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Address => "address",
            Self::Email => "email",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape shared by the wire and persisted views once they are normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub address: Option<String>,
    pub email: String,
    pub active: bool,
}

impl CustomerRecord {
    pub fn to_wire(&self) -> WireCustomer {
        WireCustomer {
            customer_id: Some(self.id),
            name: Some(self.name.clone()),
            address: self.address.clone(),
            email: Some(self.email.clone()),
            active: Some(self.active),
        }
    }

    pub fn to_json_literal(&self) -> String {
        json!({
            "customerId": self.id.0,
            "name": self.name,
            "address": self.address,
            "email": self.email,
            "status": self.active,
        })
        .to_string()
    }

    /// True when every caller-controlled field matches, ignoring the id.
    pub fn same_fields(&self, other: &CustomerRecord) -> bool {
        self.name == other.name
            && self.address == other.address
            && self.email == other.email
            && self.active == other.active
    }
}

/// Caller-supplied create/update input. Never carries an id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub active: bool,
}

impl CustomerDraft {
    pub fn new(name: &str, address: &str, email: &str, active: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            address: Some(address.to_string()),
            email: Some(email.to_string()),
            active,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn to_wire(&self) -> WireCustomer {
        WireCustomer {
            customer_id: None,
            name: self.name.clone(),
            address: self.address.clone(),
            email: self.email.clone(),
            active: Some(self.active),
        }
    }

    /// Literal JSON for the same logical input, as a transport-level body.
    pub fn to_json_literal(&self) -> String {
        json!({
            "name": self.name,
            "address": self.address,
            "email": self.email,
            "status": self.active,
        })
        .to_string()
    }
}

/// JSON shape exchanged with the service. Every field is optional on decode
/// so that partial or malformed responses can still be diffed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCustomer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "status")]
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("wire record is missing `{0}`")]
pub struct IncompleteRecord(pub Field);

impl WireCustomer {
    pub fn into_record(self) -> Result<CustomerRecord, IncompleteRecord> {
        let id = self.customer_id.ok_or(IncompleteRecord(Field::Id))?;
        let name = self.name.ok_or(IncompleteRecord(Field::Name))?;
        let email = self.email.ok_or(IncompleteRecord(Field::Email))?;
        let active = self.active.ok_or(IncompleteRecord(Field::Active))?;
        Ok(CustomerRecord { id, name, address: self.address, email, active })
    }
}

/// Row shape of the `customers` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedCustomer {
    pub customer_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub email: String,
    pub status: bool,
}

impl From<PersistedCustomer> for CustomerRecord {
    fn from(row: PersistedCustomer) -> Self {
        Self {
            id: CustomerId(row.customer_id),
            name: row.name,
            address: row.address,
            email: row.email,
            active: row.status,
        }
    }
}

/// Partial update applied to a confirmed record to build the next payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

impl CustomerPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn apply(&self, record: &CustomerRecord) -> CustomerRecord {
        CustomerRecord {
            id: record.id,
            name: self.name.clone().unwrap_or_else(|| record.name.clone()),
            address: self.address.clone().or_else(|| record.address.clone()),
            email: self.email.clone().unwrap_or_else(|| record.email.clone()),
            active: self.active.unwrap_or(record.active),
        }
    }
}
