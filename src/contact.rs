use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote primary key, normalized to text so integer and string ids share one key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for ExternalId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapped attributes of one remote partner, ready to be written locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAttributes {
    pub external_id: ExternalId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl ContactAttributes {
    pub fn new(external_id: impl Into<ExternalId>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            email: None,
            phone: None,
            street: None,
            city: None,
            zip_code: None,
            country: None,
        }
    }
}

/// A locally stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Local row id, assigned by the store.
    pub id: i64,
    pub external_id: ExternalId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

impl Contact {
    /// Overwrites every mutable field. `external_id` and `id` stay as they are.
    pub fn apply(&mut self, attrs: ContactAttributes, synced_at: DateTime<Utc>) {
        self.name = attrs.name;
        self.email = attrs.email;
        self.phone = attrs.phone;
        self.street = attrs.street;
        self.city = attrs.city;
        self.zip_code = attrs.zip_code;
        self.country = attrs.country;
        self.last_synced_at = synced_at;
    }

    pub fn attributes(&self) -> ContactAttributes {
        ContactAttributes {
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            zip_code: self.zip_code.clone(),
            country: self.country.clone(),
        }
    }
}

/// Counts reported at the end of a reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.failed
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "created={} updated={} failed={}", self.created, self.updated, self.failed)
    }
}
