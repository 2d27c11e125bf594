//! Converts untyped Odoo partner payloads into [`ContactAttributes`].
//!
//! Odoo renders empty scalar fields as `false` and many2one fields as an
//! `[id, "Display Name"]` pair; both conventions are handled here so nothing
//! downstream sees a raw `serde_json::Value`.

use crate::api::models::RawRecord;
use crate::contact::{ContactAttributes, ExternalId};
use crate::error::MappingError;
use serde_json::Value;

pub fn map(raw: &RawRecord) -> Result<ContactAttributes, MappingError> {
    let external_id = external_id(raw.get("id")).ok_or(MappingError::MissingExternalId)?;
    let name = text(raw.get("name")).ok_or_else(|| MappingError::MissingName {
        external_id: external_id.to_string(),
    })?;

    Ok(ContactAttributes {
        external_id,
        name,
        email: text(raw.get("email")),
        phone: text(raw.get("phone")),
        street: text(raw.get("street")),
        city: text(raw.get("city")),
        zip_code: text(raw.get("zip")),
        country: many2one_name(raw.get("country_id")),
    })
}

fn external_id(value: Option<&Value>) -> Option<ExternalId> {
    match value? {
        Value::Number(n) => n.as_i64().map(ExternalId::from),
        Value::String(s) if !s.trim().is_empty() => Some(ExternalId::new(s.trim())),
        _ => None,
    }
}

/// Trimmed, non-empty text. `null`, `false` and blanks are absent.
fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

fn many2one_name(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(pair) if pair.len() > 1 => text(pair.get(1)),
        _ => None,
    }
}
