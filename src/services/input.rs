//! Raw JSON input validation shared by the services

use serde_json::{Map, Value};

use crate::types::{PolicyError, Result};

/// Require the request body to be a JSON object
pub fn require_object(raw: &Value) -> Result<&Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| PolicyError::BadRequest("El cuerpo debe ser un objeto JSON".into()))
}

/// Whether a key is absent, null, or blank text
fn is_missing(map: &Map<String, Value>, field: &str) -> bool {
    match map.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Fail with every missing field named, in the order given
pub fn check_required(map: &Map<String, Value>, fields: &[&str]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| is_missing(map, f))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PolicyError::missing(&missing))
    }
}

/// Text value of a field already known to be present
pub fn text_field<'a>(map: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match map.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(PolicyError::BadRequest(format!(
            "El campo '{}' debe ser texto",
            field
        ))),
        None => Err(PolicyError::missing(&[field])),
    }
}

/// Check presence of every field, then return their text values in order
pub fn required_text<'a>(raw: &'a Value, fields: &[&str]) -> Result<Vec<&'a str>> {
    let map = require_object(raw)?;
    check_required(map, fields)?;
    fields.iter().map(|f| text_field(map, f)).collect()
}
