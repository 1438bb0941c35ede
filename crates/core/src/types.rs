//! Item model and request validation

use crate::{ItemSearchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields every stored item must carry, in the order they are checked
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "name", "suggest_input"];

/// Every top-level field an item may carry
pub const ITEM_FIELDS: [&str; 7] = [
    "id",
    "name",
    "description",
    "tags",
    "suggest_input",
    "address",
    "metadata",
];

/// An indexed item as stored in the search engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Canonical identifier, always a string at rest
    pub id: String,
    /// Primary relevance field
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Autocomplete seed phrases
    pub suggest_input: Vec<String>,
    /// Free-form address, expected to embed a 5-digit postal code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Schema-free extension bag
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Item {
    /// Build an item from an untyped request body.
    ///
    /// Required fields are checked in the order `id`, `name`, `suggest_input`
    /// and the first absent (or `null`) one is reported. Fields outside
    /// [`ITEM_FIELDS`] are rejected rather than dropped. Optional fields get
    /// their defaults and the id is coerced to its string form.
    pub fn from_request(body: Value) -> Result<Self> {
        let mut object = match body {
            Value::Object(object) => object,
            _ => {
                return Err(ItemSearchError::validation(
                    "Request body must be a JSON object",
                ))
            }
        };

        for field in REQUIRED_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => return Err(ItemSearchError::missing_field(field)),
                Some(_) => {}
            }
        }

        if let Some(unknown) = object
            .keys()
            .find(|key| !ITEM_FIELDS.contains(&key.as_str()))
        {
            return Err(ItemSearchError::validation(format!(
                "Unknown field: {} (extra attributes belong in metadata)",
                unknown
            )));
        }

        let id = object
            .get("id")
            .map(coerce_id)
            .transpose()?
            .ok_or_else(|| ItemSearchError::missing_field("id"))?;
        object.insert("id".to_string(), Value::String(id));

        for (field, default) in [
            ("description", Value::String(String::new())),
            ("tags", Value::Array(Vec::new())),
            ("metadata", Value::Object(Map::new())),
        ] {
            if matches!(object.get(field), None | Some(Value::Null)) {
                object.insert(field.to_string(), default);
            }
        }
        if matches!(object.get("address"), Some(Value::Null)) {
            object.remove("address");
        }

        serde_json::from_value(Value::Object(object))
            .map_err(|e| ItemSearchError::validation(format!("Invalid field value: {}", e)))
    }

    /// Every text this item can be found by, used by the in-memory engine
    pub fn field_values(&self, field: &str) -> Vec<&str> {
        match field {
            "name" => vec![self.name.as_str()],
            "description" => vec![self.description.as_str()],
            "tags" => self.tags.iter().map(String::as_str).collect(),
            "suggest_input" => self.suggest_input.iter().map(String::as_str).collect(),
            "address" => self.address.as_deref().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Coerce a caller supplied id to its canonical string form.
///
/// Strings pass through untouched and integers become their decimal form.
/// Floats are accepted only when they carry no fractional part.
pub fn coerce_id(value: &Value) -> Result<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        Value::String(_) => Err(ItemSearchError::validation("Field id cannot be empty")),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(format!("{}", f as i64)),
                    _ => Err(ItemSearchError::validation(format!(
                        "Field id must be a string or integer, got {}",
                        n
                    ))),
                }
            }
        }
        other => Err(ItemSearchError::validation(format!(
            "Field id must be a string or integer, got {}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Receipt returned after an item has been written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexReceipt {
    pub id: String,
    /// Name of the index the document landed in
    pub index: String,
}
