use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The backend's response wrapper: `{ "success": bool, "error"?: ..., ...payload }`.
///
/// `success`, `error` and `message` are lifted out; every other key stays in
/// `payload`. Schedule endpoints omit `success` entirely, hence the `Option`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Best human-readable failure text: `error`, then `message`.
    pub fn failure_text(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(text_of)
            .or_else(|| self.message.as_ref().and_then(text_of))
    }
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Standard error body, `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload access
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response is missing field: {0}")]
    Missing(String),

    #[error("response field {key} has an unexpected shape: {source}")]
    Invalid {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The success side of a normalized response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a bare JSON body. Objects are used as-is; anything else lands
    /// under `data`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                Self(map)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Deserialize a required field.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, PayloadError> {
        match self.get(key) {
            Some(v) => decode(key, v),
            None => Err(PayloadError::Missing(key.to_string())),
        }
    }

    /// Deserialize a field that may be absent or null.
    pub fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PayloadError> {
        self.get(key).map(|v| decode(key, v)).transpose()
    }

    /// Deserialize the first present field among `keys`. The backend is not
    /// consistent about naming (`drink` vs `data`), so callers list the
    /// spellings they accept.
    pub fn first_of<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<T, PayloadError> {
        for key in keys {
            if let Some(v) = self.get(key) {
                return decode(key, v);
            }
        }
        Err(PayloadError::Missing(keys.join("|")))
    }

    /// Deserialize the whole payload as one record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        T::deserialize(Value::Object(self.0.clone())).map_err(|source| PayloadError::Invalid {
            key: "<payload>".to_string(),
            source,
        })
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

fn decode<T: DeserializeOwned>(key: &str, v: &Value) -> Result<T, PayloadError> {
    T::deserialize(v).map_err(|source| PayloadError::Invalid {
        key: key.to_string(),
        source,
    })
}
