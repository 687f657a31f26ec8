use serde::de::DeserializeOwned;
use serde_json::Value;

/// One backend record as shown in a grid row.
///
/// Projection goes through `field`, so a typed record only has to name the
/// keys its table uses. A key the record does not know projects as empty.
pub trait Record: DeserializeOwned + Clone + 'static {
    fn field(&self, key: &str) -> Option<String>;

    fn id(&self) -> Option<i64> {
        self.field("id").and_then(|id| id.parse().ok())
    }
}

/// Untyped row for tables without a dedicated record type.
pub type Row = serde_json::Map<String, Value>;

pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Record for Row {
    fn field(&self, key: &str) -> Option<String> {
        self.get(key).map(value_text)
    }

    fn id(&self) -> Option<i64> {
        self.get("id").and_then(|id| match id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}
