//! Payload serialization.

use serde::Serialize;

use crate::error::Result;

/// Serializes an outbound telemetry payload to JSON text.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if the value cannot be
/// represented as JSON (e.g. a map with non-string keys).
pub fn serialize<T: Serialize + ?Sized>(message: &T) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use serde_json::json;

    #[test]
    fn test_serialize_value() {
        let text = serialize(&json!({ "event": "answered", "mos": 4.3 })).unwrap();
        assert_eq!(text, r#"{"event":"answered","mos":4.3}"#);
    }

    #[test]
    fn test_serialize_rejects_non_string_keys() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "x");
        assert!(serialize(&map).is_err());
    }
}
