use mongodb::bson::{self, Bson, Document};
use serde_json::Value;

use crate::error::Result;

/// Convert BSON Document → JSON Value
pub fn document_to_json(document: &Document) -> Value {
    serde_json::to_value(document).unwrap_or(Value::Null)
}

/// Convert JSON Value → BSON Document
pub fn json_to_document(value: &Value) -> Result<Document> {
    Ok(bson::to_document(value)?)
}

/// Convert JSON Value → BSON value
pub fn json_to_bson(value: &Value) -> Result<Bson> {
    Ok(bson::to_bson(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() {
        let value = json!({ "status": "D", "qty": { "$lt": 30 } });
        let document = json_to_document(&value).unwrap();
        assert_eq!(document.get_str("status").unwrap(), "D");
        assert_eq!(document_to_json(&document), value);
    }

    #[test]
    fn test_json_to_document_rejects_scalars() {
        assert!(json_to_document(&json!("not a document")).is_err());
    }

    #[test]
    fn test_document_to_json() {
        let document = doc! { "n": 5_i32 };
        assert_eq!(document_to_json(&document), json!({ "n": 5 }));
    }
}
