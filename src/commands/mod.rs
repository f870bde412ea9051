//! Wire-level command builders, one module per command family.
//!
//! Every builder reconstructs the exact command document the driver would
//! send for the matching CRUD call: option keys in server (camelCase)
//! spelling, caller payloads untouched, unset options absent.

pub mod aggregate;
pub mod count;
pub mod delete;
pub mod distinct;
pub mod find;
pub mod find_and_modify;
pub mod update;

pub use aggregate::{aggregate_command, change_stream_command, count_documents_command};
pub use count::count_command;
pub use delete::delete_command;
pub use distinct::distinct_command;
pub use find::{find_command, find_one_command};
pub use find_and_modify::{
    find_one_and_delete_command, find_one_and_replace_command, find_one_and_update_command,
};
pub use update::{replace_command, update_command};

use std::time::Duration;

use mongodb::bson::{self, Bson, Document};
use mongodb::options::Hint;
use serde::Serialize;

use crate::error::{Error, Result};

/// Keys whose values are caller-supplied payloads. The normalizer never
/// renames them or descends into them: user data crosses the wire
/// byte-for-byte, exactly as the driver sends it.
pub(crate) const PAYLOAD_KEYS: &[&str] = &[
    "q", "u", "filter", "query", "pipeline", "update", "projection", "fields", "sort", "hint",
    "min", "max", "let",
];

/// Assemble the final command document with the command-name key first.
/// Some servers are order-sensitive for the leading key.
pub(crate) fn named_command(name: &str, collection: &str, body: Document) -> Document {
    let mut command = Document::new();
    command.insert(name, collection);
    command.extend(body);
    command
}

pub(crate) fn to_bson<T: Serialize>(value: &T) -> Result<Bson> {
    Ok(bson::to_bson(value)?)
}

pub(crate) fn millis(duration: Duration) -> i64 {
    duration.as_millis() as i64
}

/// Build an index-specifying document from `(field, direction)` pairs,
/// preserving pair order. Used for both `hint` key patterns and sorts.
pub fn index_document(keys: &[(String, Bson)]) -> Result<Document> {
    if keys.is_empty() {
        return Err(Error::EmptyKeyPattern);
    }
    let mut index = Document::new();
    for (field, direction) in keys {
        match direction {
            Bson::Int32(_) | Bson::Int64(_) | Bson::String(_) | Bson::Document(_) => {
                index.insert(field.clone(), direction.clone());
            }
            other => {
                return Err(Error::invalid_key_pattern(format!(
                    "direction for \"{}\" must be 1, -1, a string such as \"2d\", \
                     or a document, got {}",
                    field, other
                )))
            }
        }
    }
    Ok(index)
}

fn key_direction_pairs(values: &[Bson]) -> Result<Vec<(String, Bson)>> {
    values
        .iter()
        .map(|value| {
            let pair = value.as_array().ok_or_else(|| {
                Error::invalid_key_pattern(format!(
                    "each entry must be a [key, direction] pair, got {}",
                    value
                ))
            })?;
            if pair.len() != 2 {
                return Err(Error::invalid_key_pattern(format!(
                    "each entry must have exactly two items, got {}",
                    pair.len()
                )));
            }
            let field = pair[0].as_str().ok_or_else(|| {
                Error::invalid_key_pattern("first item in each key pair must be a string")
            })?;
            Ok((field.to_string(), pair[1].clone()))
        })
        .collect()
}

/// Resolve an untyped sort specification into an ordered document.
///
/// Accepts an array of `[key, direction]` pairs. A plain JSON object is
/// rejected: key order is significant for sorts and JSON maps do not
/// guarantee it.
pub fn sort_document_from_bson(value: &Bson) -> Result<Document> {
    match value {
        Bson::Array(pairs) => index_document(&key_direction_pairs(pairs)?),
        Bson::Document(map) => Err(Error::invalid_key_pattern(format!(
            "passing a map to sort/hint is not allowed, use an array of \
             [key, direction] pairs instead: did you mean {:?}?",
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>()
        ))),
        other => Err(Error::invalid_key_pattern(format!(
            "must use an array of [key, direction] pairs, not {}",
            other
        ))),
    }
}

/// Resolve an untyped hint into the driver's tagged form: an index name
/// string passes through, an array of pairs becomes a key-pattern document.
pub fn hint_from_bson(value: &Bson) -> Result<Hint> {
    match value {
        Bson::String(name) => Ok(Hint::Name(name.clone())),
        other => Ok(Hint::Keys(sort_document_from_bson(other)?)),
    }
}

/// Expand a list of field names into an inclusion projection:
/// `["a.b.c", "d"]` becomes `{"a.b.c": 1, "d": 1}`.
pub fn fields_to_projection<I, S>(fields: I) -> Document
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut projection = Document::new();
    for field in fields {
        projection.insert(field.as_ref(), 1_i32);
    }
    projection
}

/// Resolve an untyped projection: a document passes through unchanged, an
/// array of field names becomes an inclusion map.
pub fn projection_from_bson(value: &Bson) -> Result<Document> {
    match value {
        Bson::Document(document) => Ok(document.clone()),
        Bson::Array(fields) => {
            let names = fields
                .iter()
                .map(|field| {
                    field.as_str().ok_or_else(|| {
                        Error::invalid_projection(format!(
                            "projection must be a list of key names, got {}",
                            field
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(fields_to_projection(names))
        }
        other => Err(Error::invalid_projection(format!(
            "projection must be a document or a list of key names, not {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_index_document_preserves_order() {
        let keys = vec![
            ("b".to_string(), Bson::Int32(-1)),
            ("a".to_string(), Bson::Int32(1)),
            ("loc".to_string(), Bson::String("2d".to_string())),
        ];
        let index = index_document(&keys).unwrap();
        let fields: Vec<_> = index.keys().collect();
        assert_eq!(fields, ["b", "a", "loc"]);
    }

    #[test]
    fn test_index_document_empty_is_value_error() {
        assert!(matches!(index_document(&[]), Err(Error::EmptyKeyPattern)));
    }

    #[test]
    fn test_index_document_bad_direction_is_type_error() {
        let keys = vec![("a".to_string(), Bson::Boolean(true))];
        let err = index_document(&keys).unwrap_err();
        assert!(matches!(err, Error::InvalidKeyPattern(_)));
        assert!(err.to_string().contains("\"a\""));
    }

    #[test]
    fn test_index_document_accepts_document_direction() {
        let keys = vec![(
            "score".to_string(),
            Bson::Document(doc! { "$meta": "textScore" }),
        )];
        let index = index_document(&keys).unwrap();
        assert_eq!(index, doc! { "score": { "$meta": "textScore" } });
    }

    #[test]
    fn test_sort_from_bson_rejects_map() {
        let err = sort_document_from_bson(&Bson::Document(doc! { "a": 1 })).unwrap_err();
        assert!(matches!(err, Error::InvalidKeyPattern(_)));
        assert!(err.to_string().contains("array of"));
    }

    #[test]
    fn test_sort_from_bson_pairs() {
        let value = Bson::Array(vec![
            Bson::Array(vec![Bson::String("ord_dt".into()), Bson::Int32(-1)]),
            Bson::Array(vec![Bson::String("item.sku".into()), Bson::Int32(1)]),
        ]);
        assert_eq!(
            sort_document_from_bson(&value).unwrap(),
            doc! { "ord_dt": -1, "item.sku": 1 }
        );
    }

    #[test]
    fn test_hint_from_bson_string_is_name() {
        assert_eq!(
            hint_from_bson(&Bson::String("idx_qty".into())).unwrap(),
            Hint::Name("idx_qty".into())
        );
    }

    #[test]
    fn test_hint_from_bson_pairs_are_keys() {
        let value = Bson::Array(vec![Bson::Array(vec![
            Bson::String("qty".into()),
            Bson::Int32(1),
        ])]);
        assert_eq!(
            hint_from_bson(&value).unwrap(),
            Hint::Keys(doc! { "qty": 1 })
        );
    }

    #[test]
    fn test_fields_to_projection() {
        assert_eq!(
            fields_to_projection(["a.b.c", "d", "a.c"]),
            doc! { "a.b.c": 1, "d": 1, "a.c": 1 }
        );
    }

    #[test]
    fn test_projection_from_bson_document_passthrough() {
        let value = Bson::Document(doc! { "secret": 0 });
        assert_eq!(projection_from_bson(&value).unwrap(), doc! { "secret": 0 });
    }

    #[test]
    fn test_projection_from_bson_rejects_non_strings() {
        let value = Bson::Array(vec![Bson::Int32(1)]);
        assert!(matches!(
            projection_from_bson(&value),
            Err(Error::InvalidProjection(_))
        ));
    }

    #[test]
    fn test_named_command_leading_key() {
        let command = named_command("update", "products", doc! { "updates": [] });
        assert_eq!(command.keys().next().unwrap(), "update");
    }
}
