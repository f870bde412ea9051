use mongodb::bson::{Bson, Document};

/// Rewrite a snake_case key to camelCase.
///
/// Keys without an underscore are returned unchanged, as are keys starting
/// with one (`_id` and friends are reserved identifiers).
pub fn camel_case(key: &str) -> String {
    if !key.contains('_') || key.starts_with('_') {
        return key.to_string();
    }
    let mut segments = key.split('_');
    let mut out = String::with_capacity(key.len());
    if let Some(first) = segments.next() {
        out.push_str(first);
    }
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Deep-copy a document, rewriting every eligible key to camelCase.
///
/// Keys listed in `exclude` are copied verbatim, value untouched. Null values
/// under non-excluded keys are dropped entirely: an unset option must not
/// reach the server as an explicit null. Nested documents and documents
/// inside arrays are rewritten recursively.
pub fn normalize_keys(document: Document, exclude: &[&str]) -> Document {
    let mut out = Document::new();
    for (key, value) in document {
        if exclude.contains(&key.as_str()) {
            out.insert(key, value);
            continue;
        }
        if matches!(value, Bson::Null) {
            continue;
        }
        out.insert(camel_case(&key), normalize_value(value, exclude));
    }
    out
}

fn normalize_value(value: Bson, exclude: &[&str]) -> Bson {
    match value {
        Bson::Document(document) => Bson::Document(normalize_keys(document, exclude)),
        Bson::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(|item| normalize_value(item, exclude))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_camel_case_basic() {
        assert_eq!(camel_case("array_filters"), "arrayFilters");
        assert_eq!(camel_case("bypass_document_validation"), "bypassDocumentValidation");
        assert_eq!(camel_case("filter"), "filter");
    }

    #[test]
    fn test_camel_case_underscore_prefix_untouched() {
        assert_eq!(camel_case("_id"), "_id");
        assert_eq!(camel_case("_internal_key"), "_internal_key");
    }

    #[test]
    fn test_camel_case_already_camel() {
        assert_eq!(camel_case("batchSize"), "batchSize");
        assert_eq!(camel_case("maxTimeMS"), "maxTimeMS");
    }

    #[test]
    fn test_normalize_renames_nested_documents() {
        let input = doc! {
            "write_concern": { "w": "majority" },
            "updates": [{ "array_filters": [{ "elem.grade": { "$gte": 85 } }] }],
        };
        let expected = doc! {
            "writeConcern": { "w": "majority" },
            "updates": [{ "arrayFilters": [{ "elem.grade": { "$gte": 85 } }] }],
        };
        assert_eq!(normalize_keys(input, &[]), expected);
    }

    #[test]
    fn test_normalize_drops_nulls() {
        let input = doc! { "upsert": true, "hint": Bson::Null };
        assert_eq!(normalize_keys(input, &[]), doc! { "upsert": true });
    }

    #[test]
    fn test_normalize_excluded_keys_verbatim() {
        let input = doc! {
            "q": { "ord_dt": { "$gt": 10 }, "deleted_at": Bson::Null },
            "array_filters": [],
        };
        let out = normalize_keys(input, &["q"]);
        assert_eq!(
            out.get_document("q").unwrap(),
            &doc! { "ord_dt": { "$gt": 10 }, "deleted_at": Bson::Null }
        );
        assert!(out.contains_key("arrayFilters"));
    }

    #[test]
    fn test_normalize_excluded_null_survives() {
        let input = doc! { "filter": Bson::Null };
        let out = normalize_keys(input, &["filter"]);
        assert_eq!(out.get("filter"), Some(&Bson::Null));
    }

    #[test]
    fn test_normalize_array_scalars_pass_through() {
        let input = doc! { "pipeline_stages": ["a_b", 1] };
        assert_eq!(
            normalize_keys(input, &[]),
            doc! { "pipelineStages": ["a_b", 1] }
        );
    }

    #[test]
    fn test_normalize_idempotent() {
        let input = doc! {
            "write_concern": { "w": 1 },
            "deletes": [{ "q": { "user_name": "a" }, "limit": 1 }],
        };
        let once = normalize_keys(input, &["q"]);
        let twice = normalize_keys(once.clone(), &["q"]);
        assert_eq!(once, twice);
    }
}
