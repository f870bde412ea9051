use mongodb::bson::Document;
use mongodb::options::EstimatedDocumentCountOptions;

use super::{millis, named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build a `count` command. `estimated_document_count` is the only caller
/// that reaches this command server-side, and it never carries a query;
/// the filtered variant goes through the aggregate rewrite instead.
pub fn count_command(
    collection: &str,
    query: Option<Document>,
    options: Option<&EstimatedDocumentCountOptions>,
) -> Result<Document> {
    let mut body = Document::new();
    if let Some(query) = query {
        body.insert("query", query);
    }
    if let Some(options) = options {
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(concern) = &options.read_concern {
            body.insert("read_concern", to_bson(concern)?);
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "count",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}
