use mongodb::bson::{doc, Document};
use mongodb::options::DistinctOptions;

use super::{millis, named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build a `distinct` command. `query` is always present, empty when no
/// filter was given, matching the driver's own serialization.
pub fn distinct_command(
    collection: &str,
    field_name: &str,
    filter: Option<Document>,
    options: Option<&DistinctOptions>,
) -> Result<Document> {
    let mut body = doc! { "key": field_name, "query": filter.unwrap_or_default() };
    if let Some(options) = options {
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(concern) = &options.read_concern {
            body.insert("read_concern", to_bson(concern)?);
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "distinct",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}
