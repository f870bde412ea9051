use mongodb::bson::{doc, Document};
use mongodb::options::{ReplaceOptions, UpdateModifications, UpdateOptions};

use super::{named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build an `update` command for `update_one` (`multi: false`) or
/// `update_many` (`multi: true`).
///
/// Statement-level options (`upsert`, `arrayFilters`, `hint`, `collation`)
/// nest inside the single element of the `updates` array, not at top level.
pub fn update_command(
    collection: &str,
    query: Document,
    update: &UpdateModifications,
    multi: bool,
    options: Option<&UpdateOptions>,
) -> Result<Document> {
    let mut statement = doc! { "q": query, "u": to_bson(update)?, "multi": multi };
    if let Some(options) = options {
        if let Some(upsert) = options.upsert {
            statement.insert("upsert", upsert);
        }
        if let Some(filters) = &options.array_filters {
            statement.insert("array_filters", filters.clone());
        }
        if let Some(hint) = &options.hint {
            statement.insert("hint", to_bson(hint)?);
        }
        if let Some(collation) = &options.collation {
            statement.insert("collation", to_bson(collation)?);
        }
    }

    let mut body = doc! { "updates": [statement] };
    if let Some(options) = options {
        if let Some(concern) = &options.write_concern {
            body.insert("write_concern", to_bson(concern)?);
        }
        if let Some(bypass) = options.bypass_document_validation {
            body.insert("bypass_document_validation", bypass);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "update",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

/// Build an `update` command for `replace_one`. A replacement is a single
/// whole-document `u` with `multi: false` and no array filters.
pub fn replace_command(
    collection: &str,
    query: Document,
    replacement: Document,
    options: Option<&ReplaceOptions>,
) -> Result<Document> {
    let mut statement = doc! { "q": query, "u": replacement, "multi": false };
    if let Some(options) = options {
        if let Some(upsert) = options.upsert {
            statement.insert("upsert", upsert);
        }
        if let Some(hint) = &options.hint {
            statement.insert("hint", to_bson(hint)?);
        }
        if let Some(collation) = &options.collation {
            statement.insert("collation", to_bson(collation)?);
        }
    }

    let mut body = doc! { "updates": [statement] };
    if let Some(options) = options {
        if let Some(concern) = &options.write_concern {
            body.insert("write_concern", to_bson(concern)?);
        }
        if let Some(bypass) = options.bypass_document_validation {
            body.insert("bypass_document_validation", bypass);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "update",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}
