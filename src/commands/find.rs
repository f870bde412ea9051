use mongodb::bson::Document;
use mongodb::options::{CursorType, FindOneOptions, FindOptions};

use super::{millis, named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build a `find` command. An absent filter produces no `filter` key at
/// all, collapsing the command to the server's default-match form.
pub fn find_command(
    collection: &str,
    filter: Option<Document>,
    options: Option<&FindOptions>,
) -> Result<Document> {
    let mut body = Document::new();
    if let Some(filter) = filter {
        body.insert("filter", filter);
    }
    if let Some(options) = options {
        if let Some(sort) = &options.sort {
            body.insert("sort", sort.clone());
        }
        if let Some(projection) = &options.projection {
            body.insert("projection", projection.clone());
        }
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(skip) = options.skip {
            body.insert("skip", skip as i64);
        }
        if let Some(limit) = options.limit {
            // The driver models find_one as a negative limit; on the wire
            // that becomes a positive limit plus singleBatch.
            body.insert("limit", limit.abs());
            if limit < 0 {
                body.insert("single_batch", true);
            }
        }
        if let Some(batch_size) = options.batch_size {
            // A batch size of zero means "unset" for cursor-bearing
            // commands; absent and zero differ on the server.
            if batch_size != 0 {
                body.insert("batch_size", batch_size as i32);
            }
        }
        if let Some(min) = &options.min {
            body.insert("min", min.clone());
        }
        if let Some(max) = &options.max {
            body.insert("max", max.clone());
        }
        match &options.cursor_type {
            Some(CursorType::Tailable) => {
                body.insert("tailable", true);
            }
            Some(CursorType::TailableAwait) => {
                body.insert("tailable", true);
                body.insert("await_data", true);
            }
            _ => {}
        }
        if let Some(allow) = options.allow_disk_use {
            body.insert("allow_disk_use", allow);
        }
        if let Some(allow) = options.allow_partial_results {
            body.insert("allow_partial_results", allow);
        }
        if let Some(no_timeout) = options.no_cursor_timeout {
            body.insert("no_cursor_timeout", no_timeout);
        }
        if let Some(return_key) = options.return_key {
            body.insert("return_key", return_key);
        }
        if let Some(show_record_id) = options.show_record_id {
            body.insert("show_record_id", show_record_id);
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(concern) = &options.read_concern {
            body.insert("read_concern", to_bson(concern)?);
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "find",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

/// Build the `find` command for `find_one`: a regular find constrained to a
/// single document (`limit: 1`, `singleBatch: true`).
pub fn find_one_command(
    collection: &str,
    filter: Option<Document>,
    options: Option<&FindOneOptions>,
) -> Result<Document> {
    let mut body = Document::new();
    if let Some(filter) = filter {
        body.insert("filter", filter);
    }
    body.insert("limit", 1_i64);
    body.insert("single_batch", true);
    if let Some(options) = options {
        if let Some(sort) = &options.sort {
            body.insert("sort", sort.clone());
        }
        if let Some(projection) = &options.projection {
            body.insert("projection", projection.clone());
        }
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(skip) = options.skip {
            body.insert("skip", skip as i64);
        }
        if let Some(min) = &options.min {
            body.insert("min", min.clone());
        }
        if let Some(max) = &options.max {
            body.insert("max", max.clone());
        }
        if let Some(allow) = options.allow_partial_results {
            body.insert("allow_partial_results", allow);
        }
        if let Some(return_key) = options.return_key {
            body.insert("return_key", return_key);
        }
        if let Some(show_record_id) = options.show_record_id {
            body.insert("show_record_id", show_record_id);
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(concern) = &options.read_concern {
            body.insert("read_concern", to_bson(concern)?);
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "find",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}
