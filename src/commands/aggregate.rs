use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{AggregateOptions, ChangeStreamOptions, CountOptions};

use super::{millis, named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build an `aggregate` command. The `cursor` sub-document is mandatory
/// for this command family even when empty; a batch size of zero counts
/// as unset and is omitted.
pub fn aggregate_command(
    collection: &str,
    pipeline: Vec<Document>,
    options: Option<&AggregateOptions>,
) -> Result<Document> {
    let mut body = Document::new();
    body.insert(
        "pipeline",
        pipeline.into_iter().map(Bson::Document).collect::<Vec<_>>(),
    );
    let mut cursor = Document::new();
    if let Some(options) = options {
        if let Some(batch_size) = options.batch_size {
            if batch_size != 0 {
                cursor.insert("batchSize", batch_size as i32);
            }
        }
    }
    body.insert("cursor", cursor);
    if let Some(options) = options {
        if let Some(allow) = options.allow_disk_use {
            body.insert("allow_disk_use", allow);
        }
        if let Some(bypass) = options.bypass_document_validation {
            body.insert("bypass_document_validation", bypass);
        }
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(concern) = &options.read_concern {
            body.insert("read_concern", to_bson(concern)?);
        }
        if let Some(concern) = &options.write_concern {
            body.insert("write_concern", to_bson(concern)?);
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
        "aggregate",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

/// Build the `aggregate` command that backs `count_documents`: the filter
/// becomes a `$match` stage, skip/limit become stages of their own, and a
/// `$group` totals the survivors. There is no server-side `count` path for
/// filtered counts.
pub fn count_documents_command(
    collection: &str,
    filter: Option<Document>,
    options: Option<&CountOptions>,
) -> Result<Document> {
    let mut pipeline = vec![doc! { "$match": filter.unwrap_or_default() }];
    if let Some(options) = options {
        if let Some(skip) = options.skip {
            pipeline.push(doc! { "$skip": skip as i64 });
        }
        if let Some(limit) = options.limit {
            pipeline.push(doc! { "$limit": limit as i64 });
        }
    }
    pipeline.push(doc! { "$group": { "_id": 1, "n": { "$sum": 1 } } });

    let mut body = Document::new();
    body.insert(
        "pipeline",
        pipeline.into_iter().map(Bson::Document).collect::<Vec<_>>(),
    );
    body.insert("cursor", Document::new());
    if let Some(options) = options {
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "aggregate",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

/// Build the `aggregate` command that opens a change stream: a
/// `$changeStream` stage carrying only the options that were set, followed
/// by the caller's pipeline.
pub fn change_stream_command(
    collection: &str,
    pipeline: Vec<Document>,
    options: Option<&ChangeStreamOptions>,
) -> Result<Document> {
    // The stage is spelled in wire form directly; its enclosing pipeline
    // is exempt from key rewriting.
    let mut stage = Document::new();
    if let Some(options) = options {
        if let Some(full_document) = &options.full_document {
            stage.insert("fullDocument", to_bson(full_document)?);
        }
        if let Some(token) = &options.resume_after {
            stage.insert("resumeAfter", to_bson(token)?);
        }
        if let Some(token) = &options.start_after {
            stage.insert("startAfter", to_bson(token)?);
        }
        if let Some(timestamp) = options.start_at_operation_time {
            stage.insert("startAtOperationTime", timestamp);
        }
    }
    let mut full_pipeline = vec![doc! { "$changeStream": stage }];
    full_pipeline.extend(pipeline);

    let mut body = Document::new();
    body.insert(
        "pipeline",
        full_pipeline
            .into_iter()
            .map(Bson::Document)
            .collect::<Vec<_>>(),
    );
    let mut cursor = Document::new();
    if let Some(options) = options {
        if let Some(batch_size) = options.batch_size {
            if batch_size != 0 {
                cursor.insert("batchSize", batch_size as i32);
            }
        }
    }
    body.insert("cursor", cursor);
    if let Some(options) = options {
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "aggregate",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}
