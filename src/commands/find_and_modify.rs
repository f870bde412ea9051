use mongodb::bson::{doc, Document};
use mongodb::options::{
    FindOneAndDeleteOptions, FindOneAndReplaceOptions, FindOneAndUpdateOptions, ReturnDocument,
    UpdateModifications,
};

use super::{millis, named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build a `findAndModify` command for `find_one_and_delete`
/// (`remove: true`, no update payload).
pub fn find_one_and_delete_command(
    collection: &str,
    filter: Document,
    options: Option<&FindOneAndDeleteOptions>,
) -> Result<Document> {
    let mut body = doc! { "query": filter, "remove": true };
    if let Some(options) = options {
        if let Some(sort) = &options.sort {
            body.insert("sort", sort.clone());
        }
        if let Some(projection) = &options.projection {
            body.insert("fields", projection.clone());
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(concern) = &options.write_concern {
            body.insert("write_concern", to_bson(concern)?);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "findAndModify",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

/// Build a `findAndModify` command for `find_one_and_replace`. The
/// replacement document rides in `update`; `return_document` maps onto the
/// server's `new` flag and is omitted when unset.
pub fn find_one_and_replace_command(
    collection: &str,
    filter: Document,
    replacement: Document,
    options: Option<&FindOneAndReplaceOptions>,
) -> Result<Document> {
    let mut body = doc! { "query": filter, "update": replacement };
    if let Some(options) = options {
        if let Some(sort) = &options.sort {
            body.insert("sort", sort.clone());
        }
        if let Some(projection) = &options.projection {
            body.insert("fields", projection.clone());
        }
        if let Some(return_document) = &options.return_document {
            body.insert("new", matches!(return_document, ReturnDocument::After));
        }
        if let Some(upsert) = options.upsert {
            body.insert("upsert", upsert);
        }
        if let Some(bypass) = options.bypass_document_validation {
            body.insert("bypass_document_validation", bypass);
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(concern) = &options.write_concern {
            body.insert("write_concern", to_bson(concern)?);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "findAndModify",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

/// Build a `findAndModify` command for `find_one_and_update`.
pub fn find_one_and_update_command(
    collection: &str,
    filter: Document,
    update: &UpdateModifications,
    options: Option<&FindOneAndUpdateOptions>,
) -> Result<Document> {
    let mut body = doc! { "query": filter, "update": to_bson(update)? };
    if let Some(options) = options {
        if let Some(sort) = &options.sort {
            body.insert("sort", sort.clone());
        }
        if let Some(projection) = &options.projection {
            body.insert("fields", projection.clone());
        }
        if let Some(return_document) = &options.return_document {
            body.insert("new", matches!(return_document, ReturnDocument::After));
        }
        if let Some(upsert) = options.upsert {
            body.insert("upsert", upsert);
        }
        if let Some(filters) = &options.array_filters {
            body.insert("array_filters", filters.clone());
        }
        if let Some(bypass) = options.bypass_document_validation {
            body.insert("bypass_document_validation", bypass);
        }
        if let Some(max_time) = options.max_time {
            body.insert("maxTimeMS", millis(max_time));
        }
        if let Some(hint) = &options.hint {
            body.insert("hint", to_bson(hint)?);
        }
        if let Some(collation) = &options.collation {
            body.insert("collation", to_bson(collation)?);
        }
        if let Some(concern) = &options.write_concern {
            body.insert("write_concern", to_bson(concern)?);
        }
        if let Some(vars) = &options.let_vars {
            body.insert("let", vars.clone());
        }
        if let Some(comment) = &options.comment {
            body.insert("comment", to_bson(comment)?);
        }
    }
    Ok(named_command(
        "findAndModify",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_variant_sets_remove() {
        let command =
            find_one_and_delete_command("products", doc! { "status": "D" }, None).unwrap();
        assert_eq!(
            command,
            doc! {
                "findAndModify": "products",
                "query": { "status": "D" },
                "remove": true,
            }
        );
        assert_eq!(command.keys().next().unwrap(), "findAndModify");
    }

    #[test]
    fn test_replace_variant_rides_in_update() {
        let mut options = FindOneAndReplaceOptions::default();
        options.return_document = Some(ReturnDocument::After);
        let command = find_one_and_replace_command(
            "products",
            doc! { "sku": "a-1" },
            doc! { "sku": "a-1", "qty": 9 },
            Some(&options),
        )
        .unwrap();
        assert_eq!(
            command.get_document("update").unwrap(),
            &doc! { "sku": "a-1", "qty": 9 }
        );
        assert_eq!(command.get_bool("new").unwrap(), true);
        assert!(!command.contains_key("remove"));
    }

    #[test]
    fn test_return_before_maps_to_new_false() {
        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::Before);
        let command = find_one_and_update_command(
            "products",
            doc! {},
            &UpdateModifications::Document(doc! { "$inc": { "qty": -1 } }),
            Some(&options),
        )
        .unwrap();
        assert_eq!(command.get_bool("new").unwrap(), false);
    }

    #[test]
    fn test_unset_return_document_omits_new() {
        let command = find_one_and_update_command(
            "products",
            doc! {},
            &UpdateModifications::Document(doc! { "$inc": { "qty": -1 } }),
            None,
        )
        .unwrap();
        assert!(!command.contains_key("new"));
    }

    #[test]
    fn test_update_variant_options() {
        let mut options = FindOneAndUpdateOptions::default();
        options.upsert = Some(true);
        options.array_filters = Some(vec![doc! { "elem.grade": { "$gte": 85 } }]);
        options.projection = Some(doc! { "grades_summary": 1 });
        options.sort = Some(doc! { "created_at": -1 });
        let command = find_one_and_update_command(
            "students",
            doc! { "semester": 1 },
            &UpdateModifications::Document(doc! { "$set": { "elem.$[elem].mean": 100 } }),
            Some(&options),
        )
        .unwrap();
        assert_eq!(command.get_bool("upsert").unwrap(), true);
        assert!(command.contains_key("arrayFilters"));
        // projection maps onto findAndModify's `fields`, keys untouched
        assert_eq!(
            command.get_document("fields").unwrap(),
            &doc! { "grades_summary": 1 }
        );
        assert_eq!(
            command.get_document("sort").unwrap(),
            &doc! { "created_at": -1 }
        );
    }
}
