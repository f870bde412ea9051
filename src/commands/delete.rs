use mongodb::bson::{doc, Document};
use mongodb::options::DeleteOptions;

use super::{named_command, to_bson, PAYLOAD_KEYS};
use crate::error::Result;
use crate::utils::camelcase::normalize_keys;

/// Build a `delete` command. `limit` is 1 for `delete_one` and 0
/// (unbounded) for `delete_many`; `collation` and `hint` nest inside the
/// single element of the `deletes` array.
pub fn delete_command(
    collection: &str,
    query: Document,
    limit: i32,
    options: Option<&DeleteOptions>,
) -> Result<Document> {
    let mut statement = doc! { "q": query, "limit": limit };
    if let Some(options) = options {
        if let Some(collation) = &options.collation {
            statement.insert("collation", to_bson(collation)?);
        }
        if let Some(hint) = &options.hint {
            statement.insert("hint", to_bson(hint)?);
        }
    }

    let mut body = doc! { "deletes": [statement] };
    if let Some(options) = options {
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
        "delete",
        collection,
        normalize_keys(body, PAYLOAD_KEYS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::options::{Collation, Hint};

    #[test]
    fn test_delete_one_shape() {
        let command = delete_command("products", doc! { "status": "D" }, 1, None).unwrap();
        assert_eq!(
            command,
            doc! {
                "delete": "products",
                "deletes": [{ "q": { "status": "D" }, "limit": 1 }],
            }
        );
        assert_eq!(command.keys().next().unwrap(), "delete");
    }

    #[test]
    fn test_delete_many_unbounded_limit() {
        let command = delete_command("products", doc! { "status": "D" }, 0, None).unwrap();
        let statement = command.get_array("deletes").unwrap()[0]
            .as_document()
            .unwrap();
        assert_eq!(statement.get_i32("limit").unwrap(), 0);
    }

    #[test]
    fn test_delete_statement_options_nest_in_element() {
        let mut options = DeleteOptions::default();
        options.collation = Some(Collation::builder().locale("en_US").build());
        options.hint = Some(Hint::Name("status_idx".to_string()));
        let command =
            delete_command("products", doc! { "status": "D" }, 1, Some(&options)).unwrap();

        let statement = command.get_array("deletes").unwrap()[0]
            .as_document()
            .unwrap();
        assert_eq!(statement.get_str("hint").unwrap(), "status_idx");
        assert_eq!(
            statement.get_document("collation").unwrap().get_str("locale").unwrap(),
            "en_US"
        );
        assert!(!command.contains_key("collation"));
        assert!(!command.contains_key("hint"));
    }

    #[test]
    fn test_delete_query_keys_not_renamed() {
        let command =
            delete_command("orders", doc! { "ord_dt": { "$lt": 100 } }, 0, None).unwrap();
        let statement = command.get_array("deletes").unwrap()[0]
            .as_document()
            .unwrap();
        assert!(statement.get_document("q").unwrap().contains_key("ord_dt"));
    }
}
