//! JSON-Lines operation scripts for the CLI.
//!
//! One operation per line, tagged by `op`:
//!
//! ```json
//! {"op": "update_one", "filter": {"qty": 0}, "update": {"$set": {"reorder": true}}}
//! {"op": "find", "filter": {}, "options": {"sort": [["ord_dt", -1]], "limit": 10}}
//! ```
//!
//! Payloads arrive as raw JSON and cross into BSON untouched; option bags
//! are resolved into the driver's own option structs here, which is where
//! sort/hint/projection shape validation happens.

use mongodb::bson::Document;
use mongodb::options::{
    AggregateOptions, ChangeStreamOptions, CountOptions, DeleteOptions, DistinctOptions,
    EstimatedDocumentCountOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions,
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, FullDocumentType, ReplaceOptions,
    ReturnDocument, UpdateModifications, UpdateOptions,
};
use serde::Deserialize;
use serde_json::Value;

use crate::collection::ExplainableCollection;
use crate::commands::{hint_from_bson, projection_from_bson, sort_document_from_bson};
use crate::error::{Error, Result};
use crate::utils::json::{json_to_bson, json_to_document};

/// One CRUD operation read from a script line.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    UpdateOne {
        filter: Value,
        update: Value,
        #[serde(default)]
        options: OptionBag,
    },
    UpdateMany {
        filter: Value,
        update: Value,
        #[serde(default)]
        options: OptionBag,
    },
    ReplaceOne {
        filter: Value,
        replacement: Value,
        #[serde(default)]
        options: OptionBag,
    },
    DeleteOne {
        filter: Value,
        #[serde(default)]
        options: OptionBag,
    },
    DeleteMany {
        filter: Value,
        #[serde(default)]
        options: OptionBag,
    },
    Find {
        #[serde(default)]
        filter: Option<Value>,
        #[serde(default)]
        options: OptionBag,
    },
    FindOne {
        #[serde(default)]
        filter: Option<Value>,
        #[serde(default)]
        options: OptionBag,
    },
    Distinct {
        key: String,
        #[serde(default)]
        filter: Option<Value>,
        #[serde(default)]
        options: OptionBag,
    },
    CountDocuments {
        #[serde(default)]
        filter: Option<Value>,
        #[serde(default)]
        options: OptionBag,
    },
    EstimatedDocumentCount {
        #[serde(default)]
        options: OptionBag,
    },
    Aggregate {
        pipeline: Vec<Value>,
        #[serde(default)]
        options: OptionBag,
    },
    FindOneAndDelete {
        filter: Value,
        #[serde(default)]
        options: OptionBag,
    },
    FindOneAndReplace {
        filter: Value,
        replacement: Value,
        #[serde(default)]
        options: OptionBag,
    },
    FindOneAndUpdate {
        filter: Value,
        update: Value,
        #[serde(default)]
        options: OptionBag,
    },
    Watch {
        #[serde(default)]
        pipeline: Vec<Value>,
        #[serde(default)]
        options: OptionBag,
    },
}

impl ScriptOp {
    /// Name of the operation, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ScriptOp::UpdateOne { .. } => "update_one",
            ScriptOp::UpdateMany { .. } => "update_many",
            ScriptOp::ReplaceOne { .. } => "replace_one",
            ScriptOp::DeleteOne { .. } => "delete_one",
            ScriptOp::DeleteMany { .. } => "delete_many",
            ScriptOp::Find { .. } => "find",
            ScriptOp::FindOne { .. } => "find_one",
            ScriptOp::Distinct { .. } => "distinct",
            ScriptOp::CountDocuments { .. } => "count_documents",
            ScriptOp::EstimatedDocumentCount { .. } => "estimated_document_count",
            ScriptOp::Aggregate { .. } => "aggregate",
            ScriptOp::FindOneAndDelete { .. } => "find_one_and_delete",
            ScriptOp::FindOneAndReplace { .. } => "find_one_and_replace",
            ScriptOp::FindOneAndUpdate { .. } => "find_one_and_update",
            ScriptOp::Watch { .. } => "watch",
        }
    }

    /// Play this operation through an explainable collection and return the
    /// server's plan document. Argument-shape errors surface here, before
    /// any network traffic.
    pub async fn run(self, collection: &ExplainableCollection) -> Result<Document> {
        match self {
            ScriptOp::UpdateOne {
                filter,
                update,
                options,
            } => {
                collection
                    .update_one(
                        json_to_document(&filter)?,
                        update_from_json(&update)?,
                        options.update_options()?,
                    )
                    .await
            }
            ScriptOp::UpdateMany {
                filter,
                update,
                options,
            } => {
                collection
                    .update_many(
                        json_to_document(&filter)?,
                        update_from_json(&update)?,
                        options.update_options()?,
                    )
                    .await
            }
            ScriptOp::ReplaceOne {
                filter,
                replacement,
                options,
            } => {
                collection
                    .replace_one(
                        json_to_document(&filter)?,
                        json_to_document(&replacement)?,
                        options.replace_options()?,
                    )
                    .await
            }
            ScriptOp::DeleteOne { filter, options } => {
                collection
                    .delete_one(json_to_document(&filter)?, options.delete_options()?)
                    .await
            }
            ScriptOp::DeleteMany { filter, options } => {
                collection
                    .delete_many(json_to_document(&filter)?, options.delete_options()?)
                    .await
            }
            ScriptOp::Find { filter, options } => {
                collection
                    .find(optional_document(filter.as_ref())?, options.find_options()?)
                    .await
            }
            ScriptOp::FindOne { filter, options } => {
                collection
                    .find_one(
                        optional_document(filter.as_ref())?,
                        options.find_one_options()?,
                    )
                    .await
            }
            ScriptOp::Distinct {
                key,
                filter,
                options,
            } => {
                collection
                    .distinct(
                        &key,
                        optional_document(filter.as_ref())?,
                        options.distinct_options()?,
                    )
                    .await
            }
            ScriptOp::CountDocuments { filter, options } => {
                collection
                    .count_documents(
                        optional_document(filter.as_ref())?,
                        options.count_options()?,
                    )
                    .await
            }
            ScriptOp::EstimatedDocumentCount { options } => {
                collection
                    .estimated_document_count(options.estimated_count_options()?)
                    .await
            }
            ScriptOp::Aggregate { pipeline, options } => {
                collection
                    .aggregate(documents(&pipeline)?, options.aggregate_options()?)
                    .await
            }
            ScriptOp::FindOneAndDelete { filter, options } => {
                collection
                    .find_one_and_delete(
                        json_to_document(&filter)?,
                        options.find_one_and_delete_options()?,
                    )
                    .await
            }
            ScriptOp::FindOneAndReplace {
                filter,
                replacement,
                options,
            } => {
                collection
                    .find_one_and_replace(
                        json_to_document(&filter)?,
                        json_to_document(&replacement)?,
                        options.find_one_and_replace_options()?,
                    )
                    .await
            }
            ScriptOp::FindOneAndUpdate {
                filter,
                update,
                options,
            } => {
                collection
                    .find_one_and_update(
                        json_to_document(&filter)?,
                        update_from_json(&update)?,
                        options.find_one_and_update_options()?,
                    )
                    .await
            }
            ScriptOp::Watch { pipeline, options } => {
                collection
                    .watch(documents(&pipeline)?, options.change_stream_options()?)
                    .await
            }
        }
    }
}

fn optional_document(value: Option<&Value>) -> Result<Option<Document>> {
    value.map(json_to_document).transpose()
}

fn documents(values: &[Value]) -> Result<Vec<Document>> {
    values.iter().map(json_to_document).collect()
}

/// A JSON object is a replacement/operator document; a JSON array is an
/// aggregation-pipeline update.
fn update_from_json(value: &Value) -> Result<UpdateModifications> {
    match value {
        Value::Array(stages) => Ok(UpdateModifications::Pipeline(documents(stages)?)),
        other => Ok(UpdateModifications::Document(json_to_document(other)?)),
    }
}

/// Untyped per-operation options, as they appear in a script line. Fields
/// irrelevant to the operation at hand are simply ignored by the matching
/// conversion.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionBag {
    pub upsert: Option<bool>,
    pub bypass_document_validation: Option<bool>,
    pub array_filters: Option<Vec<Value>>,
    pub hint: Option<Value>,
    pub sort: Option<Value>,
    pub projection: Option<Value>,
    pub collation: Option<Value>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub batch_size: Option<u32>,
    pub allow_disk_use: Option<bool>,
    pub full_document: Option<String>,
    pub return_document: Option<String>,
}

impl OptionBag {
    fn hint(&self) -> Result<Option<mongodb::options::Hint>> {
        self.hint
            .as_ref()
            .map(|value| hint_from_bson(&json_to_bson(value)?))
            .transpose()
    }

    fn sort(&self) -> Result<Option<Document>> {
        self.sort
            .as_ref()
            .map(|value| sort_document_from_bson(&json_to_bson(value)?))
            .transpose()
    }

    fn projection(&self) -> Result<Option<Document>> {
        self.projection
            .as_ref()
            .map(|value| projection_from_bson(&json_to_bson(value)?))
            .transpose()
    }

    fn collation(&self) -> Result<Option<mongodb::options::Collation>> {
        self.collation
            .as_ref()
            .map(|value| {
                let bson = json_to_bson(value)?;
                Ok(mongodb::bson::from_bson(bson)?)
            })
            .transpose()
    }

    fn array_filters(&self) -> Result<Option<Vec<Document>>> {
        self.array_filters
            .as_ref()
            .map(|filters| documents(filters))
            .transpose()
    }

    fn full_document(&self) -> Result<Option<FullDocumentType>> {
        self.full_document
            .as_ref()
            .map(|value| {
                let bson = mongodb::bson::Bson::String(value.clone());
                Ok(mongodb::bson::from_bson::<FullDocumentType>(bson)?)
            })
            .transpose()
    }

    fn return_document(&self) -> Result<Option<ReturnDocument>> {
        match self.return_document.as_deref() {
            None => Ok(None),
            Some("after") => Ok(Some(ReturnDocument::After)),
            Some("before") => Ok(Some(ReturnDocument::Before)),
            Some(other) => Err(Error::invalid_key_pattern(format!(
                "return_document must be \"after\" or \"before\", got \"{}\"",
                other
            ))),
        }
    }

    pub fn update_options(&self) -> Result<UpdateOptions> {
        let mut options = UpdateOptions::default();
        options.upsert = self.upsert;
        options.bypass_document_validation = self.bypass_document_validation;
        options.array_filters = self.array_filters()?;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        Ok(options)
    }

    pub fn replace_options(&self) -> Result<ReplaceOptions> {
        let mut options = ReplaceOptions::default();
        options.upsert = self.upsert;
        options.bypass_document_validation = self.bypass_document_validation;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        Ok(options)
    }

    pub fn delete_options(&self) -> Result<DeleteOptions> {
        let mut options = DeleteOptions::default();
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        Ok(options)
    }

    pub fn find_options(&self) -> Result<FindOptions> {
        let mut options = FindOptions::default();
        options.sort = self.sort()?;
        options.projection = self.projection()?;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        options.skip = self.skip;
        options.limit = self.limit;
        options.batch_size = self.batch_size;
        options.allow_disk_use = self.allow_disk_use;
        Ok(options)
    }

    pub fn find_one_options(&self) -> Result<FindOneOptions> {
        let mut options = FindOneOptions::default();
        options.sort = self.sort()?;
        options.projection = self.projection()?;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        options.skip = self.skip;
        Ok(options)
    }

    pub fn distinct_options(&self) -> Result<DistinctOptions> {
        let mut options = DistinctOptions::default();
        options.collation = self.collation()?;
        Ok(options)
    }

    pub fn count_options(&self) -> Result<CountOptions> {
        let mut options = CountOptions::default();
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        options.skip = self.skip;
        options.limit = self.limit.map(|limit| limit as u64);
        Ok(options)
    }

    pub fn estimated_count_options(&self) -> Result<EstimatedDocumentCountOptions> {
        Ok(EstimatedDocumentCountOptions::default())
    }

    pub fn aggregate_options(&self) -> Result<AggregateOptions> {
        let mut options = AggregateOptions::default();
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        options.batch_size = self.batch_size;
        options.allow_disk_use = self.allow_disk_use;
        options.bypass_document_validation = self.bypass_document_validation;
        Ok(options)
    }

    pub fn change_stream_options(&self) -> Result<ChangeStreamOptions> {
        let mut options = ChangeStreamOptions::default();
        options.full_document = self.full_document()?;
        options.collation = self.collation()?;
        options.batch_size = self.batch_size;
        Ok(options)
    }

    pub fn find_one_and_delete_options(&self) -> Result<FindOneAndDeleteOptions> {
        let mut options = FindOneAndDeleteOptions::default();
        options.sort = self.sort()?;
        options.projection = self.projection()?;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        Ok(options)
    }

    pub fn find_one_and_replace_options(&self) -> Result<FindOneAndReplaceOptions> {
        let mut options = FindOneAndReplaceOptions::default();
        options.sort = self.sort()?;
        options.projection = self.projection()?;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        options.upsert = self.upsert;
        options.bypass_document_validation = self.bypass_document_validation;
        options.return_document = self.return_document()?;
        Ok(options)
    }

    pub fn find_one_and_update_options(&self) -> Result<FindOneAndUpdateOptions> {
        let mut options = FindOneAndUpdateOptions::default();
        options.sort = self.sort()?;
        options.projection = self.projection()?;
        options.hint = self.hint()?;
        options.collation = self.collation()?;
        options.upsert = self.upsert;
        options.bypass_document_validation = self.bypass_document_validation;
        options.array_filters = self.array_filters()?;
        options.return_document = self.return_document()?;
        Ok(options)
    }
}
