use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use mongodb::bson::{doc, Document};
use mongodb::options::{
    AggregateOptions, ChangeStreamOptions, CountOptions, DeleteOptions, DistinctOptions,
    EstimatedDocumentCountOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions,
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, ReplaceOptions, UpdateModifications,
    UpdateOptions,
};
use mongodb::Collection;
use tracing::debug;

use crate::commands;
use crate::error::Result;

/// How much execution detail the server includes in an explain response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    QueryPlanner,
    ExecutionStats,
    AllPlansExecution,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::QueryPlanner => "queryPlanner",
            Verbosity::ExecutionStats => "executionStats",
            Verbosity::AllPlansExecution => "allPlansExecution",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queryPlanner" | "query-planner" => Ok(Verbosity::QueryPlanner),
            "executionStats" | "execution-stats" => Ok(Verbosity::ExecutionStats),
            "allPlansExecution" | "all-plans-execution" => Ok(Verbosity::AllPlansExecution),
            other => Err(format!(
                "unrecognized verbosity \"{}\", expected queryPlanner, \
                 executionStats or allPlansExecution",
                other
            )),
        }
    }
}

/// A collection handle whose CRUD methods ask the server for an execution
/// plan instead of running the operation.
///
/// Methods mirror [`mongodb::Collection`] signatures, so an
/// `ExplainableCollection` can stand in wherever a collection's CRUD
/// surface is consumed. Each call performs exactly one `run_command` round
/// trip against the collection's owning database and returns the raw plan
/// document.
pub struct ExplainableCollection {
    collection: Collection<Document>,
    verbosity: Verbosity,
    comment: Option<String>,
    // Last pre-envelope command, kept for external inspection only.
    last_cmd_payload: Mutex<Option<Document>>,
}

impl ExplainableCollection {
    pub fn new(collection: Collection<Document>) -> Self {
        Self {
            collection,
            verbosity: Verbosity::default(),
            comment: None,
            last_cmd_payload: Mutex::new(None),
        }
    }

    /// Set the verbosity requested from the server.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Attach an opaque comment to every outgoing explain envelope.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// The command document built by the most recent call, pre-envelope.
    /// Overwritten on every call.
    pub fn last_cmd_payload(&self) -> Option<Document> {
        self.last_cmd_payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wrap a command document in the explain envelope this instance is
    /// configured to send.
    pub fn envelope(&self, command: Document) -> Document {
        let mut envelope = doc! { "explain": command };
        envelope.insert("verbosity", self.verbosity.as_str());
        if let Some(comment) = &self.comment {
            envelope.insert("comment", comment.as_str());
        }
        envelope
    }

    async fn explain(&self, command: Document) -> Result<Document> {
        let envelope = self.envelope(command.clone());
        *self
            .last_cmd_payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(command);
        debug!(
            collection = self.collection.name(),
            verbosity = self.verbosity.as_str(),
            "sending explain command"
        );
        let response = self
            .collection
            .client()
            .database(&self.collection.namespace().db)
            .run_command(envelope, None)
            .await?;
        Ok(response)
    }

    pub async fn update_one(
        &self,
        query: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::update_command(
            self.collection.name(),
            query,
            &update.into(),
            false,
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn update_many(
        &self,
        query: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::update_command(
            self.collection.name(),
            query,
            &update.into(),
            true,
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn replace_one(
        &self,
        query: Document,
        replacement: Document,
        options: impl Into<Option<ReplaceOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::replace_command(
            self.collection.name(),
            query,
            replacement,
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn delete_one(
        &self,
        query: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command =
            commands::delete_command(self.collection.name(), query, 1, options.as_ref())?;
        self.explain(command).await
    }

    pub async fn delete_many(
        &self,
        query: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command =
            commands::delete_command(self.collection.name(), query, 0, options.as_ref())?;
        self.explain(command).await
    }

    pub async fn find(
        &self,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command =
            commands::find_command(self.collection.name(), filter.into(), options.as_ref())?;
        self.explain(command).await
    }

    pub async fn find_one(
        &self,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<FindOneOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command =
            commands::find_one_command(self.collection.name(), filter.into(), options.as_ref())?;
        self.explain(command).await
    }

    pub async fn distinct(
        &self,
        field_name: impl AsRef<str>,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<DistinctOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::distinct_command(
            self.collection.name(),
            field_name.as_ref(),
            filter.into(),
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn count_documents(
        &self,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<CountOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::count_documents_command(
            self.collection.name(),
            filter.into(),
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn estimated_document_count(
        &self,
        options: impl Into<Option<EstimatedDocumentCountOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::count_command(self.collection.name(), None, options.as_ref())?;
        self.explain(command).await
    }

    pub async fn aggregate(
        &self,
        pipeline: impl IntoIterator<Item = Document>,
        options: impl Into<Option<AggregateOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::aggregate_command(
            self.collection.name(),
            pipeline.into_iter().collect(),
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn find_one_and_delete(
        &self,
        filter: Document,
        options: impl Into<Option<FindOneAndDeleteOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::find_one_and_delete_command(
            self.collection.name(),
            filter,
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: impl Into<Option<FindOneAndReplaceOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::find_one_and_replace_command(
            self.collection.name(),
            filter,
            replacement,
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<FindOneAndUpdateOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::find_one_and_update_command(
            self.collection.name(),
            filter,
            &update.into(),
            options.as_ref(),
        )?;
        self.explain(command).await
    }

    pub async fn watch(
        &self,
        pipeline: impl IntoIterator<Item = Document>,
        options: impl Into<Option<ChangeStreamOptions>>,
    ) -> Result<Document> {
        let options = options.into();
        let command = commands::change_stream_command(
            self.collection.name(),
            pipeline.into_iter().collect(),
            options.as_ref(),
        )?;
        self.explain(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::options::ClientOptions;
    use mongodb::Client;
    use std::time::Duration;

    // No server listens here; selection gives up almost immediately, which
    // is all these tests need to observe the payload side effects.
    async fn offline_collection() -> Collection<Document> {
        let mut options = ClientOptions::parse("mongodb://localhost:27017")
            .await
            .unwrap();
        options.server_selection_timeout = Some(Duration::from_millis(10));
        let client = Client::with_options(options).unwrap();
        client.database("db").collection("products")
    }

    #[test]
    fn test_verbosity_spellings() {
        assert_eq!(Verbosity::default().as_str(), "queryPlanner");
        assert_eq!(Verbosity::ExecutionStats.as_str(), "executionStats");
        assert_eq!(
            "allPlansExecution".parse::<Verbosity>().unwrap(),
            Verbosity::AllPlansExecution
        );
        assert_eq!(
            "execution-stats".parse::<Verbosity>().unwrap(),
            Verbosity::ExecutionStats
        );
        assert!("verbose".parse::<Verbosity>().is_err());
    }

    #[tokio::test]
    async fn test_envelope_defaults() {
        let explain = ExplainableCollection::new(offline_collection().await);
        let envelope = explain.envelope(doc! { "find": "products" });
        assert_eq!(
            envelope,
            doc! {
                "explain": { "find": "products" },
                "verbosity": "queryPlanner",
            }
        );
        assert_eq!(envelope.keys().next().unwrap(), "explain");
    }

    #[tokio::test]
    async fn test_envelope_carries_configuration() {
        let explain = ExplainableCollection::new(offline_collection().await)
            .verbosity(Verbosity::AllPlansExecution)
            .comment("run 42");
        let envelope = explain.envelope(doc! { "count": "products" });
        assert_eq!(envelope.get_str("verbosity").unwrap(), "allPlansExecution");
        assert_eq!(envelope.get_str("comment").unwrap(), "run 42");
    }

    #[tokio::test]
    async fn test_last_payload_recorded_before_send() {
        let explain = ExplainableCollection::new(offline_collection().await);
        assert_eq!(explain.last_cmd_payload(), None);

        // The round trip fails (nothing is listening), but the payload memo
        // is written before the send.
        let result = explain
            .update_one(
                doc! { "quantity": 1057, "category": "apparel" },
                doc! { "$set": { "reorder": true } },
                None,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(
            explain.last_cmd_payload().unwrap(),
            doc! {
                "update": "products",
                "updates": [{
                    "q": { "quantity": 1057, "category": "apparel" },
                    "u": { "$set": { "reorder": true } },
                    "multi": false,
                }],
            }
        );
    }

    #[tokio::test]
    async fn test_last_payload_overwritten_per_call() {
        let explain = ExplainableCollection::new(offline_collection().await);
        let _ = explain.delete_one(doc! { "status": "D" }, None).await;
        let _ = explain.estimated_document_count(None).await;
        assert_eq!(
            explain.last_cmd_payload().unwrap(),
            doc! { "count": "products" }
        );
    }

    #[tokio::test]
    async fn test_find_payload_mirrors_driver_options() {
        use mongodb::options::Hint;

        let explain = ExplainableCollection::new(offline_collection().await);
        let mut options = FindOptions::default();
        options.hint = Some(Hint::Name("qty_idx".to_string()));
        options.limit = Some(5);
        let _ = explain.find(doc! { "qty": { "$gt": 0 } }, options).await;
        assert_eq!(
            explain.last_cmd_payload().unwrap(),
            doc! {
                "find": "products",
                "filter": { "qty": { "$gt": 0 } },
                "hint": "qty_idx",
                "limit": 5_i64,
            }
        );
    }
}
