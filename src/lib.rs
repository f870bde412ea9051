//! Explain-first mirror of the MongoDB CRUD API.
//!
//! [`ExplainableCollection`] wraps a [`mongodb::Collection`] and exposes the
//! same CRUD methods, but each call rebuilds the wire-level command the
//! driver would have sent, wraps it in an `explain` envelope, and asks the
//! server for the query-execution plan instead of performing the operation.
//!
//! ```rust,ignore
//! use mongo_explain::{ExplainableCollection, Verbosity};
//! use mongodb::bson::doc;
//!
//! let products = client.database("db").collection("products");
//! let explain = ExplainableCollection::new(products)
//!     .verbosity(Verbosity::ExecutionStats);
//!
//! let plan = explain
//!     .update_one(
//!         doc! { "quantity": 1057, "category": "apparel" },
//!         doc! { "$set": { "reorder": true } },
//!         None,
//!     )
//!     .await?;
//! ```

pub mod collection;
pub mod commands;
pub mod error;
pub mod script;
pub mod utils;

pub use collection::{ExplainableCollection, Verbosity};
pub use error::{Error, Result};
pub use script::{OptionBag, ScriptOp};
