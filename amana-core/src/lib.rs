//! Amana Core - book catalogue and reviews over flat JSON files
//!
//! This crate owns the data model, the in-memory catalogue with its query
//! and mutation operations, and the persistence layer.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod catalogue;
pub mod dates;
pub mod error;
pub mod integrity;
pub mod store;
#[allow(missing_docs)]
pub mod types;

pub use aggregate::BookAggregates;
pub use catalogue::{Catalogue, CatalogueSnapshot, TOP_RATED_LIMIT};
pub use error::{CatalogueError, Result};
pub use integrity::IntegrityReport;
pub use store::{CollectionStore, InMemoryStore, JsonFileStore};
pub use types::{Book, BookReviews, NewBook, NewReview, Review, ReviewReceipt, ScoredBook};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
