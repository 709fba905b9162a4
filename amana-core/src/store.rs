//! Collection persistence
//!
//! A collection is persisted as a single JSON document of the form
//! `{ "<collection>": [ ... ] }` and always rewritten in full.

use crate::error::{CatalogueError, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default name of the book collection file
pub const BOOKS_FILE: &str = "books.json";

/// Default name of the review collection file
pub const REVIEWS_FILE: &str = "reviews.json";

/// Storage backend for one collection
pub trait CollectionStore<T>: Send + Sync {
    /// Load the whole collection
    fn load(&self) -> Result<Vec<T>>;

    /// Replace the whole collection
    fn save(&self, items: &[T]) -> Result<()>;
}

/// A collection kept in a JSON file
pub struct JsonFileStore<T> {
    path: PathBuf,
    collection: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    /// Store `collection` in the file at `path`
    pub fn new(path: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        JsonFileStore {
            path: path.into(),
            collection: collection.into(),
            _marker: PhantomData,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CatalogueError {
        CatalogueError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> CatalogueError {
        CatalogueError::MalformedCollection {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl<T> CollectionStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Vec<T>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{:?} does not exist, starting with empty {}", self.path, self.collection);
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut document: Map<String, Value> = serde_json::from_str(&text)
            .map_err(|e| self.malformed(format!("not a JSON object: {}", e)))?;

        let items = match document.remove(&self.collection) {
            Some(items @ Value::Array(_)) => items,
            Some(_) => {
                return Err(self.malformed(format!("\"{}\" is not an array", self.collection)))
            }
            None => return Err(self.malformed(format!("missing \"{}\" key", self.collection))),
        };

        let items: Vec<T> = serde_json::from_value(items)?;
        debug!("Loaded {} {} from {:?}", items.len(), self.collection, self.path);
        Ok(items)
    }

    fn save(&self, items: &[T]) -> Result<()> {
        let mut document = Map::new();
        document.insert(self.collection.clone(), serde_json::to_value(items)?);
        let mut text = serde_json::to_string_pretty(&document)?;
        text.push('\n');

        // Write next to the target so the rename stays on one filesystem
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Wrote {} {} to {:?}", items.len(), self.collection, self.path);
        Ok(())
    }
}

/// A collection kept in process memory, mainly for tests
pub struct InMemoryStore<T> {
    items: Mutex<Vec<T>>,
    fail_saves: Mutex<bool>,
}

impl<T: Clone> InMemoryStore<T> {
    /// Empty store
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Store seeded with `items`
    pub fn with_items(items: Vec<T>) -> Self {
        InMemoryStore {
            items: Mutex::new(items),
            fail_saves: Mutex::new(false),
        }
    }

    /// Snapshot of what has been saved so far
    pub fn saved(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    /// Make subsequent saves fail with an IO error
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

impl<T: Clone> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CollectionStore<T> for InMemoryStore<T>
where
    T: Clone + Send,
{
    fn load(&self) -> Result<Vec<T>> {
        Ok(self.items.lock().clone())
    }

    fn save(&self, items: &[T]) -> Result<()> {
        if *self.fail_saves.lock() {
            return Err(CatalogueError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(ErrorKind::Other, "save disabled"),
            });
        }
        *self.items.lock() = items.to_vec();
        Ok(())
    }
}
