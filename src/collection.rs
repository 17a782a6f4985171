use crate::errors::StoreError;
use crate::query::{eval_filter, parse_filter};
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use std::io::BufRead;
use std::sync::Arc;

/// The storage collaborator consumed by the query handler.
///
/// `find` receives the filter document exactly as decoded from the event and
/// returns every matching document. Implementations must be safe to share
/// between concurrent handler invocations.
pub trait DocumentStore: Send + Sync {
    /// # Errors
    /// Returns a `StoreError` when the lookup cannot be performed.
    fn find(&self, filter: &BsonDocument) -> Result<Vec<BsonDocument>, StoreError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn find(&self, filter: &BsonDocument) -> Result<Vec<BsonDocument>, StoreError> {
        (**self).find(filter)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn find(&self, filter: &BsonDocument) -> Result<Vec<BsonDocument>, StoreError> {
        (**self).find(filter)
    }
}

/// An absent store reports itself unavailable.
impl<T: DocumentStore> DocumentStore for Option<T> {
    fn find(&self, filter: &BsonDocument) -> Result<Vec<BsonDocument>, StoreError> {
        match self {
            Some(store) => store.find(filter),
            None => Err(StoreError::Unavailable),
        }
    }
}

/// An in-memory, insertion-ordered document collection.
pub struct Collection {
    name: String,
    docs: RwLock<Vec<BsonDocument>>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), docs: RwLock::new(Vec::new()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document, assigning an `_id` when it has none. Returns the `_id`.
    pub fn insert(&self, mut doc: BsonDocument) -> Bson {
        let id = match doc.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                doc.insert("_id", id.clone());
                id
            }
        };
        self.docs.write().push(doc);
        id
    }

    pub fn insert_many(&self, docs: impl IntoIterator<Item = BsonDocument>) -> Vec<Bson> {
        docs.into_iter().map(|d| self.insert(d)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Seeds the collection from NDJSON: one JSON object per line, blank lines skipped.
    ///
    /// # Errors
    /// Returns `StoreError::Seed` naming the first line that is not a JSON object.
    pub fn load_ndjson<R: BufRead>(&self, reader: R) -> Result<usize, StoreError> {
        let mut inserted = 0usize;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let seed_err = |reason: String| StoreError::Seed { line: idx + 1, reason };
            let val: serde_json::Value =
                serde_json::from_str(line).map_err(|e| seed_err(e.to_string()))?;
            if !val.is_object() {
                return Err(seed_err("expected JSON object".into()));
            }
            let doc = bson::to_document(&val).map_err(|e| seed_err(e.to_string()))?;
            self.insert(doc);
            inserted += 1;
        }
        log::info!("seeded {inserted} documents into {}", self.name);
        Ok(inserted)
    }
}

impl DocumentStore for Collection {
    fn find(&self, filter: &BsonDocument) -> Result<Vec<BsonDocument>, StoreError> {
        let parsed = parse_filter(filter)?;
        let docs = self.docs.read();
        Ok(docs.iter().filter(|d| eval_filter(d, &parsed)).cloned().collect())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
