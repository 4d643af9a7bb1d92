//! Driven port for the external document index.
//!
//! The store holds schema-flexible JSON documents grouped in named
//! collections and answers exact-match and geo-distance queries. Adapters
//! translate every backing-service failure into [`DocumentStoreError`]; none
//! may panic on a store error.

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Location, SearchRadius};

/// Errors raised by document store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentStoreError {
    /// Backing service unreachable or the operation deadline elapsed.
    #[error("document store unavailable: {message}")]
    Unavailable {
        /// Adapter-specific detail.
        message: String,
    },
    /// An existing collection declares an incompatible shape.
    #[error("collection {collection} has a conflicting schema: {message}")]
    SchemaConflict {
        /// Collection name.
        collection: String,
        /// Adapter-specific detail.
        message: String,
    },
    /// The store refused a write.
    #[error("write to {collection} rejected: {message}")]
    WriteRejected {
        /// Collection name.
        collection: String,
        /// Adapter-specific detail.
        message: String,
    },
    /// The store refused a query, or returned documents the caller could not
    /// read.
    #[error("query on {collection} rejected: {message}")]
    QueryRejected {
        /// Collection name.
        collection: String,
        /// Adapter-specific detail.
        message: String,
    },
}

impl DocumentStoreError {
    /// Build an [`DocumentStoreError::Unavailable`] error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Build a [`DocumentStoreError::SchemaConflict`] error.
    pub fn schema_conflict(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaConflict {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Build a [`DocumentStoreError::WriteRejected`] error.
    pub fn write_rejected(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteRejected {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Build a [`DocumentStoreError::QueryRejected`] error.
    pub fn query_rejected(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryRejected {
            collection: collection.into(),
            message: message.into(),
        }
    }
}

/// Field type declared in a collection schema hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Latitude/longitude object usable in geo-distance filters.
    GeoPoint,
    /// Exact-match string.
    Keyword,
    /// Analysed full-text string.
    Text,
}

impl FieldType {
    /// Name of the type as used by Elasticsearch mappings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GeoPoint => "geo_point",
            Self::Keyword => "keyword",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-type hints applied when a collection is created.
///
/// # Examples
/// ```
/// use around::domain::ports::{CollectionSchema, FieldType};
///
/// let schema = CollectionSchema::new().field("location", FieldType::GeoPoint);
/// assert_eq!(schema.field_type("location"), Some(FieldType::GeoPoint));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSchema {
    fields: Vec<(String, FieldType)>,
}

impl CollectionSchema {
    /// Empty schema; every field keeps the store's dynamic default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with the given type, replacing any earlier declaration.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, field_type));
        self
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Declared type of `name`, if any.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, kind)| *kind)
    }
}

/// Structured query filter.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFilter {
    /// Exact match of a keyword field.
    Term {
        /// Field name.
        field: String,
        /// Value the field must equal.
        value: String,
    },
    /// Documents whose geo-point field lies within `radius` of `center`.
    GeoDistance {
        /// Geo-point field name.
        field: String,
        /// Search centre.
        center: Location,
        /// Inclusive search radius.
        radius: SearchRadius,
    },
}

impl DocumentFilter {
    /// Exact-match filter.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Geo-distance filter.
    pub fn geo_distance(field: impl Into<String>, center: Location, radius: SearchRadius) -> Self {
        Self::GeoDistance {
            field: field.into(),
            center,
            radius,
        }
    }
}

/// A document returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document key within its collection.
    pub id: String,
    /// Document body as written.
    pub body: Value,
}

impl StoredDocument {
    /// Pair a key with its body.
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }
}

/// Further result pages behind a [`DocumentCursor`].
///
/// Adapters that fetch results in pages hand one of these to the cursor; it
/// is polled only once the documents already buffered are consumed.
#[async_trait]
pub trait DocumentPages: Send {
    /// Fetch the next page, or `None` once the result set is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Unavailable`] or
    /// [`DocumentStoreError::QueryRejected`] when the page cannot be fetched.
    async fn next_page(&mut self) -> Result<Option<Vec<StoredDocument>>, DocumentStoreError>;
}

/// Finite, single-pass sequence of query results.
///
/// Documents are handed out one at a time and decoded by the consumer. Pages
/// beyond the first are fetched on demand; once consumed the cursor cannot be
/// rewound. A failed page fetch ends the cursor.
#[derive(Default)]
pub struct DocumentCursor {
    buffered: VecDeque<StoredDocument>,
    pages: Option<Box<dyn DocumentPages>>,
}

impl fmt::Debug for DocumentCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCursor")
            .field("buffered", &self.buffered.len())
            .field("paged", &self.pages.is_some())
            .finish()
    }
}

impl DocumentCursor {
    /// Cursor over already fetched documents, in store order.
    pub fn from_documents(documents: Vec<StoredDocument>) -> Self {
        Self {
            buffered: documents.into(),
            pages: None,
        }
    }

    /// Cursor yielding `first`, then whatever `pages` produces.
    pub fn paged(first: Vec<StoredDocument>, pages: Box<dyn DocumentPages>) -> Self {
        Self {
            buffered: first.into(),
            pages: Some(pages),
        }
    }

    /// Cursor yielding nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the page source, keeping buffered documents. Used by
    /// decorators that need to observe every later fetch.
    #[must_use]
    pub fn map_pages(
        self,
        wrap: impl FnOnce(Box<dyn DocumentPages>) -> Box<dyn DocumentPages>,
    ) -> Self {
        Self {
            buffered: self.buffered,
            pages: self.pages.map(wrap),
        }
    }

    /// Next document, fetching another page when the buffer runs dry.
    ///
    /// # Errors
    ///
    /// Returns the page source's error; the cursor yields nothing afterwards.
    pub async fn next_document(&mut self) -> Result<Option<StoredDocument>, DocumentStoreError> {
        loop {
            if let Some(document) = self.buffered.pop_front() {
                return Ok(Some(document));
            }
            let Some(pages) = self.pages.as_mut() else {
                return Ok(None);
            };
            match pages.next_page().await {
                Ok(Some(page)) => self.buffered.extend(page),
                Ok(None) => {
                    self.pages = None;
                    return Ok(None);
                }
                Err(error) => {
                    self.pages = None;
                    return Err(error);
                }
            }
        }
    }

    /// Drain every remaining document.
    ///
    /// # Errors
    ///
    /// Returns the first page fetch error.
    pub async fn collect_all(mut self) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let mut documents = Vec::with_capacity(self.buffered.len());
        while let Some(document) = self.next_document().await? {
            documents.push(document);
        }
        Ok(documents)
    }
}

/// Port over the external document index.
///
/// Implementations must be safe for concurrent use; all mutation is
/// delegated to the backing store's own concurrency control.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create `collection` with the given field hints if it does not exist.
    ///
    /// Calling this repeatedly with the same hint has the same observable
    /// effect as calling it once.
    async fn ensure_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> Result<(), DocumentStoreError>;

    /// Write `document` under `id`. The write is visible to every read issued
    /// after this call returns.
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), DocumentStoreError>;

    /// Return the documents of `collection` matching `filter`, in an order
    /// that is deterministic for identical filter and store state.
    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<DocumentCursor, DocumentStoreError>;

    /// Check that the backing store answers. Used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Unavailable`] when it does not.
    async fn ping(&self) -> Result<(), DocumentStoreError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    #[test]
    fn redeclaring_a_field_replaces_its_type() {
        let schema = CollectionSchema::new()
            .field("username", FieldType::Text)
            .field("username", FieldType::Keyword);
        assert_eq!(schema.fields().count(), 1);
        assert_eq!(schema.field_type("username"), Some(FieldType::Keyword));
        assert_eq!(schema.field_type("missing"), None);
    }

    async fn next_id(cursor: &mut DocumentCursor) -> Option<String> {
        cursor
            .next_document()
            .await
            .expect("page fetch")
            .map(|doc| doc.id)
    }

    #[tokio::test]
    async fn cursor_is_single_pass() {
        let mut cursor = DocumentCursor::from_documents(vec![
            StoredDocument::new("a", json!({})),
            StoredDocument::new("b", json!({})),
        ]);
        assert_eq!(next_id(&mut cursor).await.as_deref(), Some("a"));
        assert_eq!(next_id(&mut cursor).await.as_deref(), Some("b"));
        assert_eq!(next_id(&mut cursor).await, None);
    }

    /// Pages of single documents, failing once `fail_after` pages are served.
    struct CountingPages {
        remaining: Vec<&'static str>,
        fetched: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl DocumentPages for CountingPages {
        async fn next_page(
            &mut self,
        ) -> Result<Option<Vec<StoredDocument>>, DocumentStoreError> {
            let served = self.fetched.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| served >= limit) {
                return Err(DocumentStoreError::unavailable("page fetch failed"));
            }
            if self.remaining.is_empty() {
                return Ok(None);
            }
            let id = self.remaining.remove(0);
            Ok(Some(vec![StoredDocument::new(id, json!({}))]))
        }
    }

    fn counting(
        remaining: Vec<&'static str>,
        fail_after: Option<usize>,
    ) -> (Box<dyn DocumentPages>, Arc<AtomicUsize>) {
        let fetched = Arc::new(AtomicUsize::new(0));
        let pages = CountingPages {
            remaining,
            fetched: fetched.clone(),
            fail_after,
        };
        (Box::new(pages), fetched)
    }

    #[tokio::test]
    async fn later_pages_are_fetched_on_demand() {
        let (pages, fetched) = counting(vec!["b", "c"], None);
        let mut cursor =
            DocumentCursor::paged(vec![StoredDocument::new("a", json!({}))], pages);

        assert_eq!(next_id(&mut cursor).await.as_deref(), Some("a"));
        assert_eq!(fetched.load(Ordering::SeqCst), 0);

        let rest: Vec<_> = cursor
            .collect_all()
            .await
            .expect("drain")
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(rest, ["b", "c"]);
        assert_eq!(fetched.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_page_ends_the_cursor() {
        let (pages, _) = counting(vec!["b", "c"], Some(1));
        let mut cursor = DocumentCursor::paged(Vec::new(), pages);

        assert!(cursor.next_document().await.expect("b").is_some());
        assert!(matches!(
            cursor.next_document().await,
            Err(DocumentStoreError::Unavailable { .. })
        ));
        assert_eq!(cursor.next_document().await.expect("ended"), None);
    }

    #[test]
    fn errors_render_collection_context() {
        let err = DocumentStoreError::query_rejected("posts", "bad filter");
        assert_eq!(err.to_string(), "query on posts rejected: bad filter");
    }
}
