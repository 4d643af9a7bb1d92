//! In-process document store.
//!
//! Backs local development (`store_backend = "memory"`) and tests. Documents
//! live in per-collection ordered maps keyed by id, so query results come
//! back in ascending id order. Geo filters use haversine distance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Location;
use crate::domain::ports::{
    CollectionSchema, DocumentCursor, DocumentFilter, DocumentStore, DocumentStoreError, FieldType,
    StoredDocument,
};

#[derive(Debug, Default)]
struct MemoryCollection {
    schema: CollectionSchema,
    documents: BTreeMap<String, Value>,
}

/// Thread-safe in-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryDocumentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryCollection>>, DocumentStoreError> {
        self.collections
            .read()
            .map_err(|_| DocumentStoreError::unavailable("in-memory store lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryCollection>>, DocumentStoreError> {
        self.collections
            .write()
            .map_err(|_| DocumentStoreError::unavailable("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> Result<(), DocumentStoreError> {
        let mut collections = self.write()?;
        let entry = collections.entry(collection.to_owned()).or_default();
        for (name, requested) in schema.fields() {
            match entry.schema.field_type(name) {
                Some(existing) if existing != requested => {
                    return Err(DocumentStoreError::schema_conflict(
                        collection,
                        format!("field {name} is {existing}, requested {requested}"),
                    ));
                }
                Some(_) => {}
                None => entry.schema = std::mem::take(&mut entry.schema).field(name, requested),
            }
        }
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), DocumentStoreError> {
        if id.is_empty() {
            return Err(DocumentStoreError::write_rejected(
                collection,
                "document id must not be empty",
            ));
        }
        if !document.is_object() {
            return Err(DocumentStoreError::write_rejected(
                collection,
                "document body must be a JSON object",
            ));
        }
        let mut collections = self.write()?;
        let entry = collections.entry(collection.to_owned()).or_default();
        if let Some(field) = first_invalid_geo_field(&entry.schema, document) {
            return Err(DocumentStoreError::write_rejected(
                collection,
                format!("field {field} is not a valid geo point"),
            ));
        }
        entry.documents.insert(id.to_owned(), document.clone());
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<DocumentCursor, DocumentStoreError> {
        let collections = self.read()?;
        let Some(entry) = collections.get(collection) else {
            return Ok(DocumentCursor::empty());
        };
        if let DocumentFilter::GeoDistance { field, .. } = filter {
            if entry.schema.field_type(field) != Some(FieldType::GeoPoint) {
                return Err(DocumentStoreError::query_rejected(
                    collection,
                    format!("field {field} is not mapped as a geo point"),
                ));
            }
        }
        let matches = entry
            .documents
            .iter()
            .filter(|(_, body)| matches_filter(filter, body))
            .map(|(id, body)| StoredDocument::new(id.clone(), body.clone()))
            .collect();
        Ok(DocumentCursor::from_documents(matches))
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        self.read().map(drop)
    }
}

fn matches_filter(filter: &DocumentFilter, body: &Value) -> bool {
    match filter {
        DocumentFilter::Term { field, value } => {
            body.get(field).and_then(Value::as_str) == Some(value.as_str())
        }
        DocumentFilter::GeoDistance {
            field,
            center,
            radius,
        } => geo_point(body.get(field))
            .is_some_and(|point| center.distance_km(&point) <= radius.as_km()),
    }
}

fn geo_point(value: Option<&Value>) -> Option<Location> {
    value.and_then(|raw| serde_json::from_value::<Location>(raw.clone()).ok())
}

fn first_invalid_geo_field<'a>(schema: &'a CollectionSchema, document: &Value) -> Option<&'a str> {
    schema
        .fields()
        .filter(|(_, kind)| *kind == FieldType::GeoPoint)
        .map(|(name, _)| name)
        .find(|name| {
            document
                .get(*name)
                .is_some_and(|raw| geo_point(Some(raw)).is_none())
        })
}
