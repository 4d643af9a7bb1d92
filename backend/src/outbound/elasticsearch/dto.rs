//! DTOs for the Elasticsearch REST payloads the adapter reads.
//!
//! Responses are decoded into these transport shapes first, then mapped into
//! [`StoredDocument`] values in one pass.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::ports::StoredDocument;

use super::http_store::{COLLECTION_FIELD, KEY_FIELD};

#[derive(Debug, Deserialize)]
pub(super) struct SearchResponseDto {
    pub(super) hits: HitsDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct HitsDto {
    #[serde(default)]
    pub(super) hits: Vec<HitDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HitDto {
    #[serde(rename = "_id")]
    pub(super) id: String,
    #[serde(rename = "_source", default)]
    pub(super) source: Value,
    /// Sort values of the hit, echoed back as `search_after`.
    #[serde(default)]
    pub(super) sort: Vec<Value>,
}

/// One decoded page of search hits.
#[derive(Debug, Default, PartialEq)]
pub(super) struct SearchPage {
    pub(super) documents: Vec<StoredDocument>,
    /// Cursor for the following page; `None` when this page was short.
    pub(super) search_after: Option<Vec<Value>>,
}

/// `GET /{index}/_mapping` answers `{"<index>": {"mappings": {...}}}`.
pub(super) type MappingResponseDto = BTreeMap<String, IndexMappingDto>;

#[derive(Debug, Deserialize)]
pub(super) struct IndexMappingDto {
    #[serde(default)]
    pub(super) mappings: MappingsDto,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct MappingsDto {
    #[serde(default)]
    pub(super) properties: BTreeMap<String, PropertyDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PropertyDto {
    /// Absent for object fields without an explicit type.
    #[serde(rename = "type")]
    pub(super) field_type: Option<String>,
}

impl SearchResponseDto {
    /// Strip the collection prefix from ids and the marker fields from
    /// bodies. Hits from other collections are dropped.
    ///
    /// A page holding `page_size` hits may have a successor, so the last
    /// hit's sort values become the next `search_after`.
    pub(super) fn into_page(self, collection: &str, page_size: usize) -> SearchPage {
        let hits = self.hits.hits;
        let search_after = if hits.len() >= page_size {
            hits.last()
                .map(|hit| hit.sort.clone())
                .filter(|sort| !sort.is_empty())
        } else {
            None
        };
        let documents = hits
            .into_iter()
            .filter_map(|hit| hit.into_document(collection))
            .collect();
        SearchPage {
            documents,
            search_after,
        }
    }
}

impl HitDto {
    fn into_document(self, collection: &str) -> Option<StoredDocument> {
        let id = self
            .id
            .strip_prefix(collection)
            .and_then(|rest| rest.strip_prefix(':'))?
            .to_owned();
        let mut body = self.source;
        if let Value::Object(fields) = &mut body {
            fields.remove(COLLECTION_FIELD);
            fields.remove(KEY_FIELD);
        }
        Some(StoredDocument::new(id, body))
    }
}
