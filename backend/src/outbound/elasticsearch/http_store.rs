//! Reqwest-backed Elasticsearch document store.
//!
//! Both collections share one index. Every document carries a `collection`
//! keyword and a unique `doc_key` keyword, and is stored under the id
//! `<collection>:<key>`. Queries are always scoped with an extra `collection`
//! filter and page through results with `search_after` on `doc_key`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::dto::{MappingResponseDto, SearchPage, SearchResponseDto};
use crate::domain::ports::{
    CollectionSchema, DocumentCursor, DocumentFilter, DocumentPages, DocumentStore,
    DocumentStoreError, FieldType, StoredDocument,
};

/// Keyword field naming the collection a document belongs to.
pub(crate) const COLLECTION_FIELD: &str = "collection";
/// Keyword field holding the index-wide document id; the paging sort key.
pub(crate) const KEY_FIELD: &str = "doc_key";

/// Which store operation a failed response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Ensure,
    Write,
    Query,
}

/// Document store adapter speaking the Elasticsearch REST API.
pub struct ElasticsearchDocumentStore {
    client: Client,
    base_url: Url,
    index: String,
    page_size: usize,
}

impl ElasticsearchDocumentStore {
    /// Build an adapter with an explicit per-request timeout.
    ///
    /// `page_size` is the number of hits fetched per search request; a query
    /// keeps paging until a short page comes back.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        index: impl Into<String>,
        timeout: Duration,
        page_size: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            index: index.into(),
            page_size: page_size.max(1),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DocumentStoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DocumentStoreError::unavailable(format!(
                    "base url {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(&self.index)
            .extend(segments);
        Ok(url)
    }

    /// Document endpoint for an upsert. `refresh=true` makes the write
    /// visible to searches before the call returns.
    fn document_url(&self, collection: &str, id: &str) -> Result<Url, DocumentStoreError> {
        let mut url = self.endpoint(&["_doc", &document_id(collection, id)])?;
        url.query_pairs_mut().append_pair("refresh", "true");
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, DocumentStoreError> {
        Ok(json_request(&self.client, method, self.endpoint(segments)?))
    }

    async fn index_exists(&self, collection: &str) -> Result<bool, DocumentStoreError> {
        let (status, body) = send(self.request(Method::HEAD, &[])?).await?;
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(map_status_error(Operation::Ensure, collection, other, &body)),
        }
    }

    /// Create the index with `schema`. Returns `false` when another writer
    /// created it first.
    async fn create_index(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> Result<bool, DocumentStoreError> {
        let body = json!({ "mappings": mapping_body(schema) });
        let (status, response) = send(self.request(Method::PUT, &[])?.json(&body)).await?;
        if status.is_success() {
            info!(index = %self.index, collection, "created document index");
            return Ok(true);
        }
        if status == StatusCode::BAD_REQUEST
            && String::from_utf8_lossy(&response).contains("resource_already_exists_exception")
        {
            debug!(index = %self.index, "index created concurrently");
            return Ok(false);
        }
        Err(map_status_error(
            Operation::Ensure,
            collection,
            status,
            &response,
        ))
    }

    async fn existing_mapping(
        &self,
        collection: &str,
    ) -> Result<BTreeMap<String, Option<String>>, DocumentStoreError> {
        let (status, body) = send(self.request(Method::GET, &["_mapping"])?).await?;
        if !status.is_success() {
            return Err(map_status_error(Operation::Ensure, collection, status, &body));
        }
        let decoded: MappingResponseDto = serde_json::from_slice(&body).map_err(|error| {
            DocumentStoreError::schema_conflict(
                collection,
                format!("invalid mapping payload: {error}"),
            )
        })?;
        Ok(decoded
            .into_values()
            .flat_map(|index| index.mappings.properties)
            .map(|(name, property)| (name, property.field_type))
            .collect())
    }

    async fn extend_mapping(
        &self,
        collection: &str,
        missing: &CollectionSchema,
    ) -> Result<(), DocumentStoreError> {
        let (status, body) =
            send(self.request(Method::PUT, &["_mapping"])?.json(&mapping_body(missing))).await?;
        if status.is_success() {
            info!(index = %self.index, collection, "extended document mapping");
            Ok(())
        } else {
            Err(map_status_error(Operation::Ensure, collection, status, &body))
        }
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchDocumentStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> Result<(), DocumentStoreError> {
        let declared = with_markers(schema);
        if !self.index_exists(collection).await?
            && self.create_index(collection, &declared).await?
        {
            return Ok(());
        }
        let existing = self.existing_mapping(collection).await?;
        let missing = detect_conflicts(collection, &declared, &existing)?;
        if missing.fields().next().is_some() {
            self.extend_mapping(collection, &missing).await?;
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
        let Value::Object(fields) = document else {
            return Err(DocumentStoreError::write_rejected(
                collection,
                "document must be a JSON object",
            ));
        };
        let mut body = fields.clone();
        body.insert(COLLECTION_FIELD.to_owned(), Value::from(collection));
        body.insert(KEY_FIELD.to_owned(), Value::from(document_id(collection, id)));

        let url = self.document_url(collection, id)?;
        let (status, response) =
            send(json_request(&self.client, Method::PUT, url).json(&body)).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(map_status_error(Operation::Write, collection, status, &response))
        }
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<DocumentCursor, DocumentStoreError> {
        let mut pages = SearchPages {
            client: self.client.clone(),
            url: self.endpoint(&["_search"])?,
            collection: collection.to_owned(),
            filter: filter.clone(),
            page_size: self.page_size,
            search_after: None,
        };
        let Some(first) = pages.fetch(None).await? else {
            return Ok(DocumentCursor::empty());
        };
        match first.search_after {
            None => Ok(DocumentCursor::from_documents(first.documents)),
            Some(after) => {
                pages.search_after = Some(after);
                Ok(DocumentCursor::paged(first.documents, Box::new(pages)))
            }
        }
    }

    /// A missing index still proves the cluster answers.
    async fn ping(&self) -> Result<(), DocumentStoreError> {
        let (status, body) = send(self.request(Method::HEAD, &[])?).await?;
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(DocumentStoreError::unavailable(format!(
                "index check answered status {}: {}",
                status.as_u16(),
                body_preview(&body)
            )))
        }
    }
}

/// Remaining pages of one search, fetched with `search_after`.
struct SearchPages {
    client: Client,
    url: Url,
    collection: String,
    filter: DocumentFilter,
    page_size: usize,
    search_after: Option<Vec<Value>>,
}

impl SearchPages {
    /// One `_search` round trip. `None` means the index does not exist.
    async fn fetch(
        &self,
        search_after: Option<&[Value]>,
    ) -> Result<Option<SearchPage>, DocumentStoreError> {
        let body = search_body(&self.collection, &self.filter, self.page_size, search_after);
        let request = json_request(&self.client, Method::POST, self.url.clone()).json(&body);
        let (status, response) = send(request).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(
                Operation::Query,
                &self.collection,
                status,
                &response,
            ));
        }
        let decoded: SearchResponseDto = serde_json::from_slice(&response).map_err(|error| {
            DocumentStoreError::query_rejected(
                &self.collection,
                format!("invalid search payload: {error}"),
            )
        })?;
        Ok(Some(decoded.into_page(&self.collection, self.page_size)))
    }
}

#[async_trait]
impl DocumentPages for SearchPages {
    async fn next_page(&mut self) -> Result<Option<Vec<StoredDocument>>, DocumentStoreError> {
        let Some(after) = self.search_after.take() else {
            return Ok(None);
        };
        let page = self.fetch(Some(after.as_slice())).await?;
        Ok(page.map(|page| {
            self.search_after = page.search_after;
            page.documents
        }))
    }
}

fn json_request(client: &Client, method: Method, url: Url) -> RequestBuilder {
    client
        .request(method, url)
        .header(reqwest::header::ACCEPT, "application/json")
}

async fn send(request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), DocumentStoreError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    Ok((status, body.to_vec()))
}

fn document_id(collection: &str, id: &str) -> String {
    format!("{collection}:{id}")
}

/// `schema` preceded by the marker fields every document carries.
fn with_markers(schema: &CollectionSchema) -> CollectionSchema {
    schema.fields().fold(
        CollectionSchema::new()
            .field(COLLECTION_FIELD, FieldType::Keyword)
            .field(KEY_FIELD, FieldType::Keyword),
        |declared, (name, field_type)| declared.field(name, field_type),
    )
}

fn mapping_body(schema: &CollectionSchema) -> Value {
    let properties: Map<String, Value> = schema
        .fields()
        .map(|(name, field_type)| (name.to_owned(), json!({ "type": field_type.as_str() })))
        .collect();
    json!({ "properties": properties })
}

fn search_body(
    collection: &str,
    filter: &DocumentFilter,
    size: usize,
    search_after: Option<&[Value]>,
) -> Value {
    let clause = match filter {
        DocumentFilter::Term { field, value } => json!({ "term": { field: value } }),
        DocumentFilter::GeoDistance {
            field,
            center,
            radius,
        } => json!({
            "geo_distance": {
                "distance": format!("{}km", radius.as_km()),
                field: { "lat": center.lat(), "lon": center.lon() }
            }
        }),
    };
    let mut body = json!({
        "size": size,
        "sort": [{ KEY_FIELD: "asc" }],
        "query": {
            "bool": {
                "filter": [
                    { "term": { COLLECTION_FIELD: collection } },
                    clause
                ]
            }
        }
    });
    if let (Some(after), Value::Object(fields)) = (search_after, &mut body) {
        fields.insert("search_after".to_owned(), Value::from(after.to_vec()));
    }
    body
}

/// Compare `schema` with the live mapping. Returns the declared fields the
/// mapping lacks; a field mapped with another type is a conflict.
fn detect_conflicts(
    collection: &str,
    schema: &CollectionSchema,
    existing: &BTreeMap<String, Option<String>>,
) -> Result<CollectionSchema, DocumentStoreError> {
    let mut missing = CollectionSchema::new();
    for (name, field_type) in schema.fields() {
        match existing.get(name) {
            None => missing = missing.field(name, field_type),
            Some(Some(mapped)) if mapped == field_type.as_str() => {}
            Some(mapped) => {
                return Err(DocumentStoreError::schema_conflict(
                    collection,
                    format!(
                        "field {name} is mapped as {}, expected {field_type}",
                        mapped.as_deref().unwrap_or("object")
                    ),
                ));
            }
        }
    }
    Ok(missing)
}

fn map_transport_error(error: reqwest::Error) -> DocumentStoreError {
    if error.is_timeout() {
        DocumentStoreError::unavailable(format!("request timed out: {error}"))
    } else {
        DocumentStoreError::unavailable(error.to_string())
    }
}

fn map_status_error(
    operation: Operation,
    collection: &str,
    status: StatusCode,
    body: &[u8],
) -> DocumentStoreError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    if !status.is_client_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return DocumentStoreError::unavailable(message);
    }
    match operation {
        Operation::Ensure => DocumentStoreError::schema_conflict(collection, message),
        Operation::Write => DocumentStoreError::write_rejected(collection, message),
        Operation::Query => DocumentStoreError::query_rejected(collection, message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
