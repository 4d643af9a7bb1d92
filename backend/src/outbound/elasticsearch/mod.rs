//! Elasticsearch document store adapter.

mod dto;
mod http_store;

pub use http_store::ElasticsearchDocumentStore;
