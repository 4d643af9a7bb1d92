//! Publishing posts and finding them by proximity.
//!
//! Posts are stored in [`POSTS_COLLECTION`] under freshly generated ids. The
//! `location` field is declared as a geo point so the store can answer
//! radius queries; results carry no distance ordering.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{
    CollectionSchema, DocumentFilter, DocumentStore, DocumentStoreError, FieldType, PostCommand,
    PostQuery,
};
use crate::domain::store_error_mapping::map_store_error;
use crate::domain::{
    Coordinates, Error, Location, LocationValidationError, Post, PostId, PublishedPost,
    RadiusValidationError, SearchRadius, Username, decode_post, encode_post,
};

/// Collection holding post documents.
pub const POSTS_COLLECTION: &str = "posts";

const LOCATION_FIELD: &str = "location";
const AUTHOR_FIELD: &str = "user";
const MESSAGE_FIELD: &str = "message";

/// Reasons a post cannot be published.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The post location is not a valid coordinate.
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] LocationValidationError),
    /// The store failed or refused the write.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// Reasons a proximity search cannot run.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The search centre is not a valid coordinate.
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] LocationValidationError),
    /// The radius is negative or not finite.
    #[error("invalid radius: {0}")]
    InvalidRadius(#[from] RadiusValidationError),
    /// The store failed or refused the query.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// Stores posts and answers proximity searches.
#[derive(Clone)]
pub struct GeoContentStore {
    store: Arc<dyn DocumentStore>,
}

impl GeoContentStore {
    /// Build a content store over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Field layout of the posts collection.
    pub fn schema() -> CollectionSchema {
        CollectionSchema::new()
            .field(LOCATION_FIELD, FieldType::GeoPoint)
            .field(AUTHOR_FIELD, FieldType::Keyword)
            .field(MESSAGE_FIELD, FieldType::Text)
    }

    /// Declare the posts collection. Safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<(), DocumentStoreError> {
        self.store
            .ensure_collection(POSTS_COLLECTION, &Self::schema())
            .await
    }

    /// Store a post by `author` and return its new id.
    ///
    /// The message is kept verbatim, empty included.
    pub async fn publish(
        &self,
        author: &Username,
        message: &str,
        location: Coordinates,
    ) -> Result<PostId, PublishError> {
        let location = Location::try_from(location)?;
        let post = Post::new(author.clone(), message, location);
        let body = encode_post(&post)
            .map_err(|err| DocumentStoreError::write_rejected(POSTS_COLLECTION, err.to_string()))?;
        let id = PostId::generate();
        self.store
            .upsert(POSTS_COLLECTION, id.as_ref(), &body)
            .await?;
        info!(post_id = %id, author = %author, "post published");
        Ok(id)
    }

    /// Posts within `radius_km` of `center`, defaulting to
    /// [`crate::domain::DEFAULT_SEARCH_RADIUS_KM`].
    ///
    /// Documents that do not decode as posts are skipped.
    pub async fn search_near(
        &self,
        center: Coordinates,
        radius_km: Option<f64>,
    ) -> Result<Vec<PublishedPost>, SearchError> {
        let center = Location::try_from(center)?;
        let radius = SearchRadius::or_default(radius_km)?;
        let filter = DocumentFilter::geo_distance(LOCATION_FIELD, center, radius);
        let mut cursor = self.store.query(POSTS_COLLECTION, &filter).await?;
        let mut posts = Vec::new();
        while let Some(document) = cursor.next_document().await? {
            match decode_post(document) {
                Ok(post) => posts.push(post),
                Err(err) => debug!(error = %err, "skipping undecodable post document"),
            }
        }
        debug!(
            count = posts.len(),
            radius_km = radius.as_km(),
            "proximity search complete"
        );
        Ok(posts)
    }
}

fn map_publish_error(error: PublishError) -> Error {
    match error {
        PublishError::InvalidLocation(err) => {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "location" }))
        }
        PublishError::Store(err) => map_store_error(err),
    }
}

fn map_search_error(error: SearchError) -> Error {
    match error {
        SearchError::InvalidLocation(err) => Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "location" })),
        SearchError::InvalidRadius(err) => {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "range" }))
        }
        SearchError::Store(err) => map_store_error(err),
    }
}

#[async_trait]
impl PostCommand for GeoContentStore {
    async fn publish(
        &self,
        author: &Username,
        message: &str,
        location: Coordinates,
    ) -> Result<PostId, Error> {
        Self::publish(self, author, message, location)
            .await
            .map_err(map_publish_error)
    }
}

#[async_trait]
impl PostQuery for GeoContentStore {
    async fn search_near(
        &self,
        center: Coordinates,
        radius_km: Option<f64>,
    ) -> Result<Vec<PublishedPost>, Error> {
        Self::search_near(self, center, radius_km)
            .await
            .map_err(map_search_error)
    }
}
