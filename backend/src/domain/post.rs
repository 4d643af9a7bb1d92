//! Geotagged post model and its stored representation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ports::StoredDocument;
use crate::domain::{Location, Username};

/// Opaque post identifier assigned at creation.
///
/// Fresh identifiers are random v4 UUIDs so independent instances never need
/// to coordinate. Identifiers read back from the store are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "0b7e1a3c-58f4-4cf6-9a55-1e0e3f4d2f10")]
pub struct PostId(String);

impl PostId {
    /// Generate a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an identifier read back from the store. Blank ids are refused.
    pub fn from_stored(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        (!raw.trim().is_empty()).then_some(Self(raw))
    }
}

impl AsRef<str> for PostId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A short message pinned to a location.
///
/// Serialises as `{"user", "message", "location"}`; the `user` key is the
/// document shape the posts index has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    #[serde(rename = "user")]
    #[schema(value_type = String, example = "dave")]
    author: Username,
    #[schema(example = "hello")]
    message: String,
    location: Location,
}

impl Post {
    /// Build a post from already validated parts.
    pub fn new(author: Username, message: impl Into<String>, location: Location) -> Self {
        Self {
            author,
            message: message.into(),
            location,
        }
    }

    /// Author of the post.
    pub fn author(&self) -> &Username {
        &self.author
    }

    /// Message body.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Where the post was made.
    pub fn location(&self) -> Location {
        self.location
    }
}

/// A post together with its store identity, as returned by searches.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PublishedPost {
    /// Store identifier.
    pub id: PostId,
    /// Post content.
    #[serde(flatten)]
    pub post: Post,
}

/// Reasons a stored document cannot be read as a post.
#[derive(Debug, thiserror::Error)]
pub enum PostDecodeError {
    /// The document id was blank.
    #[error("post document has a blank id")]
    BlankId,
    /// The body did not match the post shape.
    #[error("post document {id} is malformed: {source}")]
    Malformed {
        /// Document id.
        id: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Encode a post as a store document body.
pub fn encode_post(post: &Post) -> Result<Value, serde_json::Error> {
    serde_json::to_value(post)
}

/// Decode a stored document into a post.
///
/// # Examples
/// ```
/// use around::domain::decode_post;
/// use around::domain::ports::StoredDocument;
/// use serde_json::json;
///
/// let doc = StoredDocument::new(
///     "p-1",
///     json!({"user": "dave", "message": "hi", "location": {"lat": 1.0, "lon": 2.0}}),
/// );
/// let post = decode_post(doc).expect("well-formed post");
/// assert_eq!(post.post.author().as_ref(), "dave");
/// ```
pub fn decode_post(document: StoredDocument) -> Result<PublishedPost, PostDecodeError> {
    let StoredDocument { id, body } = document;
    let post = serde_json::from_value::<Post>(body)
        .map_err(|source| PostDecodeError::Malformed { id: id.clone(), source })?;
    let id = PostId::from_stored(id).ok_or(PostDecodeError::BlankId)?;
    Ok(PublishedPost { id, post })
}
