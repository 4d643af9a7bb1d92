//! Driving ports for publishing and finding posts.

use async_trait::async_trait;

use crate::domain::{Coordinates, Error, PostId, PublishedPost, Username};

/// Publish geotagged posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostCommand: Send + Sync {
    /// Store a post by `author` at `location` and return its new id.
    async fn publish(
        &self,
        author: &Username,
        message: &str,
        location: Coordinates,
    ) -> Result<PostId, Error>;
}

/// Proximity search over published posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostQuery: Send + Sync {
    /// Posts within `radius_km` of `center`; the default radius applies when
    /// `radius_km` is `None`. No distance ordering is implied.
    async fn search_near(
        &self,
        center: Coordinates,
        radius_km: Option<f64>,
    ) -> Result<Vec<PublishedPost>, Error>;
}
