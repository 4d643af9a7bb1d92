//! Post API handlers.
//!
//! ```text
//! POST /post {"message":"hello","location":{"lat":37.78,"lon":-122.41}}
//! GET /search?lat=37.78&lon=-122.41&range=50
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Coordinates, Error, PostId, PublishedPost};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::state::HttpState;

/// Body for `POST /post`. The author is the authenticated caller.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PublishPostRequest {
    /// Message body; stored verbatim.
    #[schema(example = "hello")]
    pub message: String,
    /// Where the post was made.
    pub location: Coordinates,
}

/// Body returned by `POST /post`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PublishPostResponse {
    /// Identifier of the stored post.
    pub id: PostId,
}

/// Query string for `GET /search`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Latitude of the search centre.
    pub lat: f64,
    /// Longitude of the search centre.
    pub lon: f64,
    /// Search radius in kilometres; defaults to 200.
    pub range: Option<f64>,
}

/// Publish a geotagged post.
#[utoipa::path(
    post,
    path = "/post",
    request_body = PublishPostRequest,
    responses(
        (status = 201, description = "Post stored", body = PublishPostResponse),
        (status = 400, description = "Invalid location", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 503, description = "Document store unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["posts"],
    operation_id = "publishPost"
)]
#[post("/post")]
pub async fn publish_post(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<PublishPostRequest>,
) -> ApiResult<HttpResponse> {
    let PublishPostRequest { message, location } = payload.into_inner();
    let id = state
        .posts
        .publish(user.username(), &message, location)
        .await?;
    Ok(HttpResponse::Created().json(PublishPostResponse { id }))
}

/// Find posts near a location.
///
/// Results are unordered with respect to distance.
#[utoipa::path(
    get,
    path = "/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Posts within range", body = [PublishedPost]),
        (status = 400, description = "Invalid location or radius", body = Error),
        (status = 401, description = "Missing or invalid token", body = Error),
        (status = 503, description = "Document store unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["posts"],
    operation_id = "searchPosts"
)]
#[get("/search")]
pub async fn search_posts(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    params: web::Query<SearchParams>,
) -> ApiResult<web::Json<Vec<PublishedPost>>> {
    let SearchParams { lat, lon, range } = params.into_inner();
    let posts = state
        .search
        .search_near(Coordinates::new(lat, lon), range)
        .await?;
    Ok(web::Json(posts))
}
