//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint of the inbound layer, the request
//! and response bodies they exchange, and the bearer token security scheme
//! issued by `POST /login`. Swagger UI serves it in debug builds and the
//! `openapi-dump` binary prints it for external tooling.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Coordinates, Error, ErrorCode, Post, PostId, PublishedPost};
use crate::inbound::http::health::{ProbeReport, ProbeStatus};
use crate::inbound::http::posts::{PublishPostRequest, PublishPostResponse};
use crate::inbound::http::users::{CredentialsRequest, LoginResponse, SignupResponse};

/// Name of the bearer security scheme in the generated document.
pub const BEARER_SCHEME: &str = "BearerToken";

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Session token issued by POST /login."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Around API",
        description = "Geotagged posts with proximity search and token sessions.",
        license(name = "MIT", url = "https://opensource.org/license/mit")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::users::signup,
        crate::inbound::http::users::login,
        crate::inbound::http::posts::publish_post,
        crate::inbound::http::posts::search_posts,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        CredentialsRequest,
        SignupResponse,
        LoginResponse,
        Coordinates,
        PostId,
        Post,
        PublishedPost,
        PublishPostRequest,
        PublishPostResponse,
        ProbeStatus,
        ProbeReport
    )),
    tags(
        (name = "users", description = "Account creation and login"),
        (name = "posts", description = "Publishing and proximity search"),
        (name = "health", description = "Liveness and store-aware readiness probes")
    )
)]
pub struct ApiDoc;
