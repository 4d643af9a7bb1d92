//! Account API handlers.
//!
//! ```text
//! POST /signup {"username":"dave","password":"pw1"}
//! POST /login {"username":"dave","password":"pw1"}
//! ```

use actix_web::{HttpResponse, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{Error, LoginCredentials, LoginValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Credentials body shared by `POST /signup` and `POST /login`.
///
/// Example JSON:
/// `{"username":"dave","password":"pw1"}`
#[derive(Deserialize, Serialize, ToSchema)]
pub struct CredentialsRequest {
    /// Account name; surrounding whitespace is ignored.
    #[schema(example = "dave")]
    pub username: String,
    /// Account password.
    #[schema(example = "pw1")]
    pub password: String,
}

impl TryFrom<CredentialsRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: CredentialsRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Body returned by `POST /signup`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SignupResponse {
    /// Stored (trimmed) username.
    #[schema(example = "dave")]
    pub username: String,
}

/// Body returned by `POST /login`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for authenticated endpoints.
    pub token: String,
    /// Instant after which the token is refused.
    pub expires_at: DateTime<Utc>,
}

/// Create an account.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Username already exists", body = Error),
        (status = 503, description = "Document store unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "signup",
    security([])
)]
#[post("/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let CredentialsRequest { username, password } = payload.into_inner();
    let username = state.registration.register(&username, &password).await?;
    Ok(HttpResponse::Created().json(SignupResponse {
        username: username.into(),
    }))
}

/// Exchange credentials for a session token.
///
/// Unknown usernames and wrong passwords both answer `401` with the same
/// body.
#[utoipa::path(
    post,
    path = "/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let token = state.login.login(&credentials).await?;
    Ok(web::Json(LoginResponse {
        token: token.as_str().to_owned(),
        expires_at: token.expires_at(),
    }))
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": err.field(), "code": err.code() }))
}
