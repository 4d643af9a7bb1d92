//! HTTP inbound adapter exposing REST endpoints.

use actix_cors::Cors;
use actix_web::web;

pub mod auth;
pub mod error;
pub mod health;
pub mod posts;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;

/// Register the API routes and extractor configuration on `cfg`.
///
/// The caller provides [`state::HttpState`] as `web::Data`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .service(users::signup)
        .service(users::login)
        .service(posts::publish_post)
        .service(posts::search_posts);
}

/// Cross-origin policy: any origin, method and header.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}
