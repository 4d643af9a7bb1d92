//! Shared fixtures for HTTP handler tests.

use std::sync::Arc;

use actix_web::web;

use crate::domain::ports::{
    MockLoginService, MockPostCommand, MockPostQuery, MockSessionAuthenticator,
    MockUserRegistration,
};
use crate::domain::{Error, Username};
use crate::inbound::http::state::HttpState;

/// State whose ports panic if called; override the fields a test needs.
pub fn test_state() -> HttpState {
    HttpState {
        registration: Arc::new(MockUserRegistration::new()),
        login: Arc::new(MockLoginService::new()),
        sessions: Arc::new(MockSessionAuthenticator::new()),
        posts: Arc::new(MockPostCommand::new()),
        search: Arc::new(MockPostQuery::new()),
    }
}

/// Authenticator accepting the token `valid-token` as `user`.
pub fn sessions_accepting(user: &'static str) -> Arc<MockSessionAuthenticator> {
    let mut sessions = MockSessionAuthenticator::new();
    sessions.expect_authenticate().returning(move |token| {
        if token == "valid-token" {
            Username::new(user).map_err(|err| Error::internal(err.to_string()))
        } else {
            Err(Error::unauthorized("invalid session token"))
        }
    });
    Arc::new(sessions)
}

/// Wrap state for `App::app_data`.
pub fn data(state: HttpState) -> web::Data<HttpState> {
    web::Data::new(state)
}
