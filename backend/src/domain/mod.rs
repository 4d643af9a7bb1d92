//! Domain primitives, services and ports.
//!
//! Purpose: Define strongly typed domain entities and the services that
//! operate on them without knowing which document store backs them. Keep
//! types immutable and document invariants and serialisation contracts
//! (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Username / User / LoginCredentials: account identity and input.
//! - Location / Coordinates / SearchRadius: validated geography.
//! - Post / PostId / PublishedPost: geotagged content.
//! - SessionIssuer / SessionToken / SigningSecret: stateless sessions.
//! - CredentialManager, AccountLoginService, GeoContentStore: services
//!   implementing the driving ports in [`ports`].

pub mod auth;
pub mod credentials;
pub mod error;
pub mod geo_content;
pub mod location;
pub mod login;
pub mod ports;
pub mod post;
pub mod session;
pub(crate) mod store_error_mapping;
pub mod user;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::credentials::{CredentialManager, RegistrationError, USERS_COLLECTION};
pub use self::error::{Error, ErrorCode};
pub use self::geo_content::{GeoContentStore, POSTS_COLLECTION, PublishError, SearchError};
pub use self::location::{
    Coordinates, DEFAULT_SEARCH_RADIUS_KM, EARTH_RADIUS_KM, Location, LocationValidationError,
    RadiusValidationError, SearchRadius,
};
pub use self::login::{AccountLoginService, INVALID_CREDENTIALS};
pub use self::post::{Post, PostDecodeError, PostId, PublishedPost, decode_post, encode_post};
pub use self::session::{
    EmptySigningSecret, SESSION_TTL_HOURS, SessionError, SessionIssueError, SessionIssuer,
    SessionToken, SigningSecret,
};
pub use self::user::{User, UserValidationError, Username};

