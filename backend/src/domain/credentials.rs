//! Account registration and password verification over the document store.
//!
//! Users live in the [`USERS_COLLECTION`] keyed by username. Registration is
//! a read-then-write: two concurrent signups for one username can both pass
//! the existence check, in which case the later write wins. Callers needing
//! strict uniqueness must serialise registrations themselves.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::domain::ports::{
    CollectionSchema, DocumentFilter, DocumentStore, DocumentStoreError, FieldType,
    StoredDocument, UserRegistration,
};
use crate::domain::store_error_mapping::map_store_error;
use crate::domain::{Error, LoginCredentials, LoginValidationError, User, Username};

/// Collection holding account documents.
pub const USERS_COLLECTION: &str = "users";

const USERNAME_FIELD: &str = "username";

/// Reasons a registration is refused.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Username or password was blank.
    #[error(transparent)]
    InvalidInput(#[from] LoginValidationError),
    /// An account with this username already exists.
    #[error("username {username} is already taken")]
    AlreadyExists {
        /// The contested username.
        username: Username,
    },
    /// The store failed or refused the operation.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

#[derive(Deserialize)]
struct UserDocument {
    username: String,
    password: String,
}

/// Registers accounts and checks passwords against stored users.
#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn DocumentStore>,
}

impl CredentialManager {
    /// Build a manager over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Field layout of the users collection.
    pub fn schema() -> CollectionSchema {
        CollectionSchema::new().field(USERNAME_FIELD, FieldType::Keyword)
    }

    /// Declare the users collection. Safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<(), DocumentStoreError> {
        self.store
            .ensure_collection(USERS_COLLECTION, &Self::schema())
            .await
    }

    /// Create an account for `username` with `password`.
    ///
    /// The username is trimmed before it is checked and stored.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Username, RegistrationError> {
        let credentials = LoginCredentials::try_from_parts(username, password)?;
        let username = credentials.username().clone();
        if self.find_user(&username).await?.is_some() {
            return Err(RegistrationError::AlreadyExists { username });
        }

        let user = User::new(username.clone(), credentials.password());
        self.store
            .upsert(USERS_COLLECTION, username.as_ref(), &encode_user(&user))
            .await?;
        info!(username = %username, "user registered");
        Ok(username)
    }

    /// Whether `password` matches the stored password for `username`.
    ///
    /// Fails closed: unknown users, blank input and store failures all
    /// answer `false`.
    pub async fn verify(&self, username: &str, password: &str) -> bool {
        let Ok(username) = Username::new(username) else {
            return false;
        };
        match self.find_user(&username).await {
            Ok(Some(user)) => user.password_matches(password),
            Ok(None) => false,
            Err(error) => {
                warn!(username = %username, error = %error, "credential lookup failed; refusing");
                false
            }
        }
    }

    async fn find_user(&self, username: &Username) -> Result<Option<User>, DocumentStoreError> {
        let filter = DocumentFilter::term(USERNAME_FIELD, username.as_ref());
        let mut cursor = self.store.query(USERS_COLLECTION, &filter).await?;
        while let Some(document) = cursor.next_document().await? {
            let user = decode_user(document)?;
            if user.username() == username {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

fn encode_user(user: &User) -> Value {
    json!({
        "username": user.username().as_ref(),
        "password": user.password(),
    })
}

fn decode_user(document: StoredDocument) -> Result<User, DocumentStoreError> {
    let StoredDocument { id, body } = document;
    let malformed = |reason: String| {
        DocumentStoreError::query_rejected(
            USERS_COLLECTION,
            format!("user document {id} is malformed: {reason}"),
        )
    };
    let raw: UserDocument =
        serde_json::from_value(body).map_err(|error| malformed(error.to_string()))?;
    let username = Username::new(raw.username).map_err(|error| malformed(error.to_string()))?;
    if raw.password.is_empty() {
        return Err(malformed("password is empty".to_owned()));
    }
    Ok(User::new(username, raw.password))
}

pub(crate) fn map_registration_error(error: RegistrationError) -> Error {
    match error {
        RegistrationError::InvalidInput(err) => Error::invalid_request(err.to_string())
            .with_details(json!({ "field": err.field(), "code": err.code() })),
        RegistrationError::AlreadyExists { .. } => Error::conflict("username already exists"),
        RegistrationError::Store(err) => map_store_error(err),
    }
}

#[async_trait]
impl UserRegistration for CredentialManager {
    async fn register(&self, username: &str, password: &str) -> Result<Username, Error> {
        Self::register(self, username, password)
            .await
            .map_err(map_registration_error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{DocumentCursor, MockDocumentStore};
    use crate::outbound::memory::InMemoryDocumentStore;
    use rstest::{fixture, rstest};

    #[fixture]
    fn manager() -> CredentialManager {
        CredentialManager::new(Arc::new(InMemoryDocumentStore::new()))
    }

    #[rstest]
    #[tokio::test]
    async fn first_registration_wins(manager: CredentialManager) {
        manager.ensure_schema().await.expect("schema");
        let alice = manager.register("alice", "x").await.expect("first signup");
        assert_eq!(alice.as_ref(), "alice");

        let err = manager
            .register("alice", "y")
            .await
            .expect_err("duplicate signup");
        assert!(matches!(err, RegistrationError::AlreadyExists { .. }));

        assert!(manager.verify("alice", "x").await);
        assert!(!manager.verify("alice", "y").await);
    }

    #[rstest]
    #[tokio::test]
    async fn usernames_are_trimmed_before_storage(manager: CredentialManager) {
        let stored = manager.register("  carol ", "pw").await.expect("signup");
        assert_eq!(stored.as_ref(), "carol");
        assert!(manager.verify("carol", "pw").await);
        assert!(matches!(
            manager.register("carol", "other").await,
            Err(RegistrationError::AlreadyExists { .. })
        ));
    }

    #[rstest]
    #[case("", "pw", "username")]
    #[case("   ", "pw", "username")]
    #[case("erin", "", "password")]
    #[tokio::test]
    async fn blank_input_is_rejected(
        manager: CredentialManager,
        #[case] username: &str,
        #[case] password: &str,
        #[case] field: &str,
    ) {
        let err = manager
            .register(username, password)
            .await
            .expect_err("blank input");
        let RegistrationError::InvalidInput(inner) = err else {
            panic!("expected invalid input, got {err:?}");
        };
        assert_eq!(inner.field(), field);
    }

    #[rstest]
    #[case("nobody", "pw")]
    #[case("", "pw")]
    #[case("alice", "")]
    #[tokio::test]
    async fn verify_refuses_unknown_or_blank(
        manager: CredentialManager,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        manager.register("alice", "x").await.expect("signup");
        assert!(!manager.verify(username, password).await);
    }

    #[tokio::test]
    async fn verify_fails_closed_when_store_is_down() {
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .returning(|_, _| Err(DocumentStoreError::unavailable("connection refused")));
        let manager = CredentialManager::new(Arc::new(store));

        assert!(!manager.verify("alice", "x").await);
    }

    #[tokio::test]
    async fn register_does_not_write_when_lookup_fails() {
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .times(1)
            .returning(|_, _| Err(DocumentStoreError::unavailable("timeout")));
        store.expect_upsert().never();
        let manager = CredentialManager::new(Arc::new(store));

        let err = manager.register("alice", "x").await.expect_err("store down");
        assert!(matches!(
            err,
            RegistrationError::Store(DocumentStoreError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_user_documents_surface_as_query_rejected() {
        let mut store = MockDocumentStore::new();
        store.expect_query().returning(|_, _| {
            Ok(DocumentCursor::from_documents(vec![StoredDocument::new(
                "alice",
                json!({ "username": "alice" }),
            )]))
        });
        let manager = CredentialManager::new(Arc::new(store));

        let err = manager.register("alice", "x").await.expect_err("malformed");
        assert!(matches!(
            err,
            RegistrationError::Store(DocumentStoreError::QueryRejected { .. })
        ));
    }

    #[tokio::test]
    async fn register_writes_username_keyed_document() {
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .returning(|_, _| Ok(DocumentCursor::empty()));
        store
            .expect_upsert()
            .withf(|collection, id, body| {
                collection == USERS_COLLECTION
                    && id == "frank"
                    && body == &json!({ "username": "frank", "password": "pw" })
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let manager = CredentialManager::new(Arc::new(store));

        manager.register(" frank", "pw").await.expect("signup");
    }

    #[rstest]
    #[tokio::test]
    async fn port_maps_duplicates_to_conflict(manager: CredentialManager) {
        let port: &dyn UserRegistration = &manager;
        port.register("alice", "x").await.expect("signup");
        let err = port.register("alice", "y").await.expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn port_reports_blank_field_in_details(manager: CredentialManager) {
        let port: &dyn UserRegistration = &manager;
        let err = port.register("bob", "").await.expect_err("blank");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            err.details(),
            Some(&json!({ "field": "password", "code": "empty_password" }))
        );
    }
}
