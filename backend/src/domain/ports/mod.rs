//! Domain ports and supporting types for the hexagonal boundary.
//!
//! - Driven: [`DocumentStore`], implemented by outbound adapters.
//! - Driving: [`LoginService`], [`SessionAuthenticator`],
//!   [`UserRegistration`], [`PostCommand`], [`PostQuery`], called by inbound
//!   adapters and implemented by domain services.

mod document_store;
mod login_service;
mod post_command;
mod user_registration;

#[cfg(test)]
pub use document_store::MockDocumentStore;
pub use document_store::{
    CollectionSchema, DocumentCursor, DocumentFilter, DocumentPages, DocumentStore,
    DocumentStoreError, FieldType, StoredDocument,
};
#[cfg(test)]
pub use login_service::{MockLoginService, MockSessionAuthenticator};
pub use login_service::{LoginService, SessionAuthenticator};
#[cfg(test)]
pub use post_command::{MockPostCommand, MockPostQuery};
pub use post_command::{PostCommand, PostQuery};
#[cfg(test)]
pub use user_registration::MockUserRegistration;
pub use user_registration::UserRegistration;
