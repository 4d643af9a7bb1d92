//! Shared mapping from document store failures to domain errors.

use tracing::{error, warn};

use crate::domain::Error;
use crate::domain::ports::DocumentStoreError;

pub(crate) fn map_store_error(error: DocumentStoreError) -> Error {
    match error {
        DocumentStoreError::Unavailable { message } => {
            warn!(%message, "document store unavailable");
            Error::service_unavailable("document store unavailable; retry later")
        }
        other => {
            error!(error = %other, "document store contract violation");
            Error::internal(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(DocumentStoreError::unavailable("timeout"), ErrorCode::ServiceUnavailable)]
    #[case(DocumentStoreError::schema_conflict("posts", "x"), ErrorCode::InternalError)]
    #[case(DocumentStoreError::write_rejected("posts", "x"), ErrorCode::InternalError)]
    #[case(DocumentStoreError::query_rejected("users", "x"), ErrorCode::InternalError)]
    fn maps_taxonomy_to_codes(#[case] error: DocumentStoreError, #[case] expected: ErrorCode) {
        assert_eq!(map_store_error(error).code(), expected);
    }
}
