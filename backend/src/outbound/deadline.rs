//! Deadline decorator for document store adapters.
//!
//! Wraps any [`DocumentStore`] so that no operation, and no later page fetch
//! of a query cursor, outlives the configured deadline. An elapsed deadline surfaces as
//! [`DocumentStoreError::Unavailable`]; the inner future is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::domain::ports::{
    CollectionSchema, DocumentCursor, DocumentFilter, DocumentPages, DocumentStore,
    DocumentStoreError, StoredDocument,
};

/// Bounds every call on the wrapped store by a fixed deadline.
pub struct DeadlineDocumentStore {
    inner: Arc<dyn DocumentStore>,
    deadline: Duration,
}

impl DeadlineDocumentStore {
    /// Wrap `inner`, bounding each operation by `deadline`.
    pub fn new(inner: Arc<dyn DocumentStore>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

async fn within_deadline<T, F>(
    deadline: Duration,
    operation: &'static str,
    future: F,
) -> Result<T, DocumentStoreError>
where
    F: Future<Output = Result<T, DocumentStoreError>> + Send,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, deadline_ms, "document store deadline elapsed");
            Err(DocumentStoreError::unavailable(format!(
                "{operation} exceeded {deadline_ms} ms deadline"
            )))
        }
    }
}

/// Applies the same deadline to every page a cursor fetches after the first.
struct DeadlinePages {
    inner: Box<dyn DocumentPages>,
    deadline: Duration,
}

#[async_trait]
impl DocumentPages for DeadlinePages {
    async fn next_page(&mut self) -> Result<Option<Vec<StoredDocument>>, DocumentStoreError> {
        within_deadline(self.deadline, "query page", self.inner.next_page()).await
    }
}

#[async_trait]
impl DocumentStore for DeadlineDocumentStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> Result<(), DocumentStoreError> {
        within_deadline(
            self.deadline,
            "ensure_collection",
            self.inner.ensure_collection(collection, schema),
        )
        .await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), DocumentStoreError> {
        within_deadline(
            self.deadline,
            "upsert",
            self.inner.upsert(collection, id, document),
        )
        .await
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<DocumentCursor, DocumentStoreError> {
        let deadline = self.deadline;
        let cursor =
            within_deadline(deadline, "query", self.inner.query(collection, filter)).await?;
        Ok(cursor.map_pages(|inner| -> Box<dyn DocumentPages> {
            Box::new(DeadlinePages { inner, deadline })
        }))
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        within_deadline(self.deadline, "ping", self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::MockDocumentStore;
    use serde_json::json;

    struct SlowStore {
        delay: Duration,
    }

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn ensure_collection(
            &self,
            _collection: &str,
            _schema: &CollectionSchema,
        ) -> Result<(), DocumentStoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn upsert(
            &self,
            _collection: &str,
            _id: &str,
            _document: &Value,
        ) -> Result<(), DocumentStoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn query(
            &self,
            _collection: &str,
            _filter: &DocumentFilter,
        ) -> Result<DocumentCursor, DocumentStoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(DocumentCursor::empty())
        }

        async fn ping(&self) -> Result<(), DocumentStoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    fn slow(delay_ms: u64, deadline_ms: u64) -> DeadlineDocumentStore {
        DeadlineDocumentStore::new(
            Arc::new(SlowStore {
                delay: Duration::from_millis(delay_ms),
            }),
            Duration::from_millis(deadline_ms),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_unavailable() {
        let store = slow(5_000, 250);
        let err = store
            .upsert("posts", "p", &json!({}))
            .await
            .expect_err("deadline");
        assert_eq!(
            err,
            DocumentStoreError::unavailable("upsert exceeded 250 ms deadline")
        );
        assert!(matches!(
            store
                .query("posts", &DocumentFilter::term("user", "dave"))
                .await,
            Err(DocumentStoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store
                .ensure_collection("posts", &CollectionSchema::new())
                .await,
            Err(DocumentStoreError::Unavailable { .. })
        ));
        assert_eq!(
            store.ping().await,
            Err(DocumentStoreError::unavailable("ping exceeded 250 ms deadline"))
        );
    }

    struct SlowPages {
        delay: Duration,
    }

    #[async_trait]
    impl DocumentPages for SlowPages {
        async fn next_page(
            &mut self,
        ) -> Result<Option<Vec<StoredDocument>>, DocumentStoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(Some(vec![StoredDocument::new("late", json!({}))]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn later_pages_share_the_deadline() {
        let mut inner = MockDocumentStore::new();
        inner.expect_query().returning(|_, _| {
            Ok(DocumentCursor::paged(
                vec![StoredDocument::new("first", json!({}))],
                Box::new(SlowPages {
                    delay: Duration::from_secs(10),
                }),
            ))
        });
        let store = DeadlineDocumentStore::new(Arc::new(inner), Duration::from_millis(250));
        let mut cursor = store
            .query("posts", &DocumentFilter::term("user", "dave"))
            .await
            .expect("first page within deadline");

        assert!(cursor.next_document().await.expect("first").is_some());
        let err = cursor.next_document().await.expect_err("second page is too slow");
        assert_eq!(
            err,
            DocumentStoreError::unavailable("query page exceeded 250 ms deadline")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn operations_within_deadline_pass_through() {
        let store = slow(10, 1_000);
        store
            .upsert("posts", "p", &json!({}))
            .await
            .expect("within deadline");
    }

    #[tokio::test]
    async fn inner_errors_are_preserved() {
        let mut inner = MockDocumentStore::new();
        inner
            .expect_upsert()
            .returning(|collection, _, _| {
                Err(DocumentStoreError::write_rejected(collection, "mapping"))
            });
        let store = DeadlineDocumentStore::new(Arc::new(inner), Duration::from_secs(1));
        let err = store
            .upsert("posts", "p", &json!({}))
            .await
            .expect_err("rejected");
        assert_eq!(err, DocumentStoreError::write_rejected("posts", "mapping"));
    }
}
