//! Feedback moderation.

use std::sync::Arc;

use marketplace_core::models::{Feedback, FeedbackUpdate, Page};
use marketplace_core::{FeedbackId, FeedbackStatus};
use tracing::instrument;

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryFamily, QueryKey};
use crate::error::Result;
use crate::notify::Notifier;
use crate::service::Backend;

const FEEDBACK_LIST_KEYS: &[&str] = &["data", "feedback", "feedbacks"];

/// Admin view of customer feedback.
#[derive(Clone)]
pub struct FeedbackService {
    backend: Backend,
}

impl std::fmt::Debug for FeedbackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackService").finish_non_exhaustive()
    }
}

impl FeedbackService {
    #[must_use]
    pub fn new(api: ApiClient, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend: Backend::new(api, cache, notifier),
        }
    }

    /// One page of feedback entries.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32) -> Result<Page<Feedback>> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::Feedback { page },
                |value| match value {
                    CacheValue::Feedback(page) => Some(page),
                    _ => None,
                },
                CacheValue::Feedback,
                async {
                    api.get_query("/feedback", &[("page", page.max(1).to_string())])
                        .await?
                        .page(FEEDBACK_LIST_KEYS, page)
                },
            )
            .await
    }

    /// Approve or reject an entry.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &FeedbackId, status: FeedbackStatus) -> Result<()> {
        let result = self
            .backend
            .api
            .patch(&format!("/feedback/{id}"), &FeedbackUpdate { status })
            .await
            .map(|_| ());
        self.backend.settle(
            result,
            QueryFamily::Feedback,
            "Feedback updated",
            "Cannot update feedback",
        )
    }

    /// Delete an entry.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &FeedbackId) -> Result<()> {
        let result = self
            .backend
            .api
            .delete(&format!("/feedback/{id}"))
            .await
            .map(|_| ());
        self.backend.settle(
            result,
            QueryFamily::Feedback,
            "Feedback deleted",
            "Cannot delete feedback",
        )
    }
}
