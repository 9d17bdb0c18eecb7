//! In-memory metadata client for unit tests.

use super::client::{
    MetadataClient, MetadataClientError, INSTANCE_ID_PATH, NUMERIC_PROJECT_ID_PATH,
    PROJECT_ID_PATH, REGION_PATH, SERVICE_ACCOUNT_EMAIL_PATH,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Canned behaviour for one path.
#[derive(Clone)]
pub(crate) enum Reply {
    Value(String),
    Fail(MetadataClientError),
    /// Never completes; only cancellation ends the request.
    Stall,
    /// Waits on the barrier, then fails.
    FailAfter(Arc<Barrier>, MetadataClientError),
}

/// Mock client recording how often each path was requested.
#[derive(Default)]
pub(crate) struct MockMetadataClient {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockMetadataClient {
    /// Every endpoint answers with a plausible value.
    pub(crate) fn healthy() -> Self {
        Self::default()
            .reply(PROJECT_ID_PATH, Reply::Value("my-project".into()))
            .reply(NUMERIC_PROJECT_ID_PATH, Reply::Value("123456789".into()))
            .reply(
                REGION_PATH,
                Reply::Value("projects/123456789/regions/us-central1".into()),
            )
            .reply(INSTANCE_ID_PATH, Reply::Value("instance-0001".into()))
            .reply(
                SERVICE_ACCOUNT_EMAIL_PATH,
                Reply::Value("svc@my-project.iam.gserviceaccount.com".into()),
            )
    }

    pub(crate) fn reply(mut self, path: &'static str, reply: Reply) -> Self {
        self.replies.insert(path, reply);
        self
    }

    pub(crate) fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl MetadataClient for MockMetadataClient {
    async fn get(&self, path: &str) -> Result<String, MetadataClientError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;

        match self.replies.get(path).cloned() {
            Some(Reply::Value(v)) => Ok(v),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Stall) => std::future::pending().await,
            Some(Reply::FailAfter(barrier, e)) => {
                barrier.wait().await;
                Err(e)
            }
            None => Err(MetadataClientError::NotDefined(path.to_string())),
        }
    }
}
