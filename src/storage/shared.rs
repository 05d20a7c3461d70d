use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::{ErrorKind, SubmitError};
use super::store::ShortLinkStore;
use crate::clicks::ClickRecorder;
use crate::models::{LinkEntryRequest, LinkId, LinkRef, LinkState, ShortLink};

/// Cloneable handle to one store instance.
///
/// Every operation takes the same lock, so a uniqueness check and the insert
/// that follows it can never interleave with another submission or visit.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<ShortLinkStore>>,
    recorder: Arc<ClickRecorder>,
}

impl SharedStore {
    pub fn new(store: ShortLinkStore, recorder: ClickRecorder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            recorder: Arc::new(recorder),
        }
    }

    pub async fn submit(
        &self,
        requests: Vec<LinkEntryRequest>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ShortLink>, SubmitError> {
        let received = requests.len();
        let result = self.inner.lock().await.submit(requests, now);

        match &result {
            Ok(links) => {
                for link in links {
                    info!(
                        link_id = %link.id(),
                        shortcode = %link.shortcode(),
                        expires_at = %link.expires_at(),
                        "link created"
                    );
                }
            }
            Err(SubmitError::Rejected(rejection)) => {
                warn!(
                    received,
                    failed = rejection.errors.len(),
                    not_applied = rejection.not_applied.len(),
                    "batch rejected"
                );
            }
            Err(err) => warn!(received, error = %err, "batch rejected"),
        }

        result
    }

    /// Links filtered by expiry state at `now`, or every link when no state is given
    pub async fn list(&self, state: Option<LinkState>, now: DateTime<Utc>) -> Vec<ShortLink> {
        let store = self.inner.lock().await;
        match state {
            Some(LinkState::Active) => store.list_active(now),
            Some(LinkState::Expired) => store.list_expired(now),
            None => store.list_all(),
        }
    }

    pub async fn get(&self, id: LinkId) -> Option<ShortLink> {
        self.inner.lock().await.get(id).cloned()
    }

    pub async fn delete(&self, id: LinkId) -> bool {
        let deleted = self.inner.lock().await.delete(id);
        if deleted {
            info!(link_id = %id, "link deleted");
        }
        deleted
    }

    pub async fn visit(
        &self,
        link: &LinkRef,
        now: DateTime<Utc>,
        client_signature: &str,
        source_label: &str,
    ) -> Result<String, ErrorKind> {
        let mut store = self.inner.lock().await;
        self.recorder
            .visit(&mut store, link, now, client_signature, source_label)
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(ShortLinkStore::default(), ClickRecorder::default())
    }
}
