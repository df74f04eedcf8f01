//! High-level notification client.
//!
//! Owns the store, the REST client, and the connection supervisor. REST
//! mutations talk to the server first and only touch local state once the
//! server acknowledged, so a failed request never desyncs the list.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::api::ApiClient;
use crate::connection::{ConnectionPhase, ConnectionSupervisor};
use crate::desktop::create_desktop_bridge;
use crate::infrastructure::config::Settings;
use crate::infrastructure::error::Result;
use crate::notification::{
    InvitationAction, NotificationItem, NotificationStore, PageMerge, StoreSnapshot,
};

const PUSH_BUFFER: usize = 64;

/// Client facade over the store, REST API, and push delivery
pub struct NotificationClient {
    api: ApiClient,
    store: Arc<NotificationStore>,
    supervisor: ConnectionSupervisor,
    pushes: broadcast::Sender<NotificationItem>,
    /// Next list page to fetch
    cursor: Mutex<u32>,
}

impl NotificationClient {
    /// Build the client and spawn its supervisor. Push delivery stays off
    /// until `connect` is called.
    pub fn new(settings: Settings) -> Result<Self> {
        let bridge = create_desktop_bridge(&settings.desktop);
        let store = Arc::new(NotificationStore::new(bridge));
        let api = ApiClient::new(&settings.api)?;
        let (pushes, _) = broadcast::channel(PUSH_BUFFER);
        let supervisor = ConnectionSupervisor::spawn(&settings, store.clone(), pushes.clone())?;

        Ok(Self {
            api,
            store,
            supervisor,
            pushes,
            cursor: Mutex::new(1),
        })
    }

    /// Reload the first page, replacing local state.
    pub async fn refresh(&self) -> Result<StoreSnapshot> {
        let page = self.api.fetch_page(1).await?;
        self.store.apply_page(page, PageMerge::Replace).await;
        *self.cursor.lock().await = 2;
        Ok(self.store.snapshot().await)
    }

    /// Fetch the next page and append it, returning how many items arrived.
    ///
    /// The cursor lock is held across the fetch so concurrent callers load
    /// successive pages instead of the same one.
    pub async fn load_more(&self) -> Result<usize> {
        let mut cursor = self.cursor.lock().await;
        let page_no = *cursor;
        let page = self.api.fetch_page(page_no).await?;
        let added = page.data.len();
        self.store.apply_page(page, PageMerge::Append).await;
        *cursor = page_no + 1;

        tracing::debug!(page = page_no, added, "Loaded notification page");
        Ok(added)
    }

    /// Mark one notification read, server first.
    ///
    /// Returns whether local state changed; marking an already-read or
    /// unknown token is a no-op.
    pub async fn mark_read(&self, token: &str) -> Result<bool> {
        self.api.mark_read(token).await?;
        Ok(self.store.mark_read(token).await)
    }

    /// Mark every notification read, server first.
    pub async fn mark_all_read(&self) -> Result<()> {
        self.api.mark_all_read().await?;
        self.store.mark_all_read().await;
        Ok(())
    }

    /// Accept or decline an invitation. On success the local copy is
    /// retired as read and expired.
    pub async fn respond(&self, token: &str, action: InvitationAction) -> Result<()> {
        self.api.respond(token, action).await?;
        self.store.mark_read(token).await;
        Ok(())
    }

    /// Expire a notification without marking it read.
    pub async fn expire(&self, token: &str) -> Result<()> {
        self.api.expire(token).await?;
        self.store.mark_expired(token).await;
        Ok(())
    }

    /// Start push delivery.
    pub async fn connect(&self) -> Result<()> {
        self.supervisor.activate().await
    }

    /// Stop push delivery, keeping local state.
    pub async fn disconnect(&self) -> Result<()> {
        self.supervisor.deactivate().await
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.supervisor.phase()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.supervisor.watch_phase()
    }

    /// Live pushes from whichever transport is active
    pub fn subscribe_pushes(&self) -> broadcast::Receiver<NotificationItem> {
        self.pushes.subscribe()
    }

    /// `subscribe_pushes` as a stream; lagged receivers skip ahead.
    pub fn push_stream(&self) -> impl Stream<Item = NotificationItem> {
        BroadcastStream::new(self.pushes.subscribe()).filter_map(|result| result.ok())
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot().await
    }

    pub async fn unread_count(&self) -> u64 {
        self.store.unread_count().await
    }

    /// Revision channel that ticks on every store change
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    pub fn store(&self) -> Arc<NotificationStore> {
        self.store.clone()
    }

    /// Stop delivery and wait for the supervisor to finish.
    pub async fn shutdown(self) {
        self.supervisor.shutdown().await;
    }
}
