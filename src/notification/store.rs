//! Local notification state.
//!
//! The store owns the ordered notification list (newest first) and the
//! `{unread_count, count}` aggregates. Push events and REST mutations all
//! funnel through here; desktop side effects run after the state is
//! committed and never affect it.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::desktop::DesktopBridge;
use crate::infrastructure::metrics::{DesktopMetrics, StoreMetrics};

use super::types::{NotificationExtra, NotificationItem, NotificationPage, PageMerge};

/// Point-in-time copy of the store contents
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub items: Vec<NotificationItem>,
    pub extra: NotificationExtra,
}

struct StoreState {
    items: Vec<NotificationItem>,
    extra: NotificationExtra,
}

/// Ordered notification list plus unread/total counters.
///
/// All mutations serialize through one `RwLock`; a `watch` channel carries a
/// revision number that bumps on every change so callers can react without
/// polling.
pub struct NotificationStore {
    state: RwLock<StoreState>,
    revision: watch::Sender<u64>,
    bridge: Arc<dyn DesktopBridge>,
}

impl NotificationStore {
    /// Create an empty store wired to a desktop bridge
    pub fn new(bridge: Arc<dyn DesktopBridge>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(StoreState {
                items: Vec::new(),
                extra: NotificationExtra::default(),
            }),
            revision,
            bridge,
        }
    }

    /// Subscribe to revision bumps
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Merge a pushed notification: prepend and count it as new.
    ///
    /// Push merges are optimistic and never rolled back, even if the item
    /// later turns out to overlap with a fetched page.
    pub async fn apply_push(&self, item: NotificationItem) {
        let (items_len, unread) = {
            let mut state = self.state.write().await;
            state.items.insert(0, item.clone());
            state.extra.unread_count += 1;
            state.extra.count += 1;
            (state.items.len(), state.extra.unread_count)
        };

        StoreMetrics::set_sizes(items_len, unread);
        self.bump();

        tracing::debug!(
            token = %item.token,
            event = %item.event,
            unread = unread,
            "Notification pushed"
        );

        // Desktop side effects run outside the lock and are best-effort
        match self.bridge.notify(&item).await {
            Ok(()) => DesktopMetrics::record_notified(),
            Err(e) => {
                DesktopMetrics::record_failure();
                tracing::warn!(error = %e, token = %item.token, "Desktop notification failed");
            }
        }
        self.update_badge(unread).await;
    }

    /// Mark one notification read.
    ///
    /// Marking read also expires the item; the unread counter decrements with
    /// a floor of zero. Returns `true` only when the item was newly marked,
    /// so calling twice with the same token is safe.
    pub async fn mark_read(&self, token: &str) -> bool {
        let marked = {
            let mut state = self.state.write().await;
            match state.items.iter_mut().find(|i| i.token == token) {
                Some(item) if !item.read => {
                    item.read = true;
                    item.expired = true;
                    state.extra.unread_count = state.extra.unread_count.saturating_sub(1);
                    Some((state.items.len(), state.extra.unread_count))
                }
                Some(_) => {
                    tracing::debug!(token = %token, "Notification already read");
                    None
                }
                None => {
                    tracing::debug!(token = %token, "Notification not in local list");
                    None
                }
            }
        };

        match marked {
            Some((items_len, unread)) => {
                StoreMetrics::set_sizes(items_len, unread);
                StoreMetrics::record_marked_read();
                self.bump();
                self.update_badge(unread).await;
                true
            }
            None => false,
        }
    }

    /// Mark every notification read and zero the unread counter.
    ///
    /// The total count and the expired flags stay untouched.
    pub async fn mark_all_read(&self) {
        let items_len = {
            let mut state = self.state.write().await;
            for item in state.items.iter_mut() {
                item.read = true;
            }
            state.extra.unread_count = 0;
            state.items.len()
        };

        StoreMetrics::set_sizes(items_len, 0);
        self.bump();
        self.update_badge(0).await;

        tracing::debug!(items = items_len, "All notifications marked read");
    }

    /// Expire one notification without touching its read state or the counters
    pub async fn mark_expired(&self, token: &str) -> bool {
        let changed = {
            let mut state = self.state.write().await;
            match state.items.iter_mut().find(|i| i.token == token) {
                Some(item) if !item.expired => {
                    item.expired = true;
                    true
                }
                _ => false,
            }
        };

        if changed {
            self.bump();
        }
        changed
    }

    /// Merge a fetched page into the list and take the server's counters.
    ///
    /// `Append` does not de-duplicate against previously pushed items; an
    /// overlapping token appears twice until the next `Replace`.
    pub async fn apply_page(&self, page: NotificationPage, merge: PageMerge) {
        let (items_len, unread) = {
            let mut state = self.state.write().await;
            match merge {
                PageMerge::Replace => state.items = page.data,
                PageMerge::Append => state.items.extend(page.data),
            }
            state.extra = page.extra;
            (state.items.len(), state.extra.unread_count)
        };

        match merge {
            PageMerge::Replace => StoreMetrics::record_replace_merge(),
            PageMerge::Append => StoreMetrics::record_append_merge(),
        }
        StoreMetrics::set_sizes(items_len, unread);
        self.bump();
        self.update_badge(unread).await;

        tracing::debug!(items = items_len, unread = unread, merge = ?merge, "Page merged");
    }

    /// Copy of the current list and counters
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            items: state.items.clone(),
            extra: state.extra,
        }
    }

    /// Current unread counter
    pub async fn unread_count(&self) -> u64 {
        self.state.read().await.extra.unread_count
    }

    /// Number of notifications currently held
    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// Whether the list is empty
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    async fn update_badge(&self, unread: u64) {
        if let Err(e) = self.bridge.set_badge(unread).await {
            DesktopMetrics::record_failure();
            tracing::warn!(error = %e, unread = unread, "Badge update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::{BridgeError, NoopBridge};
    use crate::notification::types::NotificationBuilder;
    use async_trait::async_trait;

    fn create_store() -> NotificationStore {
        NotificationStore::new(Arc::new(NoopBridge))
    }

    fn create_test_item(token: &str) -> NotificationItem {
        NotificationBuilder::new("test.event", "Test notification")
            .token(token)
            .message("body")
            .build()
    }

    fn page(items: Vec<NotificationItem>, unread: u64, count: u64) -> NotificationPage {
        NotificationPage {
            data: items,
            extra: NotificationExtra {
                unread_count: unread,
                count,
            },
        }
    }

    /// Bridge that always fails, for verifying best-effort semantics
    struct FailingBridge;

    #[async_trait]
    impl DesktopBridge for FailingBridge {
        async fn notify(&self, _item: &NotificationItem) -> Result<(), BridgeError> {
            Err(BridgeError::Unavailable("no display".to_string()))
        }

        async fn set_badge(&self, _unread: u64) -> Result<(), BridgeError> {
            Err(BridgeError::Unavailable("no display".to_string()))
        }
    }

    #[tokio::test]
    async fn test_push_prepends_newest_first() {
        let store = create_store();

        store.apply_push(create_test_item("first")).await;
        store.apply_push(create_test_item("second")).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.items[0].token, "second");
        assert_eq!(snapshot.items[1].token, "first");
        assert_eq!(snapshot.extra.unread_count, 2);
        assert_eq!(snapshot.extra.count, 2);
    }

    #[tokio::test]
    async fn test_mark_read_sets_read_and_expired() {
        let store = create_store();
        store.apply_push(create_test_item("a")).await;

        assert!(store.mark_read("a").await);

        let snapshot = store.snapshot().await;
        assert!(snapshot.items[0].read);
        assert!(snapshot.items[0].expired);
        assert_eq!(snapshot.extra.unread_count, 0);
        assert_eq!(snapshot.extra.count, 1);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = create_store();
        store.apply_push(create_test_item("a")).await;
        store.apply_push(create_test_item("b")).await;

        assert!(store.mark_read("a").await);
        assert!(!store.mark_read("a").await);
        assert!(!store.mark_read("a").await);

        // Only one decrement despite three calls
        assert_eq!(store.unread_count().await, 1);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_token_changes_nothing() {
        let store = create_store();
        store.apply_push(create_test_item("a")).await;

        assert!(!store.mark_read("missing").await);
        assert_eq!(store.unread_count().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unread_count_matches_push_mark_ledger() {
        let store = create_store();
        let n = 7;
        let m = 4;

        for i in 0..n {
            store.apply_push(create_test_item(&format!("tok-{}", i))).await;
        }
        for i in 0..m {
            store.mark_read(&format!("tok-{}", i)).await;
        }

        assert_eq!(store.unread_count().await, (n - m) as u64);
        assert_eq!(store.snapshot().await.extra.count, n as u64);
    }

    #[tokio::test]
    async fn test_unread_count_never_negative() {
        let store = create_store();

        // Server says one unread but the list disagrees; mark both anyway
        store
            .apply_page(
                page(vec![create_test_item("a"), create_test_item("b")], 1, 2),
                PageMerge::Replace,
            )
            .await;

        store.mark_read("a").await;
        store.mark_read("b").await;

        assert_eq!(store.unread_count().await, 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_zeroes_unread_keeps_count() {
        let store = create_store();
        for i in 0..5 {
            store.apply_push(create_test_item(&format!("tok-{}", i))).await;
        }

        store.mark_all_read().await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.extra.unread_count, 0);
        assert_eq!(snapshot.extra.count, 5);
        assert!(snapshot.items.iter().all(|i| i.read));
        // mark-all does not expire items
        assert!(snapshot.items.iter().all(|i| !i.expired));
    }

    #[tokio::test]
    async fn test_mark_all_read_on_empty_store() {
        let store = create_store();
        store.mark_all_read().await;
        assert_eq!(store.unread_count().await, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_mark_expired_keeps_read_state_and_counters() {
        let store = create_store();
        store.apply_push(create_test_item("a")).await;

        assert!(store.mark_expired("a").await);
        assert!(!store.mark_expired("a").await);

        let snapshot = store.snapshot().await;
        assert!(snapshot.items[0].expired);
        assert!(!snapshot.items[0].read);
        assert_eq!(snapshot.extra.unread_count, 1);
    }

    #[tokio::test]
    async fn test_apply_page_replace_swaps_list() {
        let store = create_store();
        store.apply_push(create_test_item("pushed")).await;

        store
            .apply_page(
                page(vec![create_test_item("x"), create_test_item("y")], 1, 2),
                PageMerge::Replace,
            )
            .await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[0].token, "x");
        assert_eq!(snapshot.extra.unread_count, 1);
        assert_eq!(snapshot.extra.count, 2);
    }

    #[tokio::test]
    async fn test_apply_page_append_keeps_duplicates() {
        let store = create_store();
        store.apply_push(create_test_item("dup")).await;

        store
            .apply_page(
                page(vec![create_test_item("dup"), create_test_item("old")], 0, 2),
                PageMerge::Append,
            )
            .await;

        let snapshot = store.snapshot().await;
        // Appended pages are not de-duplicated against pushed items
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(
            snapshot
                .items
                .iter()
                .filter(|i| i.token == "dup")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_apply_page_takes_server_counters() {
        let store = create_store();
        store.apply_push(create_test_item("a")).await;
        assert_eq!(store.unread_count().await, 1);

        store.apply_page(page(vec![], 9, 40), PageMerge::Replace).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.extra.unread_count, 9);
        assert_eq!(snapshot.extra.count, 40);
    }

    #[tokio::test]
    async fn test_revision_bumps_on_mutation() {
        let store = create_store();
        let mut rx = store.subscribe();
        let initial = *rx.borrow_and_update();

        store.apply_push(create_test_item("a")).await;
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update() > initial);

        store.mark_read("a").await;
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_bridge_failures_never_block_state() {
        let store = NotificationStore::new(Arc::new(FailingBridge));

        store.apply_push(create_test_item("a")).await;
        store.mark_read("a").await;
        store.mark_all_read().await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert!(snapshot.items[0].read);
        assert_eq!(snapshot.extra.unread_count, 0);
    }
}
