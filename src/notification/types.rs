use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single notification as delivered by the API and the push transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationItem {
    /// Unique handle used by every per-item endpoint
    pub token: String,
    /// Short headline
    pub title: String,
    /// Body text
    #[serde(default)]
    pub message: String,
    /// Event discriminator (e.g. "invitation.created", "scan.finished")
    pub event: String,
    /// Opaque event payload
    #[serde(default)]
    pub event_data: serde_json::Value,
    /// Type of the object this notification refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Identifier of the referenced object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// When the notification was created
    pub created: DateTime<Utc>,
    /// Whether the user has read this notification
    #[serde(default)]
    pub read: bool,
    /// Whether the notification is no longer actionable
    #[serde(default)]
    pub expired: bool,
}

impl NotificationItem {
    /// Create a builder for a new notification
    pub fn builder(event: impl Into<String>, title: impl Into<String>) -> NotificationBuilder {
        NotificationBuilder::new(event, title)
    }

    /// Whether the notification still counts against the unread badge
    pub fn is_unread(&self) -> bool {
        !self.read
    }
}

/// Aggregate counters reported alongside every page fetch
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationExtra {
    /// Number of unread notifications
    #[serde(default)]
    pub unread_count: u64,
    /// Total number of notifications
    #[serde(default)]
    pub count: u64,
}

/// Paginated list envelope returned by the list endpoint.
///
/// The counters arrive flattened next to the data array:
/// `{"data": [...], "unread_count": 2, "count": 10}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub data: Vec<NotificationItem>,
    #[serde(flatten)]
    pub extra: NotificationExtra,
}

/// How a fetched page is merged into the local list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMerge {
    /// Swap the whole list (initial fetch, refresh)
    Replace,
    /// Append after the current tail (load more)
    Append,
}

/// Response to an invitation notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationAction {
    Accept,
    Decline,
}

impl InvitationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationAction::Accept => "accept",
            InvitationAction::Decline => "decline",
        }
    }
}

/// Builder for creating notification items
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    token: Option<String>,
    title: String,
    message: String,
    event: String,
    event_data: serde_json::Value,
    object_type: Option<String>,
    object_id: Option<String>,
    read: bool,
    expired: bool,
}

impl NotificationBuilder {
    /// Create a new notification builder
    pub fn new(event: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            token: None,
            title: title.into(),
            message: String::new(),
            event: event.into(),
            event_data: serde_json::Value::Null,
            object_type: None,
            object_id: None,
            read: false,
            expired: false,
        }
    }

    /// Set an explicit token (a random one is generated otherwise)
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the body text
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the event payload
    pub fn event_data(mut self, data: serde_json::Value) -> Self {
        self.event_data = data;
        self
    }

    /// Set the referenced object
    pub fn object(mut self, object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self.object_id = Some(object_id.into());
        self
    }

    /// Mark the notification as already read
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Mark the notification as expired
    pub fn expired(mut self, expired: bool) -> Self {
        self.expired = expired;
        self
    }

    /// Build the notification item
    pub fn build(self) -> NotificationItem {
        NotificationItem {
            token: self
                .token
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: self.title,
            message: self.message,
            event: self.event,
            event_data: self.event_data,
            object_type: self.object_type,
            object_id: self.object_id,
            created: Utc::now(),
            read: self.read,
            expired: self.expired,
        }
    }
}
