//! Notification model and local state.
//!
//! `types` defines the wire shapes shared by the REST client and the push
//! transports; `store` holds the ordered list and counters the rest of the
//! crate reads from.

mod store;
mod types;

pub use store::{NotificationStore, StoreSnapshot};
pub use types::{
    InvitationAction, NotificationBuilder, NotificationExtra, NotificationItem, NotificationPage,
    PageMerge,
};
