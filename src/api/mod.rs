//! REST access to the notification API.

mod client;

pub use client::ApiClient;
