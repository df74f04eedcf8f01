// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules for backward compatibility
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;

// Domain layer (business logic)
pub mod connection;
pub mod notification;
pub mod transport;

// Application layer
pub mod api;
pub mod client;
pub mod desktop;

// Supporting modules
pub mod telemetry;
