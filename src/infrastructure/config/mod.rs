mod settings;

pub use settings::{
    ApiConfig, DesktopConfig, OtelConfig, PubSubConfig, ReconnectConfig, Settings, StreamConfig,
};
