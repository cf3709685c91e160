//! Configuration Module
//!
//! Configuration loading for the dashboard service.

mod settings;

pub use settings::{
    ConfigError, Credentials, DashboardConfig, DisplaySettings, IngestionSettings,
    ServerSettings, StoreSettings, parse_symbols,
};
