//! Server configuration
//!
//! The resolved `ServerConfig` value type and the on-disk settings store.

pub mod settings;
pub mod store;

pub use settings::{ServerConfig, TextEncoding};
pub use store::SettingsStore;
