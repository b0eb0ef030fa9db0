//! Lifecycle and port-reservation core for an FTP service.
//!
//! Validates a requested configuration, reserves the control port and
//! passive data-port range, supervises an FTP engine inside a cancellable
//! background task, and tracks live connection counts. The wire protocol
//! itself is supplied by an [`engine::Engine`] implementation; a
//! protocol-less acceptor is built in for wiring and tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod server;

pub use config::{ServerConfig, SettingsStore, TextEncoding};
pub use server::ServerManager;
