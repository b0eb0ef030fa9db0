//! Session hooks
//!
//! The lifecycle manager's `EngineEvents` implementation: forwards
//! connect/disconnect to the connection counter and mirrors every callback
//! into the log stream. Nothing else is mutated from engine threads.

use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use crate::engine::{EngineEvents, TransferDirection};
use crate::server::counter::ConnectionCounter;

pub struct SessionHooks {
    counter: Arc<ConnectionCounter>,
}

impl SessionHooks {
    pub fn new(counter: Arc<ConnectionCounter>) -> Self {
        Self { counter }
    }
}

impl EngineEvents for SessionHooks {
    fn on_connect(&self, remote: SocketAddr) {
        info!("new connection from {}", remote);
        self.counter.increment();
    }

    fn on_disconnect(&self, remote: SocketAddr) {
        info!("connection closed: {}", remote);
        self.counter.decrement();
    }

    fn on_login(&self, user: &str, remote: SocketAddr) {
        info!("user logged in: {}@{}", user, remote.ip());
    }

    fn on_file_sent(&self, path: &Path, bytes: u64) {
        info!("file sent: {} ({} bytes)", path.display(), bytes);
    }

    fn on_file_received(&self, path: &Path) {
        info!("file received: {}", path.display());
    }

    fn on_incomplete_transfer(&self, path: &Path, direction: TransferDirection) {
        warn!("incomplete {} transfer: {}", direction, path.display());
    }

    fn on_error(&self, err: &io::Error) {
        error!("engine error: {}", err);
    }
}
