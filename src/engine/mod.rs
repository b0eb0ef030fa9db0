//! External FTP engine contract
//!
//! The lifecycle core does not speak FTP. It constructs, supervises, and
//! stops an engine through this interface, and receives session events back
//! through `EngineEvents`. `acceptor` provides a protocol-less engine used
//! by the binary and the integration tests.

pub mod acceptor;

pub use acceptor::TcpAcceptor;

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::TextEncoding;

/// Anonymous-access permission bitmask, mirroring the classic
/// e/l/r/a/d/f/m/w permission letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(u8);

impl Permissions {
    pub const CHANGE_DIR: Permissions = Permissions(1 << 0); // e
    pub const LIST: Permissions = Permissions(1 << 1); // l
    pub const READ: Permissions = Permissions(1 << 2); // r
    pub const APPEND: Permissions = Permissions(1 << 3); // a
    pub const DELETE: Permissions = Permissions(1 << 4); // d
    pub const RENAME: Permissions = Permissions(1 << 5); // f
    pub const MKDIR: Permissions = Permissions(1 << 6); // m
    pub const WRITE: Permissions = Permissions(1 << 7); // w

    pub const fn empty() -> Self {
        Permissions(0)
    }

    pub const fn all() -> Self {
        Permissions(0xff)
    }

    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

/// Direction of a transfer that did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Inbound,
    Outbound,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Inbound => write!(f, "inbound"),
            TransferDirection::Outbound => write!(f, "outbound"),
        }
    }
}

/// Everything the engine needs at bind time.
#[derive(Clone)]
pub struct HandlerConfig {
    pub root: PathBuf,
    pub anonymous_permissions: Permissions,
    pub encoding: TextEncoding,
    pub passive_ports: Option<RangeInclusive<u16>>,
    pub connection_timeout: Duration,
    pub data_timeout: Duration,
    pub max_connections: usize,
    pub max_connections_per_addr: usize,
    pub banner: String,
    /// One worker per connection when set; one serialized event loop
    /// otherwise.
    pub threaded: bool,
    pub events: Arc<dyn EngineEvents>,
}

/// Session callbacks the engine raises from its connection contexts.
///
/// Implementations must be cheap and thread-safe; connection tasks invoke
/// them directly.
pub trait EngineEvents: Send + Sync {
    fn on_connect(&self, remote: SocketAddr);
    fn on_disconnect(&self, remote: SocketAddr);
    fn on_login(&self, user: &str, remote: SocketAddr);
    fn on_file_sent(&self, path: &Path, bytes: u64);
    fn on_file_received(&self, path: &Path);
    fn on_incomplete_transfer(&self, path: &Path, direction: TransferDirection);
    fn on_error(&self, err: &io::Error);
}

/// An FTP engine the lifecycle manager can construct and supervise.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Binds the control listener and returns a handle for the serve loop.
    async fn bind(
        &self,
        host: IpAddr,
        port: u16,
        config: HandlerConfig,
    ) -> io::Result<Box<dyn EngineHandle>>;
}

/// One bound engine instance, driven by the supervisory task.
#[async_trait]
pub trait EngineHandle: Send {
    /// Runs one accept/dispatch iteration, waiting at most `timeout`.
    async fn serve_once(&mut self, timeout: Duration) -> io::Result<()>;

    /// Closes the listener and every active connection.
    async fn close_all(&mut self);
}
