//! Server lifecycle core
//!
//! Validation, port reservation, connection counting, and supervision of
//! one engine instance.

pub mod counter;
pub mod hooks;
pub mod manager;
pub mod port_cache;
pub mod probe;
pub mod state;
pub mod validators;

pub use counter::ConnectionCounter;
pub use manager::ServerManager;
pub use port_cache::PortCache;
pub use state::ServerState;
