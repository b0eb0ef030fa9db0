//! Port probing
//!
//! The leaf check behind the availability cache: can a listening socket be
//! bound here right now?

use std::net::{IpAddr, SocketAddr, TcpListener};

/// Capability to test whether a listening socket can be bound.
///
/// A trait rather than a free function so the cache can be driven by a
/// recording fake in tests.
pub trait Probe: Send + Sync {
    fn available(&self, host: IpAddr, port: u16) -> bool;
}

/// Production probe: bind a TCP listener and release it immediately.
///
/// Every failure collapses to `false` — address in use, permission denied,
/// and the unbindable port 0 all look the same to callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl Probe for TcpProbe {
    fn available(&self, host: IpAddr, port: u16) -> bool {
        if port == 0 {
            return false;
        }
        TcpListener::bind(SocketAddr::new(host, port)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn occupied_port_reports_unavailable() {
        let holder = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();
        assert!(!TcpProbe.available(Ipv4Addr::LOCALHOST.into(), port));
    }

    #[test]
    fn released_port_reports_available() {
        let port = {
            let holder = TcpListener::bind("127.0.0.1:0").unwrap();
            holder.local_addr().unwrap().port()
        };
        assert!(TcpProbe.available(Ipv4Addr::LOCALHOST.into(), port));
    }

    #[test]
    fn port_zero_is_never_available() {
        assert!(!TcpProbe.available(Ipv4Addr::LOCALHOST.into(), 0));
    }
}
