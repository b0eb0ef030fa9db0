//! Plain TCP acceptor engine
//!
//! A protocol-less `Engine` used where no real FTP engine is linked in: it
//! binds the control listener, enforces the connection limits from
//! `HandlerConfig`, writes the banner, and holds each session open until
//! the peer closes. Session events fire exactly as a protocol engine's
//! would, which is all the lifecycle core observes.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

use crate::engine::{Engine, EngineEvents, EngineHandle, HandlerConfig};

/// Live session count per peer address, shared with session tasks.
type ActiveSessions = Arc<Mutex<HashMap<IpAddr, usize>>>;

/// A session being served on the accept loop itself (single-threaded
/// strategy), progressed one poll window at a time.
type InlineSession = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpAcceptor;

#[async_trait]
impl Engine for TcpAcceptor {
    async fn bind(
        &self,
        host: IpAddr,
        port: u16,
        config: HandlerConfig,
    ) -> io::Result<Box<dyn EngineHandle>> {
        let listener = TcpListener::bind(SocketAddr::new(host, port)).await?;
        debug!("acceptor bound to {}", listener.local_addr()?);
        Ok(Box::new(AcceptorHandle {
            listener: Some(listener),
            config,
            sessions: JoinSet::new(),
            current: None,
            active: Arc::new(Mutex::new(HashMap::new())),
        }))
    }
}

struct AcceptorHandle {
    /// Taken and dropped by `close_all`; the port is free once that runs.
    listener: Option<TcpListener>,
    config: HandlerConfig,
    sessions: JoinSet<()>,
    current: Option<InlineSession>,
    active: ActiveSessions,
}

#[async_trait]
impl EngineHandle for AcceptorHandle {
    async fn serve_once(&mut self, timeout: Duration) -> io::Result<()> {
        // Reap finished session tasks without blocking.
        while self.sessions.try_join_next().is_some() {}

        // Single-threaded strategy: an in-flight session is progressed for
        // one poll window before any further accept, so connections stay
        // serialized and `serve_once` stays bounded.
        if let Some(mut session) = self.current.take() {
            if tokio::time::timeout(timeout, &mut session).await.is_err() {
                self.current = Some(session);
            }
            return Ok(());
        }

        let Some(listener) = &self.listener else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "listener closed",
            ));
        };
        let (stream, peer) = match tokio::time::timeout(timeout, listener.accept()).await {
            Ok(accepted) => accepted?,
            // Poll window elapsed with nothing to accept.
            Err(_) => return Ok(()),
        };

        if !self.admit(peer) {
            warn!("refusing connection from {}: connection limit reached", peer);
            drop(stream);
            return Ok(());
        }

        self.config.events.on_connect(peer);
        let events = Arc::clone(&self.config.events);
        let active = Arc::clone(&self.active);
        let banner = self.config.banner.clone();
        if self.config.threaded {
            self.sessions.spawn(async move {
                run_session(stream, peer, banner, events, active).await;
            });
        } else {
            self.current = Some(Box::pin(run_session(stream, peer, banner, events, active)));
        }
        Ok(())
    }

    async fn close_all(&mut self) {
        // Dropping the inline session severs its stream.
        self.current = None;
        self.sessions.abort_all();
        while self.sessions.join_next().await.is_some() {}
        // Callers may treat the control port as free once this returns.
        drop(self.listener.take());
    }
}

impl AcceptorHandle {
    /// Applies the total and per-address connection limits.
    fn admit(&self, peer: SocketAddr) -> bool {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let total: usize = active.values().sum();
        if total >= self.config.max_connections {
            return false;
        }
        let per_addr = active.get(&peer.ip()).copied().unwrap_or(0);
        if per_addr >= self.config.max_connections_per_addr {
            return false;
        }
        active.insert(peer.ip(), per_addr + 1);
        true
    }
}

async fn run_session(
    mut stream: TcpStream,
    peer: SocketAddr,
    banner: String,
    events: Arc<dyn EngineEvents>,
    active: ActiveSessions,
) {
    if let Err(e) = stream.write_all(format!("{banner}\r\n").as_bytes()).await {
        events.on_error(&e);
    } else {
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                // No protocol behind this engine: drain until the peer
                // closes.
                Ok(_) => {}
                Err(e) => {
                    events.on_error(&e);
                    break;
                }
            }
        }
    }
    release(&active, peer.ip());
    events.on_disconnect(peer);
}

fn release(active: &ActiveSessions, ip: IpAddr) {
    let mut active = active.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(count) = active.get_mut(&ip) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            active.remove(&ip);
        }
    }
}
