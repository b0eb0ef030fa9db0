//! Server lifecycle management
//!
//! `ServerManager` owns the state machine around one engine instance:
//! validate the configuration, reserve the control port and passive range,
//! bind the engine, supervise its serve loop, and stop it again. `start`
//! and `stop` serialize on an operation lock; `is_running` and
//! `connection_count` are cheap reads off to the side.

use log::{debug, error, info, warn};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::engine::{Engine, EngineHandle, HandlerConfig, Permissions};
use crate::error::{PortConflict, StartError, StopError};
use crate::server::counter::ConnectionCounter;
use crate::server::hooks::SessionHooks;
use crate::server::port_cache::PortCache;
use crate::server::state::ServerState;
use crate::server::validators;

/// How long `stop` waits for the supervisory task to exit on its own.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Poll window for each `serve_once` call; bounds stop latency regardless
/// of in-flight transfer duration.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Servers bind the wildcard address, so availability is probed there too.
const BIND_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

const BANNER: &str = "220 Service ready";
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(600);
const DATA_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONNECTIONS: usize = 256;
const MAX_CONNECTIONS_PER_ADDR: usize = 5;

/// The running engine and the means to stop it.
struct Supervisor {
    stop: Arc<AtomicBool>,
    handle: Arc<tokio::sync::Mutex<Box<dyn EngineHandle>>>,
    task: JoinHandle<()>,
}

pub struct ServerManager {
    engine: Arc<dyn Engine>,
    port_cache: Arc<PortCache>,
    counter: Arc<ConnectionCounter>,
    state: Mutex<ServerState>,
    /// Holds the supervisor while running; doubles as the lock that
    /// serializes concurrent `start`/`stop` callers.
    op: tokio::sync::Mutex<Option<Supervisor>>,
}

impl ServerManager {
    pub fn new(
        engine: Arc<dyn Engine>,
        port_cache: Arc<PortCache>,
        counter: Arc<ConnectionCounter>,
    ) -> Self {
        Self {
            engine,
            port_cache,
            counter,
            state: Mutex::new(ServerState::Stopped),
            op: tokio::sync::Mutex::new(None),
        }
    }

    /// Validates `config`, reserves its ports, and launches the engine
    /// under a supervisory task. Idempotent while a server is already up.
    pub async fn start(&self, config: ServerConfig) -> Result<(), StartError> {
        let mut slot = self.op.lock().await;
        if slot.is_some() || self.state().is_start_in_progress() {
            info!("start requested while already {}; nothing to do", self.state());
            return Ok(());
        }
        self.set_state(ServerState::Starting);

        let failures = validators::validate(&config);
        if !failures.is_empty() {
            for failure in &failures {
                warn!("rejected configuration: {}", failure);
            }
            self.fail();
            return Err(StartError::ValidationFailed(failures));
        }

        if !self.port_cache.available(BIND_HOST, config.port) {
            self.fail();
            return Err(PortConflict::Control(config.port).into());
        }

        if let Some(range) = config.passive_range() {
            // The whole data range must be free before the control listener
            // ever binds; a server with no usable data channel must not come
            // up half-started.
            if !self
                .port_cache
                .available_range(BIND_HOST, *range.start(), *range.end())
            {
                self.fail();
                return Err(PortConflict::Passive {
                    start: *range.start(),
                    end: *range.end(),
                }
                .into());
            }
        }

        // The bind below changes real occupancy; cached results are stale.
        self.port_cache.invalidate();

        let handler = self.handler_config(&config);
        let handle = match self.engine.bind(BIND_HOST, config.port, handler).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("engine bind failed on port {}: {}", config.port, e);
                self.port_cache.invalidate();
                self.fail();
                return Err(StartError::Engine(e));
            }
        };

        self.counter.reset();

        let stop = Arc::new(AtomicBool::new(false));
        let handle = Arc::new(tokio::sync::Mutex::new(handle));
        let task = tokio::spawn(supervise(Arc::clone(&handle), Arc::clone(&stop)));
        *slot = Some(Supervisor { stop, handle, task });
        self.set_state(ServerState::Running);

        info!(
            "server listening on port {} ({}, {} encoding)",
            config.port,
            if config.threaded {
                "threaded"
            } else {
                "single-threaded"
            },
            config.encoding.name(),
        );
        if let Some(range) = config.passive_range() {
            info!(
                "passive mode enabled on ports {}-{}",
                range.start(),
                range.end()
            );
        }
        Ok(())
    }

    /// Signals the supervisory task, waits out the grace period, and forces
    /// termination if the engine does not wind down in time. Idempotent
    /// while already stopped.
    pub async fn stop(&self) -> Result<(), StopError> {
        let mut slot = self.op.lock().await;
        let Some(mut supervisor) = slot.take() else {
            return Ok(());
        };
        self.set_state(ServerState::Stopping);
        info!("stopping server");

        supervisor.stop.store(true, Ordering::SeqCst);
        let mut panicked = None;
        match tokio::time::timeout(GRACE_PERIOD, &mut supervisor.task).await {
            // Graceful exit; the task already ran close_all.
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                error!("supervisory task died: {}", join_err);
                panicked = Some(join_err.to_string());
                supervisor.handle.lock().await.close_all().await;
            }
            Err(_) => {
                warn!(
                    "graceful shutdown exceeded {:?}, forcing termination",
                    GRACE_PERIOD
                );
                supervisor.task.abort();
                let _ = supervisor.task.await;
                supervisor.handle.lock().await.close_all().await;
            }
        }

        // The listener is released by now; only now may cached availability
        // be refreshed without racing a concurrent start elsewhere.
        self.port_cache.invalidate();
        self.counter.reset();
        self.set_state(ServerState::Stopped);
        info!("server stopped");

        match panicked {
            Some(msg) => Err(StopError::SupervisorPanicked(msg)),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    pub fn connection_count(&self) -> u64 {
        self.counter.count()
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The availability cache, for front ends polling ports while the
    /// operator edits settings.
    pub fn port_cache(&self) -> &PortCache {
        &self.port_cache
    }

    fn set_state(&self, next: ServerState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!("server state: {} -> {}", *state, next);
        *state = next;
    }

    /// Failed is transient; the manager always comes to rest at Stopped.
    fn fail(&self) {
        self.set_state(ServerState::Failed);
        self.set_state(ServerState::Stopped);
    }

    fn handler_config(&self, config: &ServerConfig) -> HandlerConfig {
        HandlerConfig {
            root: config.directory.clone(),
            anonymous_permissions: Permissions::all(),
            encoding: config.encoding,
            passive_ports: config.passive_range(),
            connection_timeout: CONNECTION_TIMEOUT,
            data_timeout: DATA_TIMEOUT,
            max_connections: MAX_CONNECTIONS,
            max_connections_per_addr: MAX_CONNECTIONS_PER_ADDR,
            banner: BANNER.to_string(),
            threaded: config.threaded,
            events: Arc::new(SessionHooks::new(Arc::clone(&self.counter))),
        }
    }
}

/// Drives the engine's accept loop until the stop flag is raised, then
/// closes everything down. The short `serve_once` window keeps stop latency
/// bounded.
async fn supervise(
    handle: Arc<tokio::sync::Mutex<Box<dyn EngineHandle>>>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::SeqCst) {
        let result = handle.lock().await.serve_once(POLL_INTERVAL).await;
        if let Err(e) = result {
            error!("engine serve loop error: {}", e);
            // A failing engine returns immediately; pace the retries so the
            // loop does not spin between errors.
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
    handle.lock().await.close_all().await;
}
