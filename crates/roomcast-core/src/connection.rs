//! The one shared realtime connection.
//!
//! A [`ConnectionManager`] owns at most one transport at a time. `connect`
//! spawns a task that opens the socket, authenticates with the credential and
//! then multiplexes outbound frames with inbound routing until the connection
//! ends. Link state lives behind a single mutex so concurrent `connect` calls
//! produce exactly one handshake.
//!
//! Connection attempts are tagged with a generation. A task whose generation no
//! longer matches the current link (because `disconnect` ran meanwhile) tears
//! itself down without touching the state of a newer connection.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use roomcast_rpc::{ClientEvent, Endpoint, EventStream, Frame, client};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::router::EventRouter;
use crate::{Error, Result};

/// Connection lifecycle as seen by listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

type Task = Box<dyn FnOnce() + Send>;
type StatusListener = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

enum LinkState {
    Idle,
    Connecting {
        generation: u64,
        credential: String,
    },
    Live {
        generation: u64,
        credential: String,
        outbound: mpsc::UnboundedSender<Frame>,
        shutdown: oneshot::Sender<()>,
    },
}

impl LinkState {
    fn generation(&self) -> Option<u64> {
        match self {
            LinkState::Idle => None,
            LinkState::Connecting { generation, .. } | LinkState::Live { generation, .. } => {
                Some(*generation)
            }
        }
    }

    fn status(&self) -> ConnectionStatus {
        match self {
            LinkState::Idle => ConnectionStatus::Disconnected,
            LinkState::Connecting { .. } => ConnectionStatus::Connecting,
            LinkState::Live { .. } => ConnectionStatus::Connected,
        }
    }
}

struct Inner {
    link: LinkState,
    waiters: Vec<Task>,
    next_generation: u64,
}

struct Shared {
    endpoint: Endpoint,
    handshake_timeout: Duration,
    router: EventRouter,
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<StatusListener>>,
}

impl Shared {
    fn notify(&self, status: ConnectionStatus) {
        let listeners: Vec<StatusListener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(status);
        }
    }

    /// Handshake failed: back to idle, queued continuations stay queued.
    fn fail(&self, generation: u64) {
        let reset = {
            let mut inner = self.inner.lock();
            let current = matches!(inner.link, LinkState::Connecting { .. })
                && inner.link.generation() == Some(generation);
            if current {
                inner.link = LinkState::Idle;
            }
            current
        };
        if reset {
            self.notify(ConnectionStatus::Disconnected);
        }
    }

    /// Connection loop ended on its own (server close, transport error).
    fn closed(&self, generation: u64) {
        let reset = {
            let mut inner = self.inner.lock();
            let current = inner.link.generation() == Some(generation);
            if current {
                inner.link = LinkState::Idle;
            }
            current
        };
        if reset {
            info!("Disconnected from {}", self.endpoint);
            self.notify(ConnectionStatus::Disconnected);
        }
    }
}

/// Handle to the shared connection. Clones refer to the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(endpoint: Endpoint, handshake_timeout: Duration, router: EventRouter) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint,
                handshake_timeout,
                router,
                inner: Mutex::new(Inner {
                    link: LinkState::Idle,
                    waiters: Vec::new(),
                    next_generation: 0,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig, router: EventRouter) -> Self {
        Self::new(config.endpoint.clone(), config.handshake_timeout(), router)
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    /// Open the connection and authenticate with `credential`.
    ///
    /// Does nothing if a connection is already live or being established; the
    /// handshake itself runs on a spawned task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn connect(&self, credential: impl Into<String>) -> Result<()> {
        let credential = credential.into();
        let generation = {
            let mut inner = self.shared.inner.lock();
            if !matches!(inner.link, LinkState::Idle) {
                debug!("Connection already live or in progress");
                return Ok(());
            }
            let generation = inner.next_generation;
            inner.next_generation += 1;
            inner.link = LinkState::Connecting {
                generation,
                credential: credential.clone(),
            };
            generation
        };

        let Ok(handle) = Handle::try_current() else {
            let mut inner = self.shared.inner.lock();
            if inner.link.generation() == Some(generation) {
                inner.link = LinkState::Idle;
            }
            return Err(Error::NoRuntime);
        };

        self.shared.notify(ConnectionStatus::Connecting);
        handle.spawn(run_connection(
            Arc::clone(&self.shared),
            generation,
            credential,
        ));
        Ok(())
    }

    /// Register a listener for every status change.
    pub fn on_status_change(&self, listener: impl Fn(ConnectionStatus) + Send + Sync + 'static) {
        self.shared.listeners.lock().push(Arc::new(listener));
    }

    /// Register a listener fired once per successful handshake.
    pub fn on_connected(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.on_status_change(move |status| {
            if status == ConnectionStatus::Connected {
                listener();
            }
        });
    }

    /// Run `task` once the connection is live: now if it already is, otherwise
    /// right after the next successful handshake.
    pub fn when_connected(&self, task: impl FnOnce() + Send + 'static) {
        let mut inner = self.shared.inner.lock();
        if matches!(inner.link, LinkState::Live { .. }) {
            drop(inner);
            task();
        } else {
            inner.waiters.push(Box::new(task));
        }
    }

    /// Close the connection, or abandon one being established. Queued
    /// continuations are discarded. Calling it again is a no-op.
    pub fn disconnect(&self) {
        let (previous, waiters) = {
            let mut inner = self.shared.inner.lock();
            (
                std::mem::replace(&mut inner.link, LinkState::Idle),
                std::mem::take(&mut inner.waiters),
            )
        };
        if !waiters.is_empty() {
            debug!("Discarding {} queued continuations", waiters.len());
        }
        drop(waiters);

        match previous {
            LinkState::Idle => {}
            LinkState::Connecting { .. } => {
                info!("Abandoning connection attempt to {}", self.shared.endpoint);
                self.shared.notify(ConnectionStatus::Disconnected);
            }
            LinkState::Live { shutdown, .. } => {
                info!("Disconnecting from {}", self.shared.endpoint);
                let _ = shutdown.send(());
                self.shared.notify(ConnectionStatus::Disconnected);
            }
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self.shared.inner.lock().link, LinkState::Live { .. })
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.inner.lock().link.status()
    }

    /// Credential of the live or pending connection.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        match &self.shared.inner.lock().link {
            LinkState::Idle => None,
            LinkState::Connecting { credential, .. } | LinkState::Live { credential, .. } => {
                Some(credential.clone())
            }
        }
    }

    /// Send `event` on the live connection. Without one the event is logged
    /// and dropped. Returns whether it was queued for sending.
    pub fn emit(&self, event: ClientEvent) -> bool {
        let name = event.name();
        let frame = match event.into_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {}: {}", name, e);
                return false;
            }
        };

        let inner = self.shared.inner.lock();
        match &inner.link {
            LinkState::Live { outbound, .. } => {
                if outbound.send(frame).is_ok() {
                    true
                } else {
                    warn!("Connection closing, dropping {}", name);
                    false
                }
            }
            _ => {
                warn!("Not connected, dropping {}", name);
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn queued_continuations(&self) -> usize {
        self.shared.inner.lock().waiters.len()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.shared.endpoint)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

async fn run_connection(shared: Arc<Shared>, generation: u64, credential: String) {
    info!("Connecting to {}", shared.endpoint);

    let attempt = async {
        let mut stream = client::open(&shared.endpoint).await?;
        client::handshake(&mut stream, &credential).await?;
        Ok::<_, roomcast_rpc::Error>(stream)
    };

    let stream = match tokio::time::timeout(shared.handshake_timeout, attempt).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            warn!("Connection to {} failed: {}", shared.endpoint, Error::from(e));
            shared.fail(generation);
            return;
        }
        Err(_) => {
            warn!(
                "Connection to {} failed: {}",
                shared.endpoint,
                Error::HandshakeTimeout(shared.handshake_timeout)
            );
            shared.fail(generation);
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let waiters = {
        let mut inner = shared.inner.lock();
        let current = matches!(inner.link, LinkState::Connecting { .. })
            && inner.link.generation() == Some(generation);
        if !current {
            debug!("Connection attempt {} superseded, closing", generation);
            return;
        }
        inner.link = LinkState::Live {
            generation,
            credential,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        };
        std::mem::take(&mut inner.waiters)
    };

    info!("Connected to {}", shared.endpoint);
    shared.notify(ConnectionStatus::Connected);
    for task in waiters {
        task();
    }

    connection_loop(&shared, stream, outbound_rx, shutdown_rx).await;
    shared.closed(generation);
}

/// Pump outbound frames and route inbound ones until either side closes.
///
/// Queued outbound frames are flushed before a shutdown request is honoured.
async fn connection_loop(
    shared: &Shared,
    stream: EventStream,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            biased;

            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    debug!("Outbound channel closed");
                    let _ = sink.close().await;
                    break;
                };
                debug!("Sending {}", frame.event);
                if let Err(e) = sink.send(frame).await {
                    warn!("Send failed: {}", e);
                    break;
                }
            }

            _ = &mut shutdown => {
                debug!("Shutdown requested");
                let _ = sink.close().await;
                break;
            }

            incoming = source.next() => match incoming {
                Some(Ok(frame)) => {
                    shared.router.route_frame(frame);
                }
                Some(Err(e)) => {
                    warn!("Receive failed: {}", e);
                    break;
                }
                None => {
                    info!("Server closed the connection");
                    break;
                }
            }
        }
    }
}
