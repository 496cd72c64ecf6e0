//! Room subscriptions over the shared connection.
//!
//! [`RoomClient`] is the context object callers hold: it owns the room
//! registry, the connection manager and the credential source. Joining a room
//! registers its callbacks at once and asks the server to subscribe as soon as
//! the connection is live. [`ProductRooms`] and [`EssentialRooms`] are typed
//! façades for the two room domains.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use roomcast_rpc::ClientEvent;
use roomcast_types::RoomId;
use tracing::{debug, info, warn};

use crate::callbacks::{CallbackSet, EssentialRoomCallbacks, ProductRoomCallbacks};
use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::credentials::TokenStore;
use crate::registry::RoomRegistry;
use crate::router::EventRouter;
use crate::{Error, Result};

/// Subscription state of one room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Never joined
    Unjoined,
    /// Callbacks registered, `join_room` waiting for the connection
    Joining,
    /// Callbacks registered and `join_room` sent
    Joined,
    /// Left after a join. Only the most recently left rooms are remembered;
    /// older ones report `Unjoined` again.
    Left,
}

/// Rooms remembered as [`RoomState::Left`]; older ones fall back to `Unjoined`.
const LEFT_HISTORY: usize = 64;

/// Per-room bookkeeping. The lock around it also orders registry changes with
/// the frames they emit, so concurrent join/leave on one room reach the server
/// in the same order they took effect locally.
#[derive(Debug, Default)]
struct Tracking {
    pending: HashSet<RoomId>,
    left: VecDeque<RoomId>,
    flush_queued: bool,
}

impl Tracking {
    fn mark_left(&mut self, room_id: &RoomId) {
        self.forget_left(room_id);
        if self.left.len() == LEFT_HISTORY {
            self.left.pop_front();
        }
        self.left.push_back(room_id.clone());
    }

    fn forget_left(&mut self, room_id: &RoomId) {
        self.left.retain(|id| id != room_id);
    }

    fn has_left(&self, room_id: &RoomId) -> bool {
        self.left.contains(room_id)
    }
}

struct ClientInner {
    registry: Arc<RoomRegistry>,
    connection: ConnectionManager,
    tokens: Arc<dyn TokenStore>,
    tracking: Mutex<Tracking>,
}

impl ClientInner {
    fn send_join(&self, room_id: &RoomId) {
        let Some(token) = self.connection.credential() else {
            warn!("No credential on the connection, cannot join {}", room_id);
            return;
        };
        debug!("Joining room {}", room_id);
        self.connection
            .emit(ClientEvent::join_room(room_id.clone(), token));
    }

    /// Emit the deferred joins that were neither sent nor cancelled.
    fn flush_pending(&self) {
        let mut tracking = self.tracking.lock();
        let mut rooms: Vec<RoomId> = tracking.pending.drain().collect();
        rooms.sort();
        for room_id in &rooms {
            if self.registry.contains(room_id.as_str()) {
                self.send_join(room_id);
            } else {
                debug!("Room {} left before the connection came up", room_id);
            }
        }
    }

    /// Re-send `join_room` for registered rooms after a fresh handshake.
    /// Pending rooms are skipped; their continuations send the join.
    fn rejoin_all(&self) {
        let tracking = self.tracking.lock();
        let rooms: Vec<RoomId> = self
            .registry
            .room_ids()
            .into_iter()
            .filter(|room_id| !tracking.pending.contains(room_id))
            .collect();
        if rooms.is_empty() {
            return;
        }
        info!("Rejoining {} rooms", rooms.len());
        for room_id in &rooms {
            self.send_join(room_id);
        }
    }
}

/// The single queued `when_connected` continuation that flushes pending
/// joins. Dropping it, run or discarded, lets the next join queue a new one.
struct PendingFlush {
    inner: Weak<ClientInner>,
}

impl PendingFlush {
    fn run(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.flush_pending();
        }
    }
}

impl Drop for PendingFlush {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.tracking.lock().flush_queued = false;
        }
    }
}

/// Context object for room subscriptions. Clones share the same state.
#[derive(Clone)]
pub struct RoomClient {
    inner: Arc<ClientInner>,
}

impl RoomClient {
    #[must_use]
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let router = EventRouter::new(Arc::clone(&registry));
        let connection = ConnectionManager::from_config(config, router);

        let inner = Arc::new(ClientInner {
            registry,
            connection,
            tokens,
            tracking: Mutex::new(Tracking::default()),
        });

        if config.rejoin_on_reconnect {
            let weak: Weak<ClientInner> = Arc::downgrade(&inner);
            inner.connection.on_connected(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.rejoin_all();
                }
            });
        }

        Self { inner }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionManager {
        &self.inner.connection
    }

    #[must_use]
    pub fn products(&self) -> ProductRooms {
        ProductRooms {
            client: self.clone(),
        }
    }

    #[must_use]
    pub fn essentials(&self) -> EssentialRooms {
        EssentialRooms {
            client: self.clone(),
        }
    }

    /// Subscribe to `room_id`.
    ///
    /// The callbacks are registered immediately, replacing any earlier set for
    /// the room. `join_room` goes out now if the connection is live; otherwise
    /// it is sent exactly once when the connection comes up.
    pub fn join(&self, room_id: RoomId, callbacks: impl Into<CallbackSet>) {
        if !room_id.is_routable() {
            warn!(
                "Room id {:?} cannot be recovered from a room name, events will not route",
                room_id.as_str()
            );
        }

        let callbacks = callbacks.into();
        let queue_flush = {
            let mut tracking = self.inner.tracking.lock();
            if self.inner.registry.register(room_id.clone(), callbacks) {
                debug!("Replaced callbacks for room {}", room_id);
            }
            tracking.forget_left(&room_id);

            if self.inner.connection.is_connected() {
                tracking.pending.remove(&room_id);
                self.inner.send_join(&room_id);
                return;
            }
            if !tracking.pending.insert(room_id.clone()) {
                debug!("Join for room {} already pending", room_id);
            }
            !std::mem::replace(&mut tracking.flush_queued, true)
        };

        if queue_flush {
            let flush = PendingFlush {
                inner: Arc::downgrade(&self.inner),
            };
            self.inner.connection.when_connected(move || flush.run());
        }

        match self.inner.tokens.get_token() {
            Some(token) => {
                if let Err(e) = self.inner.connection.connect(token) {
                    warn!("Cannot open connection for room {}: {}", room_id, e);
                }
            }
            None => warn!("No credential yet, room {} waits for connect()", room_id),
        }
    }

    /// Unsubscribe from `room_id`.
    ///
    /// Events for the room stop being delivered at once. `leave_room` is sent
    /// only when the server was asked to join and the connection is live.
    pub fn leave(&self, room_id: &RoomId) {
        let mut tracking = self.inner.tracking.lock();
        let removed = self.inner.registry.unregister(room_id.as_str());
        let was_pending = tracking.pending.remove(room_id);
        if removed {
            tracking.mark_left(room_id);
        }

        if !removed {
            debug!("Leave for room {} without a join, ignoring", room_id);
            return;
        }
        if was_pending {
            debug!("Cancelled pending join for room {}", room_id);
            return;
        }
        if !self.inner.connection.is_connected() {
            debug!("Not connected, no leave_room for {}", room_id);
            return;
        }

        let Some(token) = self.inner.connection.credential() else {
            return;
        };
        debug!("Leaving room {}", room_id);
        self.inner
            .connection
            .emit(ClientEvent::leave_room(room_id.clone(), token));
    }

    /// Open the connection with the stored credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCredential`] if the token store is empty and
    /// [`Error::NoRuntime`] outside a tokio runtime.
    pub fn connect(&self) -> Result<()> {
        let token = self.inner.tokens.get_token().ok_or(Error::NoCredential)?;
        self.inner.connection.connect(token)
    }

    /// Close the connection.
    ///
    /// Rooms whose join never reached the server are dropped and report
    /// [`RoomState::Left`]. Joined rooms keep their callbacks.
    pub fn disconnect(&self) {
        let dropped: Vec<RoomId> = {
            let mut tracking = self.inner.tracking.lock();
            let dropped: Vec<RoomId> = tracking.pending.drain().collect();
            for room_id in &dropped {
                self.inner.registry.unregister(room_id.as_str());
                tracking.mark_left(room_id);
            }
            dropped
        };
        if !dropped.is_empty() {
            debug!("Dropped {} pending joins", dropped.len());
        }
        self.inner.connection.disconnect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    #[must_use]
    pub fn room_state(&self, room_id: &RoomId) -> RoomState {
        let tracking = self.inner.tracking.lock();
        if tracking.pending.contains(room_id) {
            RoomState::Joining
        } else if self.inner.registry.contains(room_id.as_str()) {
            RoomState::Joined
        } else if tracking.has_left(room_id) {
            RoomState::Left
        } else {
            RoomState::Unjoined
        }
    }

    /// Number of rooms held in (pending, left) bookkeeping.
    #[cfg(test)]
    pub(crate) fn tracked_rooms(&self) -> (usize, usize) {
        let tracking = self.inner.tracking.lock();
        (tracking.pending.len(), tracking.left.len())
    }

    /// Leave every registered room.
    pub fn leave_all(&self) {
        for room_id in self.inner.registry.room_ids() {
            self.leave(&room_id);
        }
    }
}

impl std::fmt::Debug for RoomClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomClient")
            .field("connection", &self.inner.connection)
            .field("rooms", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

/// Product lookup rooms, keyed by product id or UPC
#[derive(Debug, Clone)]
pub struct ProductRooms {
    client: RoomClient,
}

impl ProductRooms {
    pub fn join(&self, upc_or_id: &str, callbacks: ProductRoomCallbacks) {
        self.client.join(RoomId::product(upc_or_id), callbacks);
    }

    pub fn leave(&self, upc_or_id: &str) {
        self.client.leave(&RoomId::product(upc_or_id));
    }
}

/// Essential (ingredient) rooms, keyed by essential name
#[derive(Debug, Clone)]
pub struct EssentialRooms {
    client: RoomClient,
}

impl EssentialRooms {
    pub fn join(&self, name: &str, callbacks: EssentialRoomCallbacks) {
        self.client.join(RoomId::essential(name), callbacks);
    }

    pub fn leave(&self, name: &str) {
        self.client.leave(&RoomId::essential(name));
    }
}
