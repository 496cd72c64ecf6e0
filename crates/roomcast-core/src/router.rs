//! Routes inbound room events to the callbacks registered for their room.
//!
//! The server addresses events with a composite room name whose suffix after
//! the last separator is the client-side room id. Events for rooms nobody is
//! subscribed to, or for which the room has no matching callback, are dropped.

use std::sync::Arc;

use roomcast_rpc::{EssentialsPayload, EventKind, Frame, RoomEnvelope, ServerEvent};
use roomcast_types::{EssentialItem, RoomName};
use tracing::{debug, warn};

use crate::registry::RoomRegistry;

/// What happened to one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A callback ran
    Delivered,
    /// No callbacks are registered for the room
    NoSubscriber,
    /// The room is registered but has no callback for this event
    NoHandler,
    /// Room name or payload could not be decoded
    Malformed,
    /// Not a room event (handshake replies, unknown event names)
    Ignored,
}

#[derive(Debug, Clone)]
pub struct EventRouter {
    registry: Arc<RoomRegistry>,
}

impl EventRouter {
    #[must_use]
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Classify and route a raw inbound frame.
    pub fn route_frame(&self, frame: Frame) -> RouteOutcome {
        match ServerEvent::from_frame(frame) {
            Ok(ServerEvent::Room { kind, envelope }) => self.route(kind, envelope),
            Ok(ServerEvent::Connected | ServerEvent::ConnectRejected(_)) => {
                debug!("Ignoring handshake reply on an established connection");
                RouteOutcome::Ignored
            }
            Ok(ServerEvent::Unknown(frame)) => {
                debug!("Ignoring unknown event: {}", frame.event);
                RouteOutcome::Ignored
            }
            Err(e) => {
                warn!("Dropping malformed event: {}", e);
                RouteOutcome::Malformed
            }
        }
    }

    /// Deliver one room event.
    ///
    /// The callback set is cloned out of the registry before invocation, so a
    /// callback may join or leave rooms without deadlocking.
    pub fn route(&self, kind: EventKind, envelope: RoomEnvelope) -> RouteOutcome {
        let RoomEnvelope { room, data } = envelope;

        let name = match RoomName::parse(&room) {
            Ok(name) => name,
            Err(e) => {
                warn!("Dropping {} with bad room name {:?}: {}", kind, room, e);
                return RouteOutcome::Malformed;
            }
        };
        let room_id = name.room_id();

        let Some(callbacks) = self.registry.lookup(room_id.as_str()) else {
            debug!("No subscriber for {} in room {}", kind, room_id);
            return RouteOutcome::NoSubscriber;
        };

        let delivered = match kind {
            EventKind::EssentialsList => {
                let payload: EssentialsPayload = match serde_json::from_value(data) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Dropping malformed essentials for room {}: {}", room_id, e);
                        return RouteOutcome::Malformed;
                    }
                };
                callbacks.deliver_essentials(EssentialItem::numbered(payload.essentials))
            }
            EventKind::RoomReady => callbacks.deliver_ready(),
            _ => callbacks.deliver_data(kind, data),
        };

        if delivered {
            debug!("Delivered {} to room {}", kind, room_id);
            RouteOutcome::Delivered
        } else {
            debug!("Room {} has no handler for {}", room_id, kind);
            RouteOutcome::NoHandler
        }
    }
}
