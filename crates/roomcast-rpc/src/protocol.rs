//! Named-event wire protocol.
//!
//! Every message on the connection is a [`Frame`]: an event name plus a JSON
//! payload. The client authenticates once with a `handshake` frame, then
//! joins and leaves rooms; the server pushes room events whose payload names
//! the composite room they belong to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use roomcast_types::RoomId;

use crate::error::{Error, Result};

pub const HANDSHAKE: &str = "handshake";
pub const CONNECT: &str = "connect";
pub const CONNECT_ERROR: &str = "connect_error";
pub const JOIN_ROOM: &str = "join_room";
pub const LEAVE_ROOM: &str = "leave_room";

/// One named event on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Frame {
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    #[must_use]
    pub fn empty(event: impl Into<String>) -> Self {
        Self::new(event, Value::Null)
    }

    /// Deserialize the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] if the payload does not match `T`.
    pub fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| Error::InvalidPayload {
            event: self.event.clone(),
            message: e.to_string(),
        })
    }
}

/// Room event types pushed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DataUpdate,
    DataUpdateError,
    SimilarItems,
    SimilarItemsError,
    EssentialsList,
    EssentialsListError,
    RoomReady,
    EssentialProducts,
    EssentialProductsError,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::DataUpdate,
        EventKind::DataUpdateError,
        EventKind::SimilarItems,
        EventKind::SimilarItemsError,
        EventKind::EssentialsList,
        EventKind::EssentialsListError,
        EventKind::RoomReady,
        EventKind::EssentialProducts,
        EventKind::EssentialProductsError,
    ];

    /// Event name used on the wire.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            EventKind::DataUpdate => "lookup_update",
            EventKind::DataUpdateError => "lookup_update_error",
            EventKind::SimilarItems => "recommend_similar_products",
            EventKind::SimilarItemsError => "recommend_similar_products_error",
            EventKind::EssentialsList => "essentials",
            EventKind::EssentialsListError => "essentials_error",
            EventKind::RoomReady => "room_ready",
            EventKind::EssentialProducts => "e_essential_products",
            EventKind::EssentialProductsError => "e_essential_products_error",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(
            self,
            EventKind::DataUpdateError
                | EventKind::SimilarItemsError
                | EventKind::EssentialsListError
                | EventKind::EssentialProductsError
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Handshake payload; the credential travels once per connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeParams {
    pub token: String,
}

/// Payload of `connect_error`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectError {
    #[serde(default)]
    pub message: String,
}

/// Payload of `join_room` and `leave_room`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub room_id: RoomId,
    pub token: String,
}

/// Payload of every room event: the composite room name and the event data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEnvelope {
    pub room: String,
    #[serde(default)]
    pub data: Value,
}

/// Data of the `essentials` event before it is numbered for callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssentialsPayload {
    pub essentials: Vec<String>,
}

/// Events sent by the client
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Handshake(HandshakeParams),
    JoinRoom(RoomRequest),
    LeaveRoom(RoomRequest),
}

impl ClientEvent {
    #[must_use]
    pub fn handshake(token: impl Into<String>) -> Self {
        Self::Handshake(HandshakeParams {
            token: token.into(),
        })
    }

    #[must_use]
    pub fn join_room(room_id: RoomId, token: impl Into<String>) -> Self {
        Self::JoinRoom(RoomRequest {
            room_id,
            token: token.into(),
        })
    }

    #[must_use]
    pub fn leave_room(room_id: RoomId, token: impl Into<String>) -> Self {
        Self::LeaveRoom(RoomRequest {
            room_id,
            token: token.into(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Handshake(_) => HANDSHAKE,
            ClientEvent::JoinRoom(_) => JOIN_ROOM,
            ClientEvent::LeaveRoom(_) => LEAVE_ROOM,
        }
    }

    /// Room this event targets, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            ClientEvent::Handshake(_) => None,
            ClientEvent::JoinRoom(req) | ClientEvent::LeaveRoom(req) => Some(&req.room_id),
        }
    }

    /// Encode as a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload fails to serialize.
    pub fn into_frame(self) -> Result<Frame> {
        let name = self.name();
        let data = match self {
            ClientEvent::Handshake(params) => serde_json::to_value(params)?,
            ClientEvent::JoinRoom(req) | ClientEvent::LeaveRoom(req) => serde_json::to_value(req)?,
        };
        Ok(Frame::new(name, data))
    }
}

/// Events received from the server
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Handshake accepted
    Connected,
    /// Handshake refused
    ConnectRejected(ConnectError),
    /// Event addressed to a room
    Room {
        kind: EventKind,
        envelope: RoomEnvelope,
    },
    /// Event name this client does not handle
    Unknown(Frame),
}

impl ServerEvent {
    /// Classify an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] if a known event carries a payload of
    /// the wrong shape.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        match frame.event.as_str() {
            CONNECT => Ok(ServerEvent::Connected),
            CONNECT_ERROR => {
                let error = if frame.data.is_null() {
                    ConnectError::default()
                } else {
                    frame.decode_data()?
                };
                Ok(ServerEvent::ConnectRejected(error))
            }
            name => match EventKind::from_wire(name) {
                Some(kind) => Ok(ServerEvent::Room {
                    kind,
                    envelope: frame.decode_data()?,
                }),
                None => Ok(ServerEvent::Unknown(frame)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_room_frame_shape() {
        let frame = ClientEvent::join_room(RoomId::product("abc123"), "jwt")
            .into_frame()
            .unwrap();
        assert_eq!(frame.event, "join_room");
        assert_eq!(frame.data, json!({"roomId": "abc123", "token": "jwt"}));
    }

    #[test]
    fn test_leave_room_frame_shape() {
        let frame = ClientEvent::leave_room(RoomId::essential("Zinc"), "jwt")
            .into_frame()
            .unwrap();
        assert_eq!(frame.event, "leave_room");
        assert_eq!(frame.data["roomId"], "e_Zinc");
    }

    #[test]
    fn test_handshake_frame_carries_token() {
        let event = ClientEvent::handshake("secret");
        assert!(event.room_id().is_none());
        let frame = event.into_frame().unwrap();
        assert_eq!(frame.event, HANDSHAKE);
        assert_eq!(frame.data["token"], "secret");
    }

    #[test]
    fn test_empty_frame_omits_data() {
        let json = serde_json::to_string(&Frame::empty(CONNECT)).unwrap();
        assert_eq!(json, r#"{"event":"connect"}"#);

        let frame: Frame = serde_json::from_str(r#"{"event":"connect"}"#).unwrap();
        assert!(frame.data.is_null());
    }

    #[test]
    fn test_event_kind_wire_names_are_unique() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.wire_name()), Some(kind));
        }
        assert_eq!(EventKind::from_wire("off_error"), None);
    }

    #[test]
    fn test_event_kind_error_flags() {
        assert!(EventKind::DataUpdateError.is_error());
        assert!(EventKind::EssentialProductsError.is_error());
        assert!(!EventKind::RoomReady.is_error());
        assert!(!EventKind::EssentialsList.is_error());
    }

    #[test]
    fn test_server_event_room_update() {
        let frame = Frame::new(
            "lookup_update",
            json!({"room": "x-abc123", "data": {"rating": 4.2}}),
        );
        match ServerEvent::from_frame(frame).unwrap() {
            ServerEvent::Room { kind, envelope } => {
                assert_eq!(kind, EventKind::DataUpdate);
                assert_eq!(envelope.room, "x-abc123");
                assert_eq!(envelope.data["rating"], 4.2);
            }
            other => panic!("Expected room event, got {other:?}"),
        }
    }

    #[test]
    fn test_server_event_room_ready_without_data() {
        let frame = Frame::new("room_ready", json!({"room": "u1-abc"}));
        match ServerEvent::from_frame(frame).unwrap() {
            ServerEvent::Room { kind, envelope } => {
                assert_eq!(kind, EventKind::RoomReady);
                assert!(envelope.data.is_null());
            }
            other => panic!("Expected room event, got {other:?}"),
        }
    }

    #[test]
    fn test_server_event_connect_variants() {
        assert!(matches!(
            ServerEvent::from_frame(Frame::empty(CONNECT)).unwrap(),
            ServerEvent::Connected
        ));

        let rejected = Frame::new(CONNECT_ERROR, json!({"message": "bad token"}));
        match ServerEvent::from_frame(rejected).unwrap() {
            ServerEvent::ConnectRejected(err) => assert_eq!(err.message, "bad token"),
            other => panic!("Expected rejection, got {other:?}"),
        }

        assert!(matches!(
            ServerEvent::from_frame(Frame::empty(CONNECT_ERROR)).unwrap(),
            ServerEvent::ConnectRejected(_)
        ));
    }

    #[test]
    fn test_server_event_unknown_passes_through() {
        let frame = Frame::new("off_error", json!({"room": "1"}));
        assert!(matches!(
            ServerEvent::from_frame(frame).unwrap(),
            ServerEvent::Unknown(f) if f.event == "off_error"
        ));
    }

    #[test]
    fn test_server_event_missing_room_is_invalid() {
        let frame = Frame::new("lookup_update", json!({"data": {}}));
        let err = ServerEvent::from_frame(frame).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { ref event, .. } if event == "lookup_update"));
    }

    #[test]
    fn test_essentials_payload_parses() {
        let payload: EssentialsPayload =
            serde_json::from_value(json!({"essentials": ["Zinc", "Iron"]})).unwrap();
        assert_eq!(payload.essentials, vec!["Zinc", "Iron"]);
    }
}
