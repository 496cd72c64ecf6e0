//! Wire protocol for roomcast's realtime connection.
//!
//! This crate provides the named-event frames, the length-prefixed codec and
//! the client side of the connection handshake.
//!
//! # Architecture
//!
//! - [`protocol`]: frames, event names, join/leave and room payloads
//! - [`transport`]: length-prefixed codec for frame delimitation
//! - [`client`]: endpoints, stream setup and the handshake
//! - [`error`]: error type and `Result` alias
//!
//! # Example
//!
//! ```no_run
//! use roomcast_rpc::{Endpoint, client};
//!
//! # async fn example() -> roomcast_rpc::Result<()> {
//! let endpoint: Endpoint = "tcp:127.0.0.1:5000".parse()?;
//! let mut stream = client::open(&endpoint).await?;
//! client::handshake(&mut stream, "my-token").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{AsyncIo, Endpoint, EventStream};

pub use error::{Error, Result};

pub use protocol::{
    CONNECT, CONNECT_ERROR, ClientEvent, ConnectError, EssentialsPayload, EventKind, Frame,
    HANDSHAKE, HandshakeParams, JOIN_ROOM, LEAVE_ROOM, RoomEnvelope, RoomRequest, ServerEvent,
};

pub use transport::{CodecError, EventCodec, MAX_FRAME_SIZE};

pub use roomcast_types::{EssentialItem, RoomId, RoomName, RoomNameError};
