//! Room subscriptions and event routing over one shared realtime connection.
//!
//! Callers join rooms with a set of callbacks; the first join opens the
//! connection, and every room event the server pushes is routed to the
//! callbacks of the room it names.

pub mod callbacks;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod registry;
pub mod router;
pub mod session;

mod error;

#[cfg(test)]
mod tests;

pub use callbacks::{Callback, CallbackSet, EssentialRoomCallbacks, ProductRoomCallbacks};
pub use config::{ClientConfig, Directories};
pub use connection::{ConnectionManager, ConnectionStatus};
pub use credentials::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use error::{Error, Result};
pub use registry::RoomRegistry;
pub use router::{EventRouter, RouteOutcome};
pub use session::{EssentialRooms, ProductRooms, RoomClient, RoomState};

pub use roomcast_types::*;
