//! Shared types for roomcast components.
//!
//! This crate provides the identifiers and payload records used across
//! roomcast-rpc, roomcast-core and roomcast-cli. All types are serializable
//! for transport.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::str::FromStr;

/// Separator between the namespace and the room id in a composite room name.
pub const ROOM_SEPARATOR: char = '-';

/// Prefix that keeps essential (ingredient) rooms apart from product rooms.
pub const ESSENTIAL_PREFIX: &str = "e_";

/// Client-side identifier of a room, used as the registry key.
///
/// Product rooms use the product id or UPC verbatim. Essential rooms carry the
/// [`ESSENTIAL_PREFIX`] in front of the ingredient name; the prefix is part of
/// the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Room id for a product lookup.
    #[must_use]
    pub fn product(upc_or_id: impl Into<String>) -> Self {
        Self(upc_or_id.into())
    }

    /// Room id for an essential lookup (`e_<name>`).
    #[must_use]
    pub fn essential(name: &str) -> Self {
        Self(format!("{ESSENTIAL_PREFIX}{name}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_essential(&self) -> bool {
        self.0.starts_with(ESSENTIAL_PREFIX)
    }

    /// Ingredient name of an essential room, `None` for product rooms.
    #[must_use]
    pub fn essential_name(&self) -> Option<&str> {
        self.0.strip_prefix(ESSENTIAL_PREFIX)
    }

    /// Whether this id survives a round trip through a composite room name.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        !self.0.is_empty() && !self.0.contains(ROOM_SEPARATOR)
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors produced when parsing or formatting a composite room name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomNameError {
    #[error("room name is empty")]
    Empty,

    #[error("room name '{0}' has no id after the last separator")]
    MissingId(String),

    #[error("room id '{0}' contains the separator '{ROOM_SEPARATOR}'")]
    SeparatorInId(String),
}

/// Server-side name of a room: `<namespace>-<room id>`.
///
/// The namespace may itself contain separators (`products-user42`), the room
/// id may not. Parsing splits at the last separator. A name without any
/// separator is a bare room id with an empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName {
    namespace: String,
    room_id: RoomId,
}

impl RoomName {
    /// Parse a composite room name as sent by the server.
    ///
    /// # Errors
    ///
    /// Returns [`RoomNameError::Empty`] for an empty string and
    /// [`RoomNameError::MissingId`] when nothing follows the last separator.
    pub fn parse(raw: &str) -> Result<Self, RoomNameError> {
        if raw.is_empty() {
            return Err(RoomNameError::Empty);
        }

        let (namespace, id) = match raw.rsplit_once(ROOM_SEPARATOR) {
            Some((namespace, id)) => (namespace, id),
            None => ("", raw),
        };

        if id.is_empty() {
            return Err(RoomNameError::MissingId(raw.to_string()));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            room_id: RoomId::new(id),
        })
    }

    /// Build the composite name the server uses for `room_id` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`RoomNameError::SeparatorInId`] if the id contains the
    /// separator (it could not be recovered by [`RoomName::parse`]), and
    /// [`RoomNameError::MissingId`] for an empty id.
    pub fn format(namespace: impl Into<String>, room_id: &RoomId) -> Result<Self, RoomNameError> {
        let namespace = namespace.into();
        if room_id.as_str().is_empty() {
            return Err(RoomNameError::MissingId(namespace));
        }
        if room_id.as_str().contains(ROOM_SEPARATOR) {
            return Err(RoomNameError::SeparatorInId(room_id.to_string()));
        }
        Ok(Self {
            namespace,
            room_id: room_id.clone(),
        })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    #[must_use]
    pub fn into_room_id(self) -> RoomId {
        self.room_id
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.room_id)
        } else {
            write!(f, "{}{ROOM_SEPARATOR}{}", self.namespace, self.room_id)
        }
    }
}

impl FromStr for RoomName {
    type Err = RoomNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One entry of an essentials list as handed to callers.
///
/// `id` is the 1-based position in the list the server sent, as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssentialItem {
    pub id: String,
    pub name: String,
}

impl EssentialItem {
    /// Number a plain list of names in order, starting at 1.
    #[must_use]
    pub fn numbered<I, S>(names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Self {
                id: (index + 1).to_string(),
                name: name.into(),
            })
            .collect()
    }
}
