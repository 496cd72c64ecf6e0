//! Room registry mapping room ids to their callback sets.
//!
//! The registry is shared between the caller-facing join/leave path and the
//! inbound event loop, so every operation is a single atomic map access. At
//! most one callback set exists per room id; registering again replaces it.

use dashmap::DashMap;
use roomcast_types::RoomId;
use tracing::debug;

use crate::callbacks::CallbackSet;

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, CallbackSet>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `callbacks` with `room_id`. Returns `true` if an earlier set
    /// was replaced.
    pub fn register(&self, room_id: RoomId, callbacks: CallbackSet) -> bool {
        debug!("Registering room: {}", room_id);
        self.rooms.insert(room_id, callbacks).is_some()
    }

    /// Drop the callbacks for `room_id`. Returns whether an entry existed.
    pub fn unregister(&self, room_id: &str) -> bool {
        let removed = self.rooms.remove(room_id).is_some();
        if removed {
            debug!("Unregistered room: {}", room_id);
        }
        removed
    }

    /// Snapshot of the callbacks for `room_id`.
    ///
    /// The returned set is a cheap clone, so callers invoke it without holding
    /// any registry lock.
    #[must_use]
    pub fn lookup(&self, room_id: &str) -> Option<CallbackSet> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Ids of all registered rooms, sorted.
    #[must_use]
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{EssentialRoomCallbacks, ProductRoomCallbacks};
    use roomcast_rpc::EventKind;

    #[test]
    fn test_register_and_lookup() {
        let registry = RoomRegistry::new();
        assert!(registry.is_empty());

        let replaced = registry.register(
            RoomId::product("abc123"),
            ProductRoomCallbacks::new().on_update(|_| {}).into(),
        );

        assert!(!replaced);
        assert!(registry.contains("abc123"));
        assert_eq!(registry.len(), 1);
        let callbacks = registry.lookup("abc123").unwrap();
        assert!(callbacks.handles(EventKind::DataUpdate));
    }

    #[test]
    fn test_register_replaces_previous_set() {
        let registry = RoomRegistry::new();
        registry.register(
            RoomId::product("abc123"),
            ProductRoomCallbacks::new().on_update(|_| {}).into(),
        );

        let replaced = registry.register(
            RoomId::product("abc123"),
            ProductRoomCallbacks::new().on_similar(|_| {}).into(),
        );

        assert!(replaced);
        assert_eq!(registry.len(), 1);
        let callbacks = registry.lookup("abc123").unwrap();
        assert!(!callbacks.handles(EventKind::DataUpdate));
        assert!(callbacks.handles(EventKind::SimilarItems));
    }

    #[test]
    fn test_unregister() {
        let registry = RoomRegistry::new();
        registry.register(RoomId::essential("Zinc"), EssentialRoomCallbacks::new().into());

        assert!(registry.unregister("e_Zinc"));
        assert!(!registry.contains("e_Zinc"));
        assert!(registry.lookup("e_Zinc").is_none());
        assert!(!registry.unregister("e_Zinc"));
    }

    #[test]
    fn test_unregister_unknown_room_is_noop() {
        let registry = RoomRegistry::new();
        registry.register(RoomId::product("keep"), ProductRoomCallbacks::new().into());

        assert!(!registry.unregister("never-registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_product_and_essential_ids_do_not_collide() {
        let registry = RoomRegistry::new();
        registry.register(RoomId::product("Zinc"), ProductRoomCallbacks::new().into());
        registry.register(RoomId::essential("Zinc"), EssentialRoomCallbacks::new().into());

        assert_eq!(registry.len(), 2);
        assert!(matches!(
            registry.lookup("Zinc"),
            Some(CallbackSet::Product(_))
        ));
        assert!(matches!(
            registry.lookup("e_Zinc"),
            Some(CallbackSet::Essential(_))
        ));
    }

    #[test]
    fn test_room_ids_sorted_and_clear() {
        let registry = RoomRegistry::new();
        for id in ["b", "a", "c"] {
            registry.register(RoomId::product(id), ProductRoomCallbacks::new().into());
        }

        assert_eq!(
            registry.room_ids(),
            vec![RoomId::new("a"), RoomId::new("b"), RoomId::new("c")]
        );

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.room_ids().is_empty());
    }
}
