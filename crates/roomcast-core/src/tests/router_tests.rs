//! Tests for routing inbound room events
//!
//! Covers:
//! - Room id extraction from composite room names
//! - Isolation between rooms and between product/essential domains
//! - The essentials list transform
//! - Dropping events for unknown rooms, missing slots and bad payloads

use std::sync::Arc;

use roomcast_rpc::{EventKind, Frame};
use roomcast_types::RoomId;
use serde_json::json;

use super::fixtures::{Recorder, recording_essential_callbacks, recording_product_callbacks, room_frame};
use crate::callbacks::ProductRoomCallbacks;
use crate::registry::RoomRegistry;
use crate::router::{EventRouter, RouteOutcome};

fn router_with_registry() -> (EventRouter, Arc<RoomRegistry>) {
    let registry = Arc::new(RoomRegistry::new());
    (EventRouter::new(registry.clone()), registry)
}

#[test]
fn test_room_id_is_suffix_after_last_separator() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(
        RoomId::product("abc123"),
        recording_product_callbacks(&recorder).into(),
    );

    let outcome = router.route_frame(room_frame(
        EventKind::DataUpdate,
        "products-user42-abc123",
        json!({"score": 7}),
    ));

    assert_eq!(outcome, RouteOutcome::Delivered);
    assert_eq!(
        recorder.events(),
        vec![("on_update".to_string(), json!({"score": 7}))]
    );
}

#[test]
fn test_bare_room_name_routes_to_same_id() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(
        RoomId::product("abc123"),
        recording_product_callbacks(&recorder).into(),
    );

    let outcome = router.route_frame(room_frame(EventKind::SimilarItems, "abc123", json!([1])));

    assert_eq!(outcome, RouteOutcome::Delivered);
    assert_eq!(recorder.slots(), vec!["on_similar"]);
}

#[test]
fn test_events_are_isolated_between_rooms() {
    let (router, registry) = router_with_registry();
    let first = Recorder::new();
    let second = Recorder::new();
    registry.register(RoomId::product("aaa"), recording_product_callbacks(&first).into());
    registry.register(RoomId::product("bbb"), recording_product_callbacks(&second).into());

    router.route_frame(room_frame(EventKind::DataUpdate, "u1-aaa", json!("for a")));
    router.route_frame(room_frame(EventKind::DataUpdateError, "u1-bbb", json!("for b")));

    assert_eq!(first.events(), vec![("on_update".to_string(), json!("for a"))]);
    assert_eq!(second.events(), vec![("on_error".to_string(), json!("for b"))]);
}

#[test]
fn test_every_product_event_reaches_its_slot() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(RoomId::product("p1"), recording_product_callbacks(&recorder).into());

    for kind in [
        EventKind::DataUpdate,
        EventKind::DataUpdateError,
        EventKind::SimilarItems,
        EventKind::SimilarItemsError,
        EventKind::EssentialsListError,
        EventKind::RoomReady,
    ] {
        assert_eq!(
            router.route_frame(room_frame(kind, "u-p1", json!({}))),
            RouteOutcome::Delivered,
            "{kind} should be delivered"
        );
    }

    assert_eq!(
        recorder.slots(),
        vec![
            "on_update",
            "on_error",
            "on_similar",
            "on_similar_error",
            "on_essentials_error",
            "on_ready",
        ]
    );
}

#[test]
fn test_essentials_are_numbered_from_one() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(RoomId::product("p1"), recording_product_callbacks(&recorder).into());

    let outcome = router.route_frame(room_frame(
        EventKind::EssentialsList,
        "u-p1",
        json!({"essentials": ["Zinc", "Vitamin C"]}),
    ));

    assert_eq!(outcome, RouteOutcome::Delivered);
    assert_eq!(
        recorder.events(),
        vec![(
            "on_essentials".to_string(),
            json!([{"id": "1", "name": "Zinc"}, {"id": "2", "name": "Vitamin C"}])
        )]
    );
}

#[test]
fn test_empty_essentials_list() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(RoomId::product("p1"), recording_product_callbacks(&recorder).into());

    router.route_frame(room_frame(
        EventKind::EssentialsList,
        "u-p1",
        json!({"essentials": []}),
    ));

    assert_eq!(recorder.events(), vec![("on_essentials".to_string(), json!([]))]);
}

#[test]
fn test_malformed_essentials_dropped() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(RoomId::product("p1"), recording_product_callbacks(&recorder).into());

    let outcome = router.route_frame(room_frame(
        EventKind::EssentialsList,
        "u-p1",
        json!({"essentials": "Zinc"}),
    ));

    assert_eq!(outcome, RouteOutcome::Malformed);
    assert!(recorder.is_empty());
}

#[test]
fn test_essential_room_routing() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(
        RoomId::essential("Zinc"),
        recording_essential_callbacks(&recorder).into(),
    );

    router.route_frame(room_frame(
        EventKind::EssentialProducts,
        "user42-e_Zinc",
        json!([{"name": "Zinc Picolinate"}]),
    ));
    router.route_frame(room_frame(EventKind::RoomReady, "user42-e_Zinc", json!(null)));
    router.route_frame(room_frame(
        EventKind::EssentialProductsError,
        "user42-e_Zinc",
        json!({"message": "none"}),
    ));

    assert_eq!(
        recorder.slots(),
        vec!["on_products", "on_ready", "on_products_error"]
    );
}

#[test]
fn test_product_event_for_essential_room_has_no_handler() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(
        RoomId::essential("Zinc"),
        recording_essential_callbacks(&recorder).into(),
    );

    let outcome = router.route_frame(room_frame(EventKind::DataUpdate, "u-e_Zinc", json!({})));

    assert_eq!(outcome, RouteOutcome::NoHandler);
    assert!(recorder.is_empty());
}

#[test]
fn test_missing_slot_is_dropped() {
    let (router, registry) = router_with_registry();
    registry.register(
        RoomId::product("p1"),
        ProductRoomCallbacks::new().on_update(|_| {}).into(),
    );

    assert_eq!(
        router.route_frame(room_frame(EventKind::SimilarItems, "u-p1", json!([]))),
        RouteOutcome::NoHandler
    );
}

#[test]
fn test_unknown_room_is_dropped() {
    let (router, _registry) = router_with_registry();
    assert_eq!(
        router.route_frame(room_frame(EventKind::DataUpdate, "u-ghost", json!({}))),
        RouteOutcome::NoSubscriber
    );
}

#[test]
fn test_no_delivery_after_unregister() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(RoomId::product("p1"), recording_product_callbacks(&recorder).into());
    registry.unregister("p1");

    assert_eq!(
        router.route_frame(room_frame(EventKind::DataUpdate, "u-p1", json!({}))),
        RouteOutcome::NoSubscriber
    );
    assert!(recorder.is_empty());
}

#[test]
fn test_bad_room_names_are_malformed() {
    let (router, _registry) = router_with_registry();
    assert_eq!(
        router.route_frame(room_frame(EventKind::DataUpdate, "", json!({}))),
        RouteOutcome::Malformed
    );
    assert_eq!(
        router.route_frame(room_frame(EventKind::DataUpdate, "user42-", json!({}))),
        RouteOutcome::Malformed
    );
}

#[test]
fn test_room_ready_without_data() {
    let (router, registry) = router_with_registry();
    let recorder = Recorder::new();
    registry.register(RoomId::product("p1"), recording_product_callbacks(&recorder).into());

    let outcome = router.route_frame(Frame::new("room_ready", json!({"room": "u-p1"})));

    assert_eq!(outcome, RouteOutcome::Delivered);
    assert_eq!(recorder.slots(), vec!["on_ready"]);
}

#[test]
fn test_callback_may_leave_its_own_room() {
    let (router, registry) = router_with_registry();
    let inner_registry = registry.clone();
    registry.register(
        RoomId::product("p1"),
        ProductRoomCallbacks::new()
            .on_update(move |_| {
                inner_registry.unregister("p1");
            })
            .into(),
    );

    assert_eq!(
        router.route_frame(room_frame(EventKind::DataUpdate, "u-p1", json!({}))),
        RouteOutcome::Delivered
    );
    assert!(!registry.contains("p1"));
}
