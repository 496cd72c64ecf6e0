//! Test fixtures and helpers

use std::sync::Arc;

use parking_lot::Mutex;
use roomcast_rpc::{EventKind, Frame};
use serde_json::{Value, json};

use crate::callbacks::{EssentialRoomCallbacks, ProductRoomCallbacks};
use crate::config::ClientConfig;
use crate::credentials::MemoryTokenStore;
use crate::session::RoomClient;

/// Records `(slot, payload)` pairs in delivery order
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self, slot: &str) -> impl Fn(Value) + Send + Sync + 'static {
        let events = self.events.clone();
        let slot = slot.to_string();
        move |value| events.lock().push((slot.clone(), value))
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }

    pub fn slots(&self) -> Vec<String> {
        self.events.lock().iter().map(|(slot, _)| slot.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Product callbacks with every slot recording into `recorder`
pub fn recording_product_callbacks(recorder: &Recorder) -> ProductRoomCallbacks {
    let essentials = recorder.sink("on_essentials");
    let ready = recorder.sink("on_ready");
    ProductRoomCallbacks::new()
        .on_update(recorder.sink("on_update"))
        .on_error(recorder.sink("on_error"))
        .on_similar(recorder.sink("on_similar"))
        .on_similar_error(recorder.sink("on_similar_error"))
        .on_essentials(move |items| essentials(serde_json::to_value(items).unwrap_or_default()))
        .on_essentials_error(recorder.sink("on_essentials_error"))
        .on_ready(move |()| ready(Value::Null))
}

/// Essential callbacks with every slot recording into `recorder`
pub fn recording_essential_callbacks(recorder: &Recorder) -> EssentialRoomCallbacks {
    let ready = recorder.sink("on_ready");
    EssentialRoomCallbacks::new()
        .on_products(recorder.sink("on_products"))
        .on_products_error(recorder.sink("on_products_error"))
        .on_ready(move |()| ready(Value::Null))
}

/// Build an inbound room frame as the server sends it
pub fn room_frame(kind: EventKind, room: &str, data: Value) -> Frame {
    Frame::new(kind.wire_name(), json!({"room": room, "data": data}))
}

/// Client pointed at an endpoint nothing listens on
pub fn offline_client(token: Option<&str>) -> RoomClient {
    let store = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    };
    let config = ClientConfig::default()
        .with_endpoint("unix:/nonexistent/roomcast-test.sock".parse().unwrap());
    RoomClient::new(&config, Arc::new(store))
}
