//! Per-room callback sets.
//!
//! Each room domain supplies its own set of named callbacks. Both domains share
//! the `on_ready` / `on_error` base so generic code can reach them through
//! [`CallbackSet`]. Unset slots simply drop the matching events.

use std::sync::Arc;

use roomcast_rpc::EventKind;
use roomcast_types::EssentialItem;
use serde_json::Value;

/// Shared, thread-safe callback
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

fn slot<T>(f: impl Fn(T) + Send + Sync + 'static) -> Option<Callback<T>> {
    Some(Arc::new(f))
}

fn call<T>(callback: Option<&Callback<T>>, value: T) -> bool {
    match callback {
        Some(callback) => {
            callback(value);
            true
        }
        None => false,
    }
}

/// Callbacks for a product lookup room
#[derive(Clone, Default)]
pub struct ProductRoomCallbacks {
    on_update: Option<Callback<Value>>,
    on_error: Option<Callback<Value>>,
    on_similar: Option<Callback<Value>>,
    on_similar_error: Option<Callback<Value>>,
    on_essentials: Option<Callback<Vec<EssentialItem>>>,
    on_essentials_error: Option<Callback<Value>>,
    on_ready: Option<Callback<()>>,
}

impl ProductRoomCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup data changed (`lookup_update`).
    #[must_use]
    pub fn on_update(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_update = slot(f);
        self
    }

    /// Lookup failed (`lookup_update_error`).
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_error = slot(f);
        self
    }

    #[must_use]
    pub fn on_similar(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_similar = slot(f);
        self
    }

    #[must_use]
    pub fn on_similar_error(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_similar_error = slot(f);
        self
    }

    /// Essentials found in the product, already numbered from 1.
    #[must_use]
    pub fn on_essentials(
        mut self,
        f: impl Fn(Vec<EssentialItem>) + Send + Sync + 'static,
    ) -> Self {
        self.on_essentials = slot(f);
        self
    }

    #[must_use]
    pub fn on_essentials_error(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_essentials_error = slot(f);
        self
    }

    /// Server finished setting up the room (`room_ready`).
    #[must_use]
    pub fn on_ready(mut self, f: impl Fn(()) + Send + Sync + 'static) -> Self {
        self.on_ready = slot(f);
        self
    }
}

/// Callbacks for an essential (ingredient) room
#[derive(Clone, Default)]
pub struct EssentialRoomCallbacks {
    on_products: Option<Callback<Value>>,
    on_products_error: Option<Callback<Value>>,
    on_ready: Option<Callback<()>>,
}

impl EssentialRoomCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Top products containing the essential (`e_essential_products`).
    #[must_use]
    pub fn on_products(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_products = slot(f);
        self
    }

    #[must_use]
    pub fn on_products_error(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_products_error = slot(f);
        self
    }

    #[must_use]
    pub fn on_ready(mut self, f: impl Fn(()) + Send + Sync + 'static) -> Self {
        self.on_ready = slot(f);
        self
    }
}

/// Callbacks registered for one room
#[derive(Clone)]
pub enum CallbackSet {
    Product(ProductRoomCallbacks),
    Essential(EssentialRoomCallbacks),
}

impl CallbackSet {
    #[must_use]
    pub fn on_ready(&self) -> Option<&Callback<()>> {
        match self {
            CallbackSet::Product(cb) => cb.on_ready.as_ref(),
            CallbackSet::Essential(cb) => cb.on_ready.as_ref(),
        }
    }

    /// The room's primary error slot.
    #[must_use]
    pub fn on_error(&self) -> Option<&Callback<Value>> {
        match self {
            CallbackSet::Product(cb) => cb.on_error.as_ref(),
            CallbackSet::Essential(cb) => cb.on_products_error.as_ref(),
        }
    }

    /// Whether a callback is registered for events of `kind`.
    #[must_use]
    pub fn handles(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::EssentialsList => {
                matches!(self, CallbackSet::Product(cb) if cb.on_essentials.is_some())
            }
            EventKind::RoomReady => self.on_ready().is_some(),
            _ => self.data_slot(kind).is_some(),
        }
    }

    fn data_slot(&self, kind: EventKind) -> Option<&Callback<Value>> {
        match (self, kind) {
            (CallbackSet::Product(cb), EventKind::DataUpdate) => cb.on_update.as_ref(),
            (CallbackSet::Product(cb), EventKind::DataUpdateError) => cb.on_error.as_ref(),
            (CallbackSet::Product(cb), EventKind::SimilarItems) => cb.on_similar.as_ref(),
            (CallbackSet::Product(cb), EventKind::SimilarItemsError) => {
                cb.on_similar_error.as_ref()
            }
            (CallbackSet::Product(cb), EventKind::EssentialsListError) => {
                cb.on_essentials_error.as_ref()
            }
            (CallbackSet::Essential(cb), EventKind::EssentialProducts) => cb.on_products.as_ref(),
            (CallbackSet::Essential(cb), EventKind::EssentialProductsError) => {
                cb.on_products_error.as_ref()
            }
            _ => None,
        }
    }

    /// Deliver a JSON payload to the slot for `kind`. Returns whether a
    /// callback ran.
    pub(crate) fn deliver_data(&self, kind: EventKind, data: Value) -> bool {
        call(self.data_slot(kind), data)
    }

    pub(crate) fn deliver_essentials(&self, items: Vec<EssentialItem>) -> bool {
        match self {
            CallbackSet::Product(cb) => call(cb.on_essentials.as_ref(), items),
            CallbackSet::Essential(_) => false,
        }
    }

    pub(crate) fn deliver_ready(&self) -> bool {
        call(self.on_ready(), ())
    }
}

impl From<ProductRoomCallbacks> for CallbackSet {
    fn from(callbacks: ProductRoomCallbacks) -> Self {
        CallbackSet::Product(callbacks)
    }
}

impl From<EssentialRoomCallbacks> for CallbackSet {
    fn from(callbacks: EssentialRoomCallbacks) -> Self {
        CallbackSet::Essential(callbacks)
    }
}

impl std::fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handled: Vec<&str> = EventKind::ALL
            .into_iter()
            .filter(|kind| self.handles(*kind))
            .map(EventKind::wire_name)
            .collect();
        let domain = match self {
            CallbackSet::Product(_) => "Product",
            CallbackSet::Essential(_) => "Essential",
        };
        f.debug_struct("CallbackSet")
            .field("domain", &domain)
            .field("handles", &handled)
            .finish()
    }
}
