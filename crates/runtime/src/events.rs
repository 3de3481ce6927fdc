//! Named-event hub shared by transports and providers.
//!
//! Listeners are stored per event name in an [`IndexMap`] keyed by
//! [`HandlerId`], which gives insertion-order delivery and O(1) removal.
//! [`EventHub::on`] returns a [`Subscription`] that removes the listener
//! when dropped, so callers never depend on closure identity for removal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Unique identifier for event listeners.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Event listener. Runs to completion before the next listener is called.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

type ListenerMap = HashMap<String, IndexMap<HandlerId, Listener>>;

/// Multi-subscriber hub keyed by event name.
///
/// Cloning yields another handle to the same listener table.
#[derive(Clone, Default)]
pub struct EventHub {
	listeners: Arc<Mutex<ListenerMap>>,
}

impl EventHub {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `listener` for `event`.
	pub fn on<F>(&self, event: &str, listener: F) -> Subscription
	where
		F: Fn(&Value) + Send + Sync + 'static,
	{
		self.on_listener(event, Arc::new(listener))
	}

	/// Registers an already shared listener.
	pub fn on_listener(&self, event: &str, listener: Listener) -> Subscription {
		let id = next_handler_id();
		self.listeners
			.lock()
			.entry(event.to_string())
			.or_default()
			.insert(id, listener);
		Subscription::from_hub(id, event, &self.listeners)
	}

	/// Removes a listener by id. Returns `true` if it was registered.
	pub fn remove_listener(&self, event: &str, id: HandlerId) -> bool {
		remove_from(&self.listeners, event, id)
	}

	/// Delivers `payload` to every listener of `event` in subscription order.
	///
	/// The listener list is snapshotted first: listeners added while this call
	/// runs are not invoked for it, and listeners removed while it runs are
	/// still invoked this time. Returns `false` when nobody was listening.
	pub fn emit(&self, event: &str, payload: &Value) -> bool {
		let snapshot: Vec<(HandlerId, Listener)> = {
			let listeners = self.listeners.lock();
			match listeners.get(event) {
				Some(map) => map.iter().map(|(id, l)| (*id, Arc::clone(l))).collect(),
				None => return false,
			}
		};

		if snapshot.is_empty() {
			return false;
		}

		tracing::trace!(target: "wallet.events", event, listeners = snapshot.len(), "emit");
		for (_id, listener) in snapshot {
			listener(payload);
		}
		true
	}

	pub fn listener_count(&self, event: &str) -> usize {
		self.listeners.lock().get(event).map_or(0, IndexMap::len)
	}

	/// Drops every listener of every event.
	pub fn clear(&self) {
		self.listeners.lock().clear();
	}
}

impl std::fmt::Debug for EventHub {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let listeners = self.listeners.lock();
		let mut map = f.debug_map();
		for (event, handlers) in listeners.iter() {
			map.entry(event, &handlers.len());
		}
		map.finish()
	}
}

fn remove_from(listeners: &Mutex<ListenerMap>, event: &str, id: HandlerId) -> bool {
	let mut listeners = listeners.lock();
	let Some(map) = listeners.get_mut(event) else {
		return false;
	};
	let removed = map.shift_remove(&id).is_some();
	if map.is_empty() {
		listeners.remove(event);
	}
	removed
}

/// RAII handle that unregisters a listener on drop.
///
/// Holds a weak reference to the hub, so dropping after the hub is gone is
/// a no-op.
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
	id: HandlerId,
	dropper: Option<Arc<dyn Fn(HandlerId) + Send + Sync>>,
}

impl Subscription {
	/// Creates a subscription with a custom dropper function.
	pub fn new(id: HandlerId, dropper: Arc<dyn Fn(HandlerId) + Send + Sync>) -> Self {
		Self {
			id,
			dropper: Some(dropper),
		}
	}

	fn from_hub(id: HandlerId, event: &str, listeners: &Arc<Mutex<ListenerMap>>) -> Self {
		let weak: Weak<Mutex<ListenerMap>> = Arc::downgrade(listeners);
		let event = event.to_string();
		let dropper = Arc::new(move |id: HandlerId| {
			if let Some(listeners) = weak.upgrade() {
				remove_from(&listeners, &event, id);
			}
		});
		Self::new(id, dropper)
	}

	/// Returns this subscription's handler ID.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}

	/// Keeps the listener registered for the lifetime of the hub.
	///
	/// It can still be removed with [`EventHub::remove_listener`].
	pub fn detach(mut self) -> HandlerId {
		self.dropper = None;
		self.id
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}
