//! The uniform provider contract every wallet backend is driven through.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use wallet_runtime::{EventHub, HandlerId, Listener, Result, Subscription, Transport};

/// Single request method plus a multi-subscriber event hub.
///
/// Request failures are tagged with the originating method (see
/// [`wallet_runtime::Error::with_method`]).
#[async_trait]
pub trait Provider: Send + Sync {
	async fn request(&self, method: &str, params: Value) -> Result<Value>;

	/// Hub carrying the backend's push events and locally emitted ones.
	fn events(&self) -> &EventHub;

	fn on(&self, event: &str, listener: Listener) -> Subscription {
		self.events().on_listener(event, listener)
	}

	fn remove_listener(&self, event: &str, id: HandlerId) -> bool {
		self.events().remove_listener(event, id)
	}

	/// Delivers `payload` to local listeners. Returns `false` if there were none.
	fn emit(&self, event: &str, payload: &Value) -> bool {
		self.events().emit(event, payload)
	}
}

/// Provider that forwards every call unchanged to one [`Transport`].
///
/// This is the extension's local surface and the gateway's raw remote one.
pub struct RpcProvider<T: Transport> {
	transport: Arc<T>,
}

impl<T: Transport> RpcProvider<T> {
	pub fn new(transport: Arc<T>) -> Self {
		Self { transport }
	}

	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}
}

#[async_trait]
impl<T: Transport + 'static> Provider for RpcProvider<T> {
	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		self.transport
			.send(method, params)
			.await
			.map_err(|e| e.with_method(method))
	}

	fn events(&self) -> &EventHub {
		self.transport.events()
	}

	fn on(&self, event: &str, listener: Listener) -> Subscription {
		self.transport.subscribe(event, listener)
	}
}
