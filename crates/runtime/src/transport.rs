//! Transport abstraction shared by the in-page and HTTP channels.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::events::{EventHub, Listener, Subscription};

/// Bidirectional channel to one wallet backend.
///
/// `send` performs one JSON-RPC round trip. Push events from the backend are
/// delivered to listeners registered through [`Transport::subscribe`].
#[async_trait]
pub trait Transport: Send + Sync {
	/// Issues `method` with `params` and resolves with the `result` member.
	async fn send(&self, method: &str, params: Value) -> Result<Value>;

	/// Hub receiving the backend's push events.
	fn events(&self) -> &EventHub;

	fn subscribe(&self, event: &str, listener: Listener) -> Subscription {
		self.events().on_listener(event, listener)
	}
}
