//! JSON-RPC over the in-page channel.
//!
//! Each call posts a [`WindowMessage::Request`] with a fresh UUID and waits
//! for the [`WindowMessage::Response`] carrying the same id. Extension push
//! events ([`WindowMessage::Event`]) are forwarded into the transport's hub.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as TokioMutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use wallet_protocol::{JsonRpcRequest, JsonRpcResponse, WindowMessage};

use crate::channel::InPageChannel;
use crate::error::{Error, Result};
use crate::events::{EventHub, Listener, Subscription};
use crate::transport::Transport;

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<TokioMutex<HashMap<String, oneshot::Sender<Result<Value>>>>>;

/// RAII guard ensuring callback cleanup when a request future is dropped.
struct CancelGuard {
	id: String,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: String, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		let id = std::mem::take(&mut self.id);
		let callbacks = Arc::clone(&self.callbacks);

		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			handle.spawn(async move {
				if callbacks.lock().await.remove(&id).is_some() {
					tracing::debug!(target: "wallet.runtime", id = %id, "CancelGuard: removed orphaned callback");
				}
			});
		}
	}
}

/// Future returned by [`WindowTransport::send`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Transport to the browser extension over an [`InPageChannel`].
///
/// The reader task is started lazily on first use, so constructing the
/// transport performs no I/O. It is aborted when the transport is dropped.
pub struct WindowTransport {
	channel: InPageChannel,
	callbacks: CallbackMap,
	events: EventHub,
	/// Receiver subscribed at construction so no reply can be missed.
	pending_rx: Mutex<Option<broadcast::Receiver<WindowMessage>>>,
	reader: Mutex<Option<JoinHandle<()>>>,
}

impl WindowTransport {
	pub fn new(channel: InPageChannel) -> Self {
		let rx = channel.subscribe();
		Self {
			channel,
			callbacks: Arc::new(TokioMutex::new(HashMap::new())),
			events: EventHub::new(),
			pending_rx: Mutex::new(Some(rx)),
			reader: Mutex::new(None),
		}
	}

	pub fn channel(&self) -> &InPageChannel {
		&self.channel
	}

	fn ensure_reader(&self) {
		let mut reader = self.reader.lock();
		if reader.is_some() {
			return;
		}
		let Some(rx) = self.pending_rx.lock().take() else {
			return;
		};
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				let callbacks = Arc::clone(&self.callbacks);
				let events = self.events.clone();
				*reader = Some(handle.spawn(read_loop(rx, callbacks, events)));
			}
			Err(_) => {
				tracing::warn!(target: "wallet.runtime", "no tokio runtime; window transport reader not started");
				*self.pending_rx.lock() = Some(rx);
			}
		}
	}
}

async fn read_loop(mut rx: broadcast::Receiver<WindowMessage>, callbacks: CallbackMap, events: EventHub) {
	loop {
		match rx.recv().await {
			Ok(message) => dispatch(message, &callbacks, &events).await,
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::warn!(target: "wallet.runtime", skipped, "window transport lagged behind the channel");
			}
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
	tracing::debug!(target: "wallet.runtime", "window transport reader stopped");
}

async fn dispatch(message: WindowMessage, callbacks: &CallbackMap, events: &EventHub) {
	match message {
		WindowMessage::Response { response } => complete(response, callbacks).await,
		WindowMessage::Event { event, payload } => {
			tracing::debug!(target: "wallet.runtime", event, "extension event");
			events.emit(&event, &payload);
		}
		_ => {}
	}
}

async fn complete(response: JsonRpcResponse, callbacks: &CallbackMap) {
	let Some(id) = response.id.as_ref().map(ToString::to_string) else {
		tracing::debug!(target: "wallet.runtime", "response without id (ignored)");
		return;
	};
	let Some(callback) = callbacks.lock().await.remove(&id) else {
		tracing::debug!(target: "wallet.runtime", id = %id, "response for unknown request (ignored)");
		return;
	};
	let _ = callback.send(response.into_result().map_err(Error::from));
}

#[async_trait]
impl Transport for WindowTransport {
	async fn send(&self, method: &str, params: Value) -> Result<Value> {
		self.ensure_reader();

		let id = uuid::Uuid::new_v4().to_string();
		tracing::debug!(target: "wallet.runtime", id = %id, method, "window request");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().await.insert(id.clone(), tx);
		let guard = CancelGuard::new(id.clone(), Arc::clone(&self.callbacks));

		self.channel.post(WindowMessage::Request {
			request: JsonRpcRequest::new(id, method, params),
		});

		ResponseFuture { rx, guard }.await
	}

	fn events(&self) -> &EventHub {
		&self.events
	}

	fn subscribe(&self, event: &str, listener: Listener) -> Subscription {
		self.ensure_reader();
		self.events.on_listener(event, listener)
	}
}

impl Drop for WindowTransport {
	fn drop(&mut self) {
		if let Some(reader) = self.reader.lock().take() {
			reader.abort();
		}
	}
}
