//! Discovery registry: adapter set, detection, restoration, and the single
//! active session.
//!
//! ```text
//! Uninitialized ──init()──▶ Detecting ──▶ Idle ◀──disconnect()── Connected
//!                                          │                        ▲
//!                                          └───────connect()────────┘
//! ```
//!
//! The registry is the only writer of the active session. Lifecycle
//! operations (`init`, `connect`, `disconnect`) are serialized, so at most one
//! session exists at any observation point.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Value, json};
use wallet_protocol::{ConnectionInfo, events, methods};
use wallet_runtime::{Error, EventHub, Listener, Result, Subscription};

use crate::adapter::{Adapter, WalletId, WalletInfo};
use crate::bridge::connection_of;
use crate::picker::{WalletChoice, WalletPicker, WalletPickerEntry};
use crate::provider::Provider;
use crate::session::{DiscoveryPointer, SessionStore};

/// Registry-level lifecycle events.
pub mod client_events {
	pub const CONNECTED: &str = "discovery:connected";
	pub const DISCONNECTED: &str = "discovery:disconnected";
	pub const ERROR: &str = "discovery:error";
}

/// Upper bound on the best-effort remote `disconnect`.
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds an adapter for a gateway URL the user typed into the picker.
pub type GatewayFactory = Arc<dyn Fn(&str, &str) -> Result<Arc<dyn Adapter>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
	Uninitialized,
	Detecting,
	Idle,
	Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detection {
	Unknown,
	Available,
	Unavailable,
}

struct Registered {
	adapter: Arc<dyn Adapter>,
	detection: Detection,
}

/// The chosen adapter and the provider built from it.
#[derive(Clone)]
pub struct ActiveSession {
	pub wallet_id: WalletId,
	pub adapter: Arc<dyn Adapter>,
	pub provider: Arc<dyn Provider>,
	/// What the wallet answered to `connect`. `None` for a restored session.
	pub connection: Option<ConnectionInfo>,
}

impl ActiveSession {
	pub fn info(&self) -> WalletInfo {
		self.adapter.info()
	}
}

impl std::fmt::Debug for ActiveSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActiveSession").field("wallet_id", &self.wallet_id).finish()
	}
}

struct Inner {
	state: DiscoveryState,
	adapters: IndexMap<WalletId, Registered>,
	active: Option<ActiveSession>,
	/// Watches the active provider for an observed disconnect.
	watcher: Option<Subscription>,
}

pub struct DiscoveryClient {
	inner: Arc<Mutex<Inner>>,
	lifecycle: tokio::sync::Mutex<()>,
	store: SessionStore,
	events: EventHub,
	picker: Option<Arc<dyn WalletPicker>>,
	gateway_factory: Option<GatewayFactory>,
	disconnect_timeout: Duration,
}

impl DiscoveryClient {
	pub fn new(store: SessionStore) -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				state: DiscoveryState::Uninitialized,
				adapters: IndexMap::new(),
				active: None,
				watcher: None,
			})),
			lifecycle: tokio::sync::Mutex::new(()),
			store,
			events: EventHub::new(),
			picker: None,
			gateway_factory: None,
			disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
		}
	}

	pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
		self.disconnect_timeout = timeout;
		self
	}

	pub fn with_picker(mut self, picker: Arc<dyn WalletPicker>) -> Self {
		self.picker = Some(picker);
		self
	}

	pub fn with_gateway_factory(mut self, factory: GatewayFactory) -> Self {
		self.gateway_factory = Some(factory);
		self
	}

	/// Adds `adapter`, replacing any adapter registered under the same id.
	///
	/// A replaced adapter keeps its registration position. An active session
	/// built from the old instance is unaffected.
	pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) {
		let id = adapter.id();
		let mut inner = self.inner.lock();
		let replaced = inner
			.adapters
			.insert(
				id.clone(),
				Registered {
					adapter,
					detection: Detection::Unknown,
				},
			)
			.is_some();
		tracing::debug!(target: "wallet.discovery", wallet_id = %id, replaced, "adapter registered");
	}

	pub fn state(&self) -> DiscoveryState {
		self.inner.lock().state
	}

	pub fn store(&self) -> &SessionStore {
		&self.store
	}

	/// Registry-level event hub (see [`client_events`]).
	pub fn events(&self) -> &EventHub {
		&self.events
	}

	pub fn on(&self, event: &str, listener: Listener) -> Subscription {
		self.events.on_listener(event, listener)
	}

	/// Every registered adapter, in registration order.
	pub fn list_adapters(&self) -> Vec<WalletInfo> {
		self.inner.lock().adapters.values().map(|r| r.adapter.info()).collect()
	}

	/// Adapters not known to be unavailable, in registration order.
	pub fn list_wallets(&self) -> Vec<WalletInfo> {
		self.inner
			.lock()
			.adapters
			.values()
			.filter(|r| r.detection != Detection::Unavailable)
			.map(|r| r.adapter.info())
			.collect()
	}

	pub fn active_session(&self) -> Option<ActiveSession> {
		self.inner.lock().active.clone()
	}

	/// The active provider, or [`Error::NotConnected`].
	pub fn provider(&self) -> Result<Arc<dyn Provider>> {
		self.active_session()
			.map(|session| session.provider)
			.ok_or(Error::NotConnected)
	}

	/// Detects every adapter, then tries to restore the persisted session.
	///
	/// Never fails because of an adapter: detection and restoration problems
	/// are logged and read as "unavailable" / "nothing restored". Calling it
	/// again after it completed is a no-op.
	pub async fn init(&self) -> Result<()> {
		let _lifecycle = self.lifecycle.lock().await;
		let adapters: Vec<(WalletId, Arc<dyn Adapter>)> = {
			let mut inner = self.inner.lock();
			if inner.state != DiscoveryState::Uninitialized {
				return Ok(());
			}
			inner.state = DiscoveryState::Detecting;
			inner
				.adapters
				.iter()
				.map(|(id, r)| (id.clone(), Arc::clone(&r.adapter)))
				.collect()
		};

		let detections = join_all(adapters.iter().map(|(id, adapter)| async move {
			let available = adapter.detect().await;
			tracing::debug!(target: "wallet.discovery", wallet_id = %id, available, "detection finished");
			(id.clone(), available)
		}))
		.await;

		{
			let mut inner = self.inner.lock();
			for (id, available) in &detections {
				if let Some(registered) = inner.adapters.get_mut(id) {
					registered.detection = if *available {
						Detection::Available
					} else {
						Detection::Unavailable
					};
				}
			}
		}

		if self.store.discovery().is_some() {
			let restored = self.restore_first(&adapters, &detections).await;
			match restored {
				Some((id, adapter, provider)) => {
					tracing::info!(target: "wallet.discovery", wallet_id = %id, "session restored");
					self.activate(id, adapter, provider, None);
				}
				None => {
					tracing::debug!(target: "wallet.discovery", "nothing restored; clearing persisted session");
					self.store.clear();
				}
			}
		}

		let mut inner = self.inner.lock();
		if inner.state == DiscoveryState::Detecting {
			inner.state = DiscoveryState::Idle;
		}
		Ok(())
	}

	async fn restore_first(
		&self,
		adapters: &[(WalletId, Arc<dyn Adapter>)],
		detections: &[(WalletId, bool)],
	) -> Option<(WalletId, Arc<dyn Adapter>, Arc<dyn Provider>)> {
		for ((id, adapter), (_, available)) in adapters.iter().zip(detections) {
			if !*available || !adapter.can_restore() {
				continue;
			}
			match adapter.restore().await {
				Ok(Some(provider)) => return Some((id.clone(), Arc::clone(adapter), provider)),
				Ok(None) => {}
				Err(e) => {
					tracing::warn!(target: "wallet.discovery", wallet_id = %id, error = %e, "restore failed");
				}
			}
		}
		None
	}

	/// Connects to the adapter registered as `wallet_id`.
	pub async fn connect(&self, wallet_id: &str) -> Result<ActiveSession> {
		let _lifecycle = self.lifecycle.lock().await;

		let adapter = {
			let inner = self.inner.lock();
			match inner.state {
				DiscoveryState::Uninitialized | DiscoveryState::Detecting => return Err(Error::NotInitialized),
				_ => {}
			}
			if let Some(active) = &inner.active {
				return Err(Error::AlreadyConnected(active.wallet_id.clone()));
			}
			inner.adapters.get(wallet_id).map(|r| Arc::clone(&r.adapter))
		};
		let Some(adapter) = adapter else {
			let err = Error::UnknownAdapter(wallet_id.to_string());
			self.emit_error(&err);
			return Err(err);
		};

		tracing::info!(target: "wallet.discovery", wallet_id, "connecting");
		let outcome = match adapter.create_provider() {
			Ok(provider) => establish(wallet_id, provider.as_ref())
				.await
				.map(|connection| (provider, connection)),
			Err(e) => Err(e),
		};

		match outcome {
			Ok((provider, connection)) => {
				let info = adapter.info();
				self.store.set_discovery(&DiscoveryPointer {
					wallet_id: info.id.clone(),
					kind: info.kind,
					url: info.url.clone(),
				});
				let session = self.activate(wallet_id.to_string(), adapter, provider, Some(connection));
				tracing::info!(target: "wallet.discovery", wallet_id, "connected");
				Ok(session)
			}
			Err(e) => {
				tracing::warn!(target: "wallet.discovery", wallet_id, error = %e, "connect failed");
				adapter.teardown();
				self.emit_error(&e);
				Err(e)
			}
		}
	}

	/// Lets the picker choose, registering a custom gateway on the fly.
	pub async fn connect_with_picker(&self) -> Result<ActiveSession> {
		let picker = self
			.picker
			.clone()
			.ok_or_else(|| Error::InvalidArgument("no wallet picker configured".into()))?;

		let entries: Vec<WalletPickerEntry> = self.list_wallets().into_iter().map(Into::into).collect();
		let choice = picker.pick(entries).await?.ok_or(Error::PickerCancelled)?;

		let wallet_id = match choice {
			WalletChoice::Registered(id) => id,
			WalletChoice::CustomGateway { name, rpc_url } => {
				let id = crate::adapter::gateway_wallet_id(&rpc_url);
				let known = self.inner.lock().adapters.contains_key(&id);
				if !known {
					let factory = self
						.gateway_factory
						.as_ref()
						.ok_or_else(|| Error::UnknownAdapter(id.clone()))?;
					let adapter = factory(&name, &rpc_url)?;
					tracing::info!(target: "wallet.discovery", url = %rpc_url, "registering custom gateway");
					self.register_adapter(adapter);
				}
				id
			}
		};

		self.connect(&wallet_id).await
	}

	/// Ends the active session. A no-op when there is none.
	///
	/// The remote `disconnect` is best-effort and bounded by the disconnect
	/// timeout; local state is cleared whatever its outcome.
	pub async fn disconnect(&self) -> Result<()> {
		let _lifecycle = self.lifecycle.lock().await;

		let (active, watcher) = {
			let mut inner = self.inner.lock();
			let Some(active) = inner.active.take() else {
				return Ok(());
			};
			inner.state = DiscoveryState::Idle;
			(active, inner.watcher.take())
		};
		drop(watcher);

		let remote = tokio::time::timeout(
			self.disconnect_timeout,
			active.provider.request(methods::DISCONNECT, Value::Null),
		)
		.await;
		match remote {
			Ok(Ok(_)) => {}
			Ok(Err(e)) => {
				tracing::warn!(target: "wallet.discovery", wallet_id = %active.wallet_id, error = %e, "remote disconnect failed");
			}
			Err(_) => {
				tracing::warn!(
					target: "wallet.discovery",
					wallet_id = %active.wallet_id,
					timeout_ms = self.disconnect_timeout.as_millis() as u64,
					"remote disconnect timed out"
				);
			}
		}

		active.adapter.teardown();
		self.store.clear();
		tracing::info!(target: "wallet.discovery", wallet_id = %active.wallet_id, "disconnected");
		self.events
			.emit(client_events::DISCONNECTED, &json!({"walletId": active.wallet_id}));
		Ok(())
	}

	fn activate(
		&self,
		wallet_id: WalletId,
		adapter: Arc<dyn Adapter>,
		provider: Arc<dyn Provider>,
		connection: Option<ConnectionInfo>,
	) -> ActiveSession {
		let session = ActiveSession {
			wallet_id: wallet_id.clone(),
			adapter,
			provider: Arc::clone(&provider),
			connection,
		};
		let watcher = provider.on(
			events::STATUS_CHANGED,
			disconnect_watcher(
				Arc::downgrade(&self.inner),
				wallet_id.clone(),
				self.store.clone(),
				self.events.clone(),
			),
		);
		{
			let mut inner = self.inner.lock();
			inner.active = Some(session.clone());
			inner.watcher = Some(watcher);
			inner.state = DiscoveryState::Connected;
		}
		self.events.emit(client_events::CONNECTED, &json!({"walletId": wallet_id}));
		session
	}

	fn emit_error(&self, error: &Error) {
		self.events.emit(
			client_events::ERROR,
			&json!({"code": error.kind().as_str(), "message": error.to_string()}),
		);
	}
}

/// Sends `connect` and insists on an established connection.
///
/// Accepts either a bare connection or a status-like object carrying one.
async fn establish(wallet_id: &str, provider: &dyn Provider) -> Result<ConnectionInfo> {
	let value = provider.request(methods::CONNECT, Value::Null).await?;
	let connection = match connection_of(&value) {
		Some(connection) => connection,
		None => serde_json::from_value(value).map_err(|e| Error::from(e).with_method(methods::CONNECT))?,
	};
	if !connection.is_connected {
		return Err(Error::ConnectionRefused {
			wallet_id: wallet_id.to_string(),
			reason: connection.reason,
		});
	}
	Ok(connection)
}

/// Clears the active session when its provider reports a disconnect.
fn disconnect_watcher(inner: Weak<Mutex<Inner>>, wallet_id: WalletId, store: SessionStore, events: EventHub) -> Listener {
	Arc::new(move |payload: &Value| {
		if connection_of(payload).is_none_or(|c| c.is_connected) {
			return;
		}
		let Some(inner) = inner.upgrade() else {
			return;
		};
		let (active, watcher) = {
			let mut inner = inner.lock();
			match &inner.active {
				Some(active) if active.wallet_id == wallet_id => {}
				_ => return,
			}
			inner.state = DiscoveryState::Idle;
			(inner.active.take(), inner.watcher.take())
		};
		drop(watcher);
		if let Some(active) = active {
			tracing::info!(target: "wallet.discovery", wallet_id = %active.wallet_id, "wallet reported disconnect");
			active.adapter.teardown();
			store.clear();
			events.emit(client_events::DISCONNECTED, &json!({"walletId": active.wallet_id}));
		}
	})
}

impl std::fmt::Debug for DiscoveryClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("DiscoveryClient")
			.field("state", &inner.state)
			.field("adapters", &inner.adapters.keys().collect::<Vec<_>>())
			.field("active", &inner.active.as_ref().map(|a| &a.wallet_id))
			.finish()
	}
}
