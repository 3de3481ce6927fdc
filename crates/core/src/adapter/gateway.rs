use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use wallet_protocol::{Session, WindowMessage, events, methods};
use wallet_runtime::{HttpTransport, InPageChannel, Result, Subscription};

use super::{Adapter, WalletId, WalletInfo, WalletKind};
use crate::bridge::{BridgeController, SessionHook, connection_of, session_of};
use crate::config::Timeouts;
use crate::popup::PopupController;
use crate::provider::{Provider, RpcProvider};
use crate::session::{SessionStore, StoredSession};

type RemoteProvider = RpcProvider<HttpTransport>;

/// Wallet id of the gateway at `rpc_url`.
pub fn gateway_wallet_id(rpc_url: &str) -> WalletId {
	format!("gateway:{rpc_url}")
}

/// Adapter for a remotely hosted wallet gateway.
///
/// Detection is unconditionally true; an unreachable gateway surfaces at
/// connect time. The provider is a [`BridgeController`] over an
/// [`HttpTransport`], plus two listeners that keep the session store in step
/// with the gateway:
///
/// - `statusChanged` persists a connected session and clears state on disconnect
/// - the in-page channel delivers the popup's login approval and logout
pub struct GatewayAdapter {
	info: WalletInfo,
	rpc_url: String,
	store: SessionStore,
	channel: InPageChannel,
	popup: Arc<PopupController>,
	timeouts: Timeouts,
	link: Mutex<Option<GatewayLink>>,
}

/// Listeners tied to the most recently built provider.
struct GatewayLink {
	transport: Weak<HttpTransport>,
	_status: Subscription,
	approvals: Option<JoinHandle<()>>,
}

impl Drop for GatewayLink {
	fn drop(&mut self) {
		if let Some(task) = self.approvals.take() {
			task.abort();
		}
		if let Some(transport) = self.transport.upgrade() {
			transport.close_events();
		}
	}
}

struct GatewayParts {
	transport: Arc<HttpTransport>,
	remote: Arc<RemoteProvider>,
	bridge: Arc<BridgeController>,
}

impl GatewayAdapter {
	pub fn new(
		name: impl Into<String>,
		rpc_url: impl Into<String>,
		store: SessionStore,
		channel: InPageChannel,
		popup: Arc<PopupController>,
		timeouts: Timeouts,
	) -> Self {
		let rpc_url = rpc_url.into();
		Self {
			info: WalletInfo {
				id: gateway_wallet_id(&rpc_url),
				name: name.into(),
				kind: WalletKind::Gateway,
				icon: None,
				description: None,
				url: Some(rpc_url.clone()),
			},
			rpc_url,
			store,
			channel,
			popup,
			timeouts,
			link: Mutex::new(None),
		}
	}

	pub fn with_icon(mut self, icon: Option<String>) -> Self {
		self.info.icon = icon;
		self
	}

	pub fn with_description(mut self, description: Option<String>) -> Self {
		self.info.description = description;
		self
	}

	pub fn rpc_url(&self) -> &str {
		&self.rpc_url
	}

	fn build(&self) -> Result<GatewayParts> {
		let transport = Arc::new(HttpTransport::new(&self.rpc_url)?);
		let remote = Arc::new(RpcProvider::new(Arc::clone(&transport)));

		let bridge = BridgeController::new(remote.clone(), Arc::clone(&self.popup))
			.with_timeouts(&self.timeouts)
			.with_session_hook(session_hook(Arc::downgrade(&transport), self.store.clone()));

		let status = remote.on(
			events::STATUS_CHANGED,
			status_listener(Arc::downgrade(&transport), self.store.clone(), Arc::clone(&self.popup)),
		);

		let approvals = match tokio::runtime::Handle::try_current() {
			Ok(handle) => Some(handle.spawn(watch_approvals(
				self.channel.subscribe(),
				Arc::downgrade(&remote),
				self.store.clone(),
				Arc::clone(&self.popup),
			))),
			Err(_) => {
				tracing::warn!(target: "wallet.discovery", "no tokio runtime; gateway login approvals not watched");
				None
			}
		};

		*self.link.lock() = Some(GatewayLink {
			transport: Arc::downgrade(&transport),
			_status: status,
			approvals,
		});

		Ok(GatewayParts {
			transport,
			remote,
			bridge: Arc::new(bridge),
		})
	}

	fn release_link(&self) {
		self.link.lock().take();
	}
}

fn persist_session(store: &SessionStore, session: &Session, user_url: Option<&str>) {
	let user_url = user_url
		.map(str::to_string)
		.or_else(|| store.session().and_then(|stored| stored.user_url));
	store.set_session(&StoredSession {
		session: session.clone(),
		user_url,
	});
}

fn session_hook(transport: Weak<HttpTransport>, store: SessionStore) -> SessionHook {
	Arc::new(move |session: &Session, user_url: Option<&str>| {
		if let Some(transport) = transport.upgrade() {
			transport.set_token(Some(session.access_token.clone()));
		}
		persist_session(&store, session, user_url);
	})
}

fn status_listener(
	transport: Weak<HttpTransport>,
	store: SessionStore,
	popup: Arc<PopupController>,
) -> Arc<dyn Fn(&Value) + Send + Sync> {
	Arc::new(move |payload: &Value| {
		let Some(connection) = connection_of(payload) else {
			return;
		};
		if connection.is_connected {
			if let Some(session) = session_of(payload) {
				if let Some(transport) = transport.upgrade() {
					transport.set_token(Some(session.access_token.clone()));
				}
				let user_url = payload.pointer("/provider/userUrl").and_then(Value::as_str);
				persist_session(&store, &session, user_url);
			}
		} else {
			tracing::info!(
				target: "wallet.discovery",
				reason = connection.reason.as_deref().unwrap_or("unspecified"),
				"gateway reports disconnected; clearing session"
			);
			if let Some(transport) = transport.upgrade() {
				transport.set_token(None);
			}
			store.clear();
			popup.close();
		}
	})
}

/// Handles login approval and logout notifications posted by the popup.
async fn watch_approvals(
	mut rx: broadcast::Receiver<WindowMessage>,
	remote: Weak<RemoteProvider>,
	store: SessionStore,
	popup: Arc<PopupController>,
) {
	let mut last_session_id: Option<String> = None;
	loop {
		let message = match rx.recv().await {
			Ok(message) => message,
			Err(broadcast::error::RecvError::Lagged(_)) => continue,
			Err(broadcast::error::RecvError::Closed) => break,
		};
		let Some(remote) = remote.upgrade() else {
			break;
		};

		match message {
			WindowMessage::IdpAuthSuccess { token, session_id } => {
				tracing::info!(target: "wallet.discovery", "gateway login approved");
				remote.transport().set_token(Some(token.clone()));

				let mut status = match remote.request(methods::STATUS, Value::Null).await {
					Ok(status) => status,
					Err(e) => {
						tracing::warn!(target: "wallet.discovery", error = %e, "status after login approval failed");
						continue;
					}
				};
				if last_session_id.as_deref() == Some(session_id.as_str()) {
					continue;
				}
				last_session_id = Some(session_id);

				if let Value::Object(map) = &mut status {
					if map.get("session").is_none_or(Value::is_null) {
						map.insert("session".to_string(), json!({"accessToken": token}));
					}
				}
				remote.emit(events::STATUS_CHANGED, &status);
			}
			WindowMessage::Logout => {
				tracing::info!(target: "wallet.discovery", "wallet logout received");
				remote.transport().set_token(None);
				store.clear();
				popup.close();
				remote.emit(
					events::STATUS_CHANGED,
					&json!({"connection": {"isConnected": false, "reason": "logout"}}),
				);
			}
			_ => {}
		}
	}
	tracing::debug!(target: "wallet.discovery", "approval watcher stopped");
}

#[async_trait]
impl Adapter for GatewayAdapter {
	fn info(&self) -> WalletInfo {
		self.info.clone()
	}

	async fn detect(&self) -> bool {
		true
	}

	fn create_provider(&self) -> Result<Arc<dyn Provider>> {
		let provider: Arc<dyn Provider> = self.build()?.bridge;
		Ok(provider)
	}

	fn teardown(&self) {
		self.popup.close();
		self.release_link();
	}

	fn can_restore(&self) -> bool {
		true
	}

	async fn restore(&self) -> Result<Option<Arc<dyn Provider>>> {
		let Some(pointer) = self.store.discovery() else {
			return Ok(None);
		};
		if pointer.kind != WalletKind::Gateway || pointer.url.as_deref() != Some(self.rpc_url.as_str()) {
			return Ok(None);
		}
		let Some(stored) = self.store.session() else {
			tracing::debug!(target: "wallet.discovery", url = %self.rpc_url, "no stored gateway session");
			return Ok(None);
		};

		let parts = self.build()?;
		parts.transport.set_token(Some(stored.session.access_token.clone()));

		let status = match parts.remote.request(methods::STATUS, Value::Null).await {
			Ok(status) => status,
			Err(e) => {
				tracing::warn!(target: "wallet.discovery", url = %self.rpc_url, error = %e, "gateway rejected stored session");
				self.release_link();
				return Ok(None);
			}
		};
		if !connection_of(&status).is_some_and(|c| c.is_connected) {
			tracing::info!(target: "wallet.discovery", url = %self.rpc_url, "stored gateway session no longer connected");
			self.release_link();
			return Ok(None);
		}

		let provider: Arc<dyn Provider> = parts.bridge;
		Ok(Some(provider))
	}
}
