//! Local surface on top of a remote, submit-then-event wallet.
//!
//! A gateway answers `connect` and `prepareExecute` right away and reports
//! the outcome later through `statusChanged` / `txChanged` push events, after
//! a human acted in the approval popup. [`BridgeController`] composes those
//! calls with event waits and timeouts so callers see one awaited result,
//! just like the extension's local surface.
//!
//! Every wait subscribes before the remote call is issued and holds the
//! [`Subscription`](wallet_runtime::Subscription) for its whole lifetime, so
//! the listener is removed on success, rejection, timeout, and when the
//! returned future is dropped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use wallet_protocol::{
	ConnectResult, ConnectionInfo, PrepareExecuteAndWaitResult, PrepareExecuteParams, PrepareExecuteResult, Session,
	TxChangedEvent, events, methods,
};
use wallet_runtime::{Error, EventHub, Listener, Result, Subscription};

use crate::config::Timeouts;
use crate::popup::PopupController;
use crate::provider::Provider;

/// Called with every session the bridge sees established, plus the user URL.
pub type SessionHook = Arc<dyn Fn(&Session, Option<&str>) + Send + Sync>;

pub struct BridgeController {
	remote: Arc<dyn Provider>,
	popup: Arc<PopupController>,
	connect_timeout: Duration,
	transaction_timeout: Duration,
	pending: Arc<Mutex<HashSet<String>>>,
	on_session: Option<SessionHook>,
}

/// Keeps a command id reserved until the wait for it ends.
struct PendingGuard {
	command_id: String,
	pending: Arc<Mutex<HashSet<String>>>,
}

impl Drop for PendingGuard {
	fn drop(&mut self) {
		self.pending.lock().remove(&self.command_id);
	}
}

impl BridgeController {
	pub fn new(remote: Arc<dyn Provider>, popup: Arc<PopupController>) -> Self {
		let timeouts = Timeouts::default();
		Self {
			remote,
			popup,
			connect_timeout: timeouts.connect(),
			transaction_timeout: timeouts.transaction(),
			pending: Arc::new(Mutex::new(HashSet::new())),
			on_session: None,
		}
	}

	pub fn with_timeouts(mut self, timeouts: &Timeouts) -> Self {
		self.connect_timeout = timeouts.connect();
		self.transaction_timeout = timeouts.transaction();
		self
	}

	pub fn with_session_hook(mut self, hook: SessionHook) -> Self {
		self.on_session = Some(hook);
		self
	}

	pub fn remote(&self) -> &Arc<dyn Provider> {
		&self.remote
	}

	/// Command ids with a wait in flight.
	pub fn pending_commands(&self) -> Vec<String> {
		self.pending.lock().iter().cloned().collect()
	}

	/// Connects, waiting for the human login when the gateway has no session yet.
	pub async fn connect(&self) -> Result<ConnectionInfo> {
		let (tx, rx) = oneshot::channel();
		let tx = Mutex::new(Some(tx));
		let subscription = self.remote.on(
			events::STATUS_CHANGED,
			Arc::new(move |payload: &Value| {
				let Some(connection) = connection_of(payload) else {
					return;
				};
				if !connection.is_connected {
					return;
				}
				if let Some(tx) = tx.lock().take() {
					let _ = tx.send((connection, session_of(payload)));
				}
			}),
		);

		let result: ConnectResult = decode_or_default(self.remote.request(methods::CONNECT, Value::Null).await?)?;

		if let Some(session) = &result.session {
			tracing::debug!(target: "wallet.bridge", "connect fast path, session already established");
			self.session_established(session, result.user_url.as_deref());
			return Ok(result.connection.unwrap_or_else(|| ConnectionInfo {
				is_connected: true,
				..Default::default()
			}));
		}

		match result.user_url.as_deref() {
			Some(url) => self.popup.open_or_warn(url),
			None => tracing::warn!(target: "wallet.bridge", "connect returned neither session nor userUrl"),
		}

		tracing::debug!(
			target: "wallet.bridge",
			timeout_ms = self.connect_timeout.as_millis() as u64,
			"awaiting statusChanged"
		);
		match tokio::time::timeout(self.connect_timeout, rx).await {
			Ok(Ok((connection, session))) => {
				drop(subscription);
				if let Some(session) = &session {
					self.session_established(session, result.user_url.as_deref());
				}
				Ok(connection)
			}
			Ok(Err(_)) => Err(Error::ChannelClosed),
			Err(_) => {
				drop(subscription);
				Err(Error::Timeout {
					operation: "statusChanged after connect".to_string(),
					duration_ms: self.connect_timeout.as_millis() as u64,
				})
			}
		}
	}

	/// Submits the command and returns without waiting for its outcome.
	pub async fn prepare_execute(&self, mut params: PrepareExecuteParams) -> Result<()> {
		let command_id = ensure_command_id(&mut params);
		if self.pending.lock().contains(&command_id) {
			return Err(Error::DuplicateCommand(command_id));
		}

		let result = self.submit(&params).await?;
		if let Some(url) = result.user_url.as_deref() {
			self.popup.open_or_warn(url);
		}
		Ok(())
	}

	/// Submits the command and waits for its `executed` or `failed` event.
	///
	/// `pending` and `signed` events for the command are ignored. `failed`
	/// rejects with [`Error::TransactionFailed`]. The backend stays the source
	/// of truth: nothing is rolled back locally on failure or timeout.
	pub async fn prepare_execute_and_wait(&self, mut params: PrepareExecuteParams) -> Result<PrepareExecuteAndWaitResult> {
		let command_id = ensure_command_id(&mut params);
		let _reservation = self.reserve(&command_id)?;

		let (tx, rx) = oneshot::channel();
		let subscription = self.remote.on(events::TX_CHANGED, tx_listener(command_id.clone(), tx));

		let result = self.submit(&params).await?;
		if let Some(url) = result.user_url.as_deref() {
			self.popup.open_or_warn(url);
		}

		match tokio::time::timeout(self.transaction_timeout, rx).await {
			Ok(Ok(tx)) => {
				drop(subscription);
				match tx {
					TxChangedEvent::Failed { command_id } => Err(Error::TransactionFailed { command_id }),
					tx => Ok(PrepareExecuteAndWaitResult { tx }),
				}
			}
			Ok(Err(_)) => Err(Error::ChannelClosed),
			Err(_) => {
				drop(subscription);
				tracing::debug!(target: "wallet.bridge", command_id = %command_id, "transaction wait timed out");
				Err(Error::Timeout {
					operation: format!("txChanged for command {command_id}"),
					duration_ms: self.transaction_timeout.as_millis() as u64,
				})
			}
		}
	}

	async fn submit(&self, params: &PrepareExecuteParams) -> Result<PrepareExecuteResult> {
		let value = self
			.remote
			.request(methods::PREPARE_EXECUTE, serde_json::to_value(params)?)
			.await?;
		decode_or_default(value)
	}

	fn reserve(&self, command_id: &str) -> Result<PendingGuard> {
		if !self.pending.lock().insert(command_id.to_string()) {
			return Err(Error::DuplicateCommand(command_id.to_string()));
		}
		Ok(PendingGuard {
			command_id: command_id.to_string(),
			pending: Arc::clone(&self.pending),
		})
	}

	fn session_established(&self, session: &Session, user_url: Option<&str>) {
		if let Some(hook) = &self.on_session {
			hook(session, user_url);
		}
	}
}

fn tx_listener(command_id: String, tx: oneshot::Sender<TxChangedEvent>) -> Listener {
	let tx = Mutex::new(Some(tx));
	Arc::new(move |payload: &Value| {
		let event = match serde_json::from_value::<TxChangedEvent>(payload.clone()) {
			Ok(event) => event,
			Err(e) => {
				tracing::debug!(target: "wallet.bridge", error = %e, "ignoring unparsable txChanged");
				return;
			}
		};
		if event.command_id() != command_id {
			return;
		}
		if !event.is_terminal() {
			tracing::debug!(target: "wallet.bridge", command_id = %command_id, ?event, "non-terminal transaction update");
			return;
		}
		if let Some(tx) = tx.lock().take() {
			let _ = tx.send(event);
		}
	})
}

fn ensure_command_id(params: &mut PrepareExecuteParams) -> String {
	params
		.command_id
		.get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
		.clone()
}

pub(crate) fn connection_of(payload: &Value) -> Option<ConnectionInfo> {
	serde_json::from_value(payload.get("connection")?.clone()).ok()
}

pub(crate) fn session_of(payload: &Value) -> Option<Session> {
	serde_json::from_value(payload.get("session")?.clone()).ok()
}

/// Decodes a remote result, treating `null` as the type's default.
fn decode_or_default<T: DeserializeOwned + Default>(value: Value) -> Result<T> {
	if value.is_null() {
		return Ok(T::default());
	}
	Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl Provider for BridgeController {
	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		let result = match method {
			methods::CONNECT => match self.connect().await {
				Ok(connection) => serde_json::to_value(connection).map_err(Error::from),
				Err(e) => Err(e),
			},
			methods::PREPARE_EXECUTE => match serde_json::from_value(params) {
				Ok(params) => self.prepare_execute(params).await.map(|()| Value::Null),
				Err(e) => Err(e.into()),
			},
			methods::PREPARE_EXECUTE_AND_WAIT => match serde_json::from_value(params) {
				Ok(params) => match self.prepare_execute_and_wait(params).await {
					Ok(result) => serde_json::to_value(result).map_err(Error::from),
					Err(e) => Err(e),
				},
				Err(e) => Err(e.into()),
			},
			_ => return self.remote.request(method, params).await,
		};
		result.map_err(|e| e.with_method(method))
	}

	fn events(&self) -> &EventHub {
		self.remote.events()
	}

	fn on(&self, event: &str, listener: Listener) -> Subscription {
		self.remote.on(event, listener)
	}
}

impl std::fmt::Debug for BridgeController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BridgeController")
			.field("connect_timeout", &self.connect_timeout)
			.field("transaction_timeout", &self.transaction_timeout)
			.field("pending", &self.pending.lock().len())
			.finish()
	}
}
