//! Typed dApp API over a connected [`Provider`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use wallet_protocol::{
	ConnectionInfo, LedgerApiParams, LedgerApiResult, PrepareExecuteAndWaitResult, PrepareExecuteParams, StatusEvent,
	TxChangedEvent, Wallet, WindowMessage, events, methods,
};
use wallet_runtime::{Error, InPageChannel, Result, Subscription};

use crate::adapter::WalletKind;
use crate::bridge::connection_of;
use crate::popup::PopupController;
use crate::provider::Provider;
use crate::session::SessionStore;

/// Request helpers and event subscriptions for one connected wallet.
///
/// Cheap to clone; every clone talks to the same provider.
#[derive(Clone)]
pub struct DappClient {
	provider: Arc<dyn Provider>,
	kind: WalletKind,
	popup: Arc<PopupController>,
	channel: InPageChannel,
	store: SessionStore,
}

impl DappClient {
	pub fn new(
		provider: Arc<dyn Provider>,
		kind: WalletKind,
		popup: Arc<PopupController>,
		channel: InPageChannel,
		store: SessionStore,
	) -> Self {
		Self {
			provider,
			kind,
			popup,
			channel,
			store,
		}
	}

	pub fn provider(&self) -> &Arc<dyn Provider> {
		&self.provider
	}

	pub fn kind(&self) -> WalletKind {
		self.kind
	}

	/// Asks the wallet to connect. The extension may answer with either the
	/// bare connection or a status-like object, both are accepted.
	pub async fn connect(&self) -> Result<ConnectionInfo> {
		let value = self.provider.request(methods::CONNECT, Value::Null).await?;
		if let Some(connection) = connection_of(&value) {
			return Ok(connection);
		}
		decode(methods::CONNECT, value)
	}

	pub async fn status(&self) -> Result<StatusEvent> {
		self.call(methods::STATUS, Value::Null).await
	}

	pub async fn list_accounts(&self) -> Result<Vec<Wallet>> {
		self.call(methods::LIST_ACCOUNTS, Value::Null).await
	}

	pub async fn get_primary_account(&self) -> Result<Wallet> {
		self.call(methods::GET_PRIMARY_ACCOUNT, Value::Null).await
	}

	/// Submits a command and returns once the wallet accepted it.
	pub async fn prepare_execute(&self, params: PrepareExecuteParams) -> Result<()> {
		self.provider
			.request(methods::PREPARE_EXECUTE, serde_json::to_value(params)?)
			.await?;
		Ok(())
	}

	/// Submits a command and resolves with its `executed` event.
	pub async fn prepare_execute_and_wait(&self, params: PrepareExecuteParams) -> Result<PrepareExecuteAndWaitResult> {
		self.call(methods::PREPARE_EXECUTE_AND_WAIT, serde_json::to_value(params)?)
			.await
	}

	pub async fn ledger_api(&self, params: LedgerApiParams) -> Result<LedgerApiResult> {
		self.call(methods::LEDGER_API, serde_json::to_value(params)?).await
	}

	/// Calls the wallet's own `disconnect`. Local session state is the
	/// registry's business, see [`DiscoveryClient::disconnect`](crate::DiscoveryClient::disconnect).
	pub async fn disconnect(&self) -> Result<()> {
		self.provider.request(methods::DISCONNECT, Value::Null).await?;
		Ok(())
	}

	/// Shows the wallet's own page.
	///
	/// Gateways open in the approval popup; the extension is asked to open
	/// its UI over the in-page channel.
	pub async fn open(&self) -> Result<()> {
		let url = match self.status().await {
			Ok(status) => status.provider.user_url,
			Err(e) => {
				tracing::debug!(target: "wallet.discovery", error = %e, "status unavailable, using stored wallet url");
				None
			}
		};
		let url = url
			.or_else(|| self.store.session().and_then(|s| s.user_url))
			.ok_or_else(|| Error::InvalidArgument("wallet has no page to open".into()))?;

		match self.kind {
			WalletKind::Extension => {
				self.channel.post(WindowMessage::ExtOpen { url });
				Ok(())
			}
			WalletKind::Gateway => self.popup.open(&url),
		}
	}

	pub fn on_status_changed<F>(&self, f: F) -> Subscription
	where
		F: Fn(StatusEvent) + Send + Sync + 'static,
	{
		self.typed_listener(events::STATUS_CHANGED, f)
	}

	pub fn on_accounts_changed<F>(&self, f: F) -> Subscription
	where
		F: Fn(Vec<Wallet>) + Send + Sync + 'static,
	{
		self.typed_listener(events::ACCOUNTS_CHANGED, f)
	}

	pub fn on_tx_changed<F>(&self, f: F) -> Subscription
	where
		F: Fn(TxChangedEvent) + Send + Sync + 'static,
	{
		self.typed_listener(events::TX_CHANGED, f)
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
		let value = self.provider.request(method, params).await?;
		decode(method, value)
	}

	/// Malformed payloads are logged and skipped.
	fn typed_listener<T, F>(&self, event: &'static str, f: F) -> Subscription
	where
		T: DeserializeOwned,
		F: Fn(T) + Send + Sync + 'static,
	{
		self.provider.on(
			event,
			Arc::new(move |payload: &Value| match serde_json::from_value::<T>(payload.clone()) {
				Ok(typed) => f(typed),
				Err(e) => tracing::warn!(target: "wallet.events", event, error = %e, "ignoring malformed event payload"),
			}),
		)
	}
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
	serde_json::from_value(value).map_err(|e| Error::from(e).with_method(method))
}

impl std::fmt::Debug for DappClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DappClient").field("kind", &self.kind).finish()
	}
}
