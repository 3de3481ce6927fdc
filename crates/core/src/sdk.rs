//! The top-level dApp SDK object.
//!
//! [`DappSdk`] wires the configured adapters into a [`DiscoveryClient`],
//! initializes it once on first use, and exposes the typed dApp API of
//! whatever wallet is connected.

use std::sync::Arc;

use tokio::sync::OnceCell;
use wallet_protocol::{
	ConnectionInfo, LedgerApiParams, LedgerApiResult, PrepareExecuteAndWaitResult, PrepareExecuteParams, StatusEvent,
	TxChangedEvent, Wallet,
};
use wallet_runtime::{Error, InPageChannel, Result, Subscription};

use crate::adapter::{Adapter, ExtensionAdapter, GatewayAdapter, WalletInfo, WalletKind};
use crate::client::DappClient;
use crate::config::{SdkConfig, Timeouts};
use crate::picker::{FirstWalletPicker, WalletPicker};
use crate::popup::{HeadlessPopupHost, PopupController, PopupHost};
use crate::registry::{ActiveSession, DiscoveryClient, GatewayFactory};
use crate::session::{RecentGateway, SessionStore};
use crate::storage::{FileStorage, MemoryStorage, Storage};

/// Optional collaborators of a [`DappSdk`]. Anything left unset gets a
/// headless default.
pub struct DappSdkBuilder {
	config: SdkConfig,
	picker: Option<Arc<dyn WalletPicker>>,
	storage: Option<Arc<dyn Storage>>,
	popup_host: Option<Arc<dyn PopupHost>>,
	channel: Option<InPageChannel>,
}

impl DappSdkBuilder {
	pub fn picker(mut self, picker: Arc<dyn WalletPicker>) -> Self {
		self.picker = Some(picker);
		self
	}

	/// Overrides `storagePath` and `persist` from the config.
	pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
		self.storage = Some(storage);
		self
	}

	pub fn popup_host(mut self, host: Arc<dyn PopupHost>) -> Self {
		self.popup_host = Some(host);
		self
	}

	pub fn channel(mut self, channel: InPageChannel) -> Self {
		self.channel = Some(channel);
		self
	}

	pub fn build(self) -> DappSdk {
		let storage: Arc<dyn Storage> = match (self.storage, self.config.storage_file()) {
			(Some(storage), _) => storage,
			(None, Some(path)) => {
				tracing::debug!(target: "wallet.discovery", path = %path.display(), "session store on disk");
				Arc::new(FileStorage::new(path))
			}
			(None, None) => Arc::new(MemoryStorage::new()),
		};
		let store = SessionStore::new(storage);
		let channel = self.channel.unwrap_or_default();
		let host: Arc<dyn PopupHost> = match self.popup_host {
			Some(host) => host,
			None => Arc::new(HeadlessPopupHost::new()),
		};
		let popup = Arc::new(PopupController::new(host, self.config.popup.clone()));
		let picker: Arc<dyn WalletPicker> = match self.picker {
			Some(picker) => picker,
			None => Arc::new(FirstWalletPicker),
		};

		let registry = DiscoveryClient::new(store.clone())
			.with_picker(picker)
			.with_gateway_factory(gateway_factory(
				store.clone(),
				channel.clone(),
				Arc::clone(&popup),
				self.config.timeouts,
			));

		if self.config.include_extension {
			registry.register_adapter(Arc::new(ExtensionAdapter::new(
				channel.clone(),
				store.clone(),
				self.config.timeouts.extension_detect(),
			)));
		}
		for gateway in &self.config.gateways {
			let adapter = GatewayAdapter::new(
				gateway.name.clone(),
				gateway.rpc_url.clone(),
				store.clone(),
				channel.clone(),
				Arc::clone(&popup),
				self.config.timeouts,
			)
			.with_icon(gateway.icon.clone())
			.with_description(gateway.description.clone());
			registry.register_adapter(Arc::new(adapter));
		}

		DappSdk {
			config: self.config,
			registry,
			store,
			channel,
			popup,
			initialized: OnceCell::new(),
		}
	}
}

fn gateway_factory(
	store: SessionStore,
	channel: InPageChannel,
	popup: Arc<PopupController>,
	timeouts: Timeouts,
) -> GatewayFactory {
	Arc::new(move |name: &str, rpc_url: &str| {
		let adapter: Arc<dyn Adapter> = Arc::new(GatewayAdapter::new(
			name,
			rpc_url,
			store.clone(),
			channel.clone(),
			Arc::clone(&popup),
			timeouts,
		));
		Ok(adapter)
	})
}

pub struct DappSdk {
	config: SdkConfig,
	registry: DiscoveryClient,
	store: SessionStore,
	channel: InPageChannel,
	popup: Arc<PopupController>,
	initialized: OnceCell<()>,
}

impl DappSdk {
	pub fn new(config: SdkConfig) -> Self {
		Self::builder(config).build()
	}

	pub fn builder(config: SdkConfig) -> DappSdkBuilder {
		DappSdkBuilder {
			config,
			picker: None,
			storage: None,
			popup_host: None,
			channel: None,
		}
	}

	pub fn config(&self) -> &SdkConfig {
		&self.config
	}

	/// The underlying registry, e.g. to register extra adapters before the
	/// first call.
	pub fn registry(&self) -> &DiscoveryClient {
		&self.registry
	}

	pub fn store(&self) -> &SessionStore {
		&self.store
	}

	pub fn channel(&self) -> &InPageChannel {
		&self.channel
	}

	pub fn popup(&self) -> &Arc<PopupController> {
		&self.popup
	}

	/// Detects wallets and restores the last session. Runs once; later calls
	/// return immediately.
	pub async fn init(&self) -> Result<()> {
		self.initialized
			.get_or_try_init(|| self.registry.init())
			.await?;
		Ok(())
	}

	pub async fn list_wallets(&self) -> Result<Vec<WalletInfo>> {
		self.init().await?;
		Ok(self.registry.list_wallets())
	}

	/// Lets the picker choose a wallet and connects to it.
	///
	/// When a session (for example a restored one) already exists, asks it
	/// for its current connection instead.
	pub async fn connect(&self) -> Result<ConnectionInfo> {
		self.init().await?;
		if let Some(session) = self.registry.active_session() {
			return Ok(self.client_for(&session).status().await?.connection);
		}
		let session = self.registry.connect_with_picker().await?;
		self.connected(session)
	}

	/// Connects to a specific registered wallet, bypassing the picker.
	pub async fn connect_to(&self, wallet_id: &str) -> Result<ConnectionInfo> {
		self.init().await?;
		let session = self.registry.connect(wallet_id).await?;
		self.connected(session)
	}

	fn connected(&self, session: ActiveSession) -> Result<ConnectionInfo> {
		let info = session.info();
		if let (WalletKind::Gateway, Some(rpc_url)) = (info.kind, info.url) {
			self.store.push_recent_gateway(RecentGateway {
				name: info.name,
				rpc_url,
			});
		}
		session.connection.ok_or(Error::NotConnected)
	}

	pub async fn disconnect(&self) -> Result<()> {
		self.registry.disconnect().await
	}

	/// Typed client of the connected wallet.
	pub fn client(&self) -> Result<DappClient> {
		let session = self.registry.active_session().ok_or(Error::NotConnected)?;
		Ok(self.client_for(&session))
	}

	fn client_for(&self, session: &ActiveSession) -> DappClient {
		DappClient::new(
			Arc::clone(&session.provider),
			session.info().kind,
			Arc::clone(&self.popup),
			self.channel.clone(),
			self.store.clone(),
		)
	}

	pub async fn status(&self) -> Result<StatusEvent> {
		self.client()?.status().await
	}

	pub async fn list_accounts(&self) -> Result<Vec<Wallet>> {
		self.client()?.list_accounts().await
	}

	pub async fn get_primary_account(&self) -> Result<Wallet> {
		self.client()?.get_primary_account().await
	}

	pub async fn prepare_execute(&self, params: PrepareExecuteParams) -> Result<()> {
		self.client()?.prepare_execute(params).await
	}

	pub async fn prepare_execute_and_wait(&self, params: PrepareExecuteParams) -> Result<PrepareExecuteAndWaitResult> {
		self.client()?.prepare_execute_and_wait(params).await
	}

	pub async fn ledger_api(&self, params: LedgerApiParams) -> Result<LedgerApiResult> {
		self.client()?.ledger_api(params).await
	}

	pub async fn open(&self) -> Result<()> {
		self.client()?.open().await
	}

	pub fn on_status_changed<F>(&self, f: F) -> Result<Subscription>
	where
		F: Fn(StatusEvent) + Send + Sync + 'static,
	{
		Ok(self.client()?.on_status_changed(f))
	}

	pub fn on_accounts_changed<F>(&self, f: F) -> Result<Subscription>
	where
		F: Fn(Vec<Wallet>) + Send + Sync + 'static,
	{
		Ok(self.client()?.on_accounts_changed(f))
	}

	pub fn on_tx_changed<F>(&self, f: F) -> Result<Subscription>
	where
		F: Fn(TxChangedEvent) + Send + Sync + 'static,
	{
		Ok(self.client()?.on_tx_changed(f))
	}
}

impl std::fmt::Debug for DappSdk {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DappSdk")
			.field("registry", &self.registry)
			.field("popup", &self.popup)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::GatewayConfig;
	use crate::registry::DiscoveryState;
	use crate::testing::{FakeAdapter, ScriptedProvider};

	fn headless(config: SdkConfig) -> DappSdk {
		DappSdk::builder(config)
			.storage(Arc::new(MemoryStorage::new()))
			.build()
	}

	#[test]
	fn test_configured_adapters_are_registered_in_order() {
		let config = SdkConfig::from_json_str(
			r#"{"gateways": [
				{"name": "Local", "rpcUrl": "http://localhost:3030/rpc"},
				{"name": "Dev", "rpcUrl": "https://dev.example/rpc", "icon": "dev.png"}
			]}"#,
		)
		.unwrap();
		let sdk = headless(config);

		let ids: Vec<_> = sdk.registry().list_adapters().into_iter().map(|i| i.id).collect();
		assert_eq!(
			ids,
			vec!["extension", "gateway:http://localhost:3030/rpc", "gateway:https://dev.example/rpc"]
		);
		assert_eq!(sdk.registry().list_adapters()[2].icon.as_deref(), Some("dev.png"));
	}

	#[test]
	fn test_extension_can_be_excluded() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			gateways: vec![GatewayConfig {
				name: "Only".into(),
				rpc_url: "https://only.example/rpc".into(),
				icon: None,
				description: None,
			}],
			..Default::default()
		});
		assert_eq!(sdk.registry().list_adapters().len(), 1);
	}

	#[tokio::test]
	async fn test_connect_without_wallets_is_cancelled() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			..Default::default()
		});
		assert!(matches!(sdk.connect().await, Err(Error::PickerCancelled)));
		assert_eq!(sdk.registry().state(), DiscoveryState::Idle);
	}

	#[tokio::test]
	async fn test_helpers_need_a_session() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			..Default::default()
		});
		assert!(matches!(sdk.status().await, Err(Error::NotConnected)));
		assert!(sdk.on_tx_changed(|_| {}).is_err());
		sdk.disconnect().await.unwrap();
	}

	#[tokio::test]
	async fn test_connect_records_recent_gateway() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			..Default::default()
		});
		let provider = ScriptedProvider::connected(true);
		sdk.registry().register_adapter(FakeAdapter::new("gw", provider.clone()));

		let connection = sdk.connect().await.unwrap();
		assert!(connection.is_connected);
		assert_eq!(provider.calls(), vec!["connect"]);

		let recent = sdk.store().recent_gateways();
		assert_eq!(recent[0].rpc_url, "https://gw.example/rpc");
		assert_eq!(recent[0].name, "Fake gw");

		// Already connected: the live status answers, no second connect call.
		sdk.connect().await.unwrap();
		assert_eq!(provider.calls(), vec!["connect", "status"]);

		sdk.list_accounts().await.unwrap_err();
		sdk.disconnect().await.unwrap();
		assert!(sdk.client().is_err());
	}

	#[tokio::test]
	async fn test_init_runs_once() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			..Default::default()
		});
		sdk.init().await.unwrap();
		// Registered after init: never detected, but still listed.
		sdk.registry()
			.register_adapter(FakeAdapter::new("late", ScriptedProvider::connected(true)));
		sdk.init().await.unwrap();
		assert_eq!(sdk.list_wallets().await.unwrap().len(), 1);
		assert_eq!(sdk.connect_to("late").await.unwrap(), ConnectionInfo {
			is_connected: true,
			reason: None,
			is_network_connected: false,
			network_reason: None,
		});
	}

	#[tokio::test]
	async fn test_connect_resolves_with_connect_answer() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			..Default::default()
		});
		let provider = ScriptedProvider::new(|method, _| match method {
			"connect" => Ok(serde_json::json!({"isConnected": true, "isNetworkConnected": true, "reason": "approved"})),
			_ => Err(Error::Transport("status unavailable".into())),
		});
		sdk.registry().register_adapter(FakeAdapter::new("gw", provider.clone()));

		let connection = sdk.connect_to("gw").await.unwrap();

		assert_eq!(connection.reason.as_deref(), Some("approved"));
		assert_eq!(provider.calls(), vec!["connect"]);
		assert_eq!(sdk.registry().state(), DiscoveryState::Connected);
	}

	#[tokio::test]
	async fn test_refused_connect_leaves_sdk_idle() {
		let sdk = headless(SdkConfig {
			include_extension: false,
			..Default::default()
		});
		let provider = ScriptedProvider::new(|_, _| Ok(serde_json::json!({"isConnected": false})));
		sdk.registry().register_adapter(FakeAdapter::new("gw", provider));

		let err = sdk.connect_to("gw").await.unwrap_err();

		assert!(matches!(err, Error::ConnectionRefused { .. }));
		assert_eq!(sdk.registry().state(), DiscoveryState::Idle);
		assert!(sdk.store().discovery().is_none());
		assert!(sdk.store().recent_gateways().is_empty());
	}
}
