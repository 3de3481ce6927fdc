//! wallet-discovery: find a wallet, connect to it, and drive it through one API
//!
//! A dApp talks to two very different kinds of wallet:
//!
//! - the **browser extension**, reached over the in-page message channel,
//!   which answers every call with its final result
//! - a **remote gateway**, reached over HTTP, which answers right away and
//!   reports the outcome later through push events once a human approved it
//!   in a popup
//!
//! This crate hides that difference. Each wallet kind is an [`Adapter`]; the
//! [`DiscoveryClient`] detects them, restores the last session and keeps at
//! most one session active. Gateway providers are wrapped in a
//! [`BridgeController`] so `connect` and `prepareExecuteAndWait` resolve with
//! the final outcome for both kinds.
//!
//! # Example
//!
//! ```ignore
//! use wallet_discovery::{DappSdk, PrepareExecuteParams, SdkConfig};
//!
//! #[tokio::main]
//! async fn main() -> wallet_discovery::Result<()> {
//!     let config = SdkConfig::from_json_str(
//!         r#"{"gateways": [{"name": "Local", "rpcUrl": "http://localhost:3030/api/v0/dapp"}]}"#,
//!     )?;
//!     let sdk = DappSdk::new(config);
//!
//!     let connection = sdk.connect().await?;
//!     println!("connected: {}", connection.is_connected);
//!
//!     let _tx = sdk.on_tx_changed(|tx| println!("{} -> {:?}", tx.command_id(), tx))?;
//!     let result = sdk
//!         .prepare_execute_and_wait(PrepareExecuteParams {
//!             commands: serde_json::json!([]),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("executed: {:?}", result.tx);
//!
//!     sdk.disconnect().await
//! }
//! ```

pub mod adapter;
pub mod bridge;
pub mod client;
pub mod config;
pub mod global;
pub mod logging;
pub mod picker;
pub mod popup;
pub mod provider;
pub mod registry;
pub mod sdk;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use adapter::{Adapter, EXTENSION_WALLET_ID, ExtensionAdapter, GatewayAdapter, WalletId, WalletInfo, WalletKind};
pub use bridge::{BridgeController, SessionHook};
pub use client::DappClient;
pub use config::{GatewayConfig, PopupOptions, SdkConfig, Timeouts};
pub use logging::init_logging;
pub use picker::{FirstWalletPicker, WalletChoice, WalletPicker, WalletPickerEntry};
pub use popup::{HeadlessPopupHost, PopupController, PopupHost};
pub use provider::{Provider, RpcProvider};
pub use registry::{ActiveSession, DiscoveryClient, DiscoveryState, GatewayFactory, client_events};
pub use sdk::{DappSdk, DappSdkBuilder};
pub use session::{DiscoveryPointer, RecentGateway, SessionStore, StoredSession};
pub use storage::{FileStorage, MemoryStorage, Storage};
// Wire types and runtime plumbing callers need alongside the SDK.
pub use wallet_protocol::{
	ConnectionInfo, LedgerApiParams, LedgerApiResult, PrepareExecuteAndWaitResult, PrepareExecuteParams, ProviderInfo,
	RequestMethod, Session, StatusEvent, TxChangedEvent, Wallet, WindowMessage, events, methods,
};
pub use wallet_runtime::{Error, ErrorKind, EventHub, InPageChannel, Listener, Result, Subscription};
