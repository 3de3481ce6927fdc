//! Optional process-wide [`DappSdk`].
//!
//! Hosts that prefer free functions install one SDK at startup and call
//! [`connect`], [`status`], ... from anywhere. Nothing else in the crate
//! depends on this module.

use std::sync::OnceLock;

use wallet_protocol::{
	ConnectionInfo, LedgerApiParams, LedgerApiResult, PrepareExecuteAndWaitResult, PrepareExecuteParams, StatusEvent,
	Wallet,
};
use wallet_runtime::{Error, Result};

use crate::sdk::DappSdk;

static SDK: OnceLock<DappSdk> = OnceLock::new();

/// Installs the process-wide SDK. Fails if one is already installed.
pub fn install(sdk: DappSdk) -> Result<&'static DappSdk> {
	SDK.set(sdk)
		.map_err(|_| Error::InvalidArgument("a global wallet sdk is already installed".into()))?;
	tracing::debug!(target: "wallet.discovery", "global sdk installed");
	self::sdk()
}

/// The installed SDK, or [`Error::NotInitialized`].
pub fn sdk() -> Result<&'static DappSdk> {
	SDK.get().ok_or(Error::NotInitialized)
}

pub async fn connect() -> Result<ConnectionInfo> {
	sdk()?.connect().await
}

pub async fn disconnect() -> Result<()> {
	sdk()?.disconnect().await
}

pub async fn status() -> Result<StatusEvent> {
	sdk()?.status().await
}

pub async fn list_accounts() -> Result<Vec<Wallet>> {
	sdk()?.list_accounts().await
}

pub async fn get_primary_account() -> Result<Wallet> {
	sdk()?.get_primary_account().await
}

pub async fn prepare_execute(params: PrepareExecuteParams) -> Result<()> {
	sdk()?.prepare_execute(params).await
}

pub async fn prepare_execute_and_wait(params: PrepareExecuteParams) -> Result<PrepareExecuteAndWaitResult> {
	sdk()?.prepare_execute_and_wait(params).await
}

pub async fn ledger_api(params: LedgerApiParams) -> Result<LedgerApiResult> {
	sdk()?.ledger_api(params).await
}

pub async fn open() -> Result<()> {
	sdk()?.open().await
}
