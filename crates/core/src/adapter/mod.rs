//! Wallet adapters: one factory and capability detector per wallet kind.
//!
//! - [`ExtensionAdapter`]: browser extension over the in-page channel
//! - [`GatewayAdapter`]: remote gateway over HTTP + SSE, behind a
//!   [`BridgeController`](crate::bridge::BridgeController)

mod extension;
mod gateway;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wallet_runtime::Result;

pub use extension::{EXTENSION_WALLET_ID, ExtensionAdapter};
pub use gateway::{GatewayAdapter, gateway_wallet_id};

use crate::provider::Provider;

/// Stable identity of one adapter instance within a registry.
pub type WalletId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
	Extension,
	Gateway,
}

/// Display metadata of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
	pub id: WalletId,
	pub name: String,
	pub kind: WalletKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Factory, detector and restorer for one wallet backend.
#[async_trait]
pub trait Adapter: Send + Sync {
	/// Pure snapshot of display metadata.
	fn info(&self) -> WalletInfo;

	fn id(&self) -> WalletId {
		self.info().id
	}

	/// Whether the backend is available. Never fails: problems read as `false`.
	async fn detect(&self) -> bool;

	/// Builds the transport and provider. Performs no network I/O and does
	/// not imply a connection.
	fn create_provider(&self) -> Result<Arc<dyn Provider>>;

	/// Best-effort synchronous cleanup. Must not panic.
	fn teardown(&self);

	/// Whether [`Adapter::restore`] is implemented.
	fn can_restore(&self) -> bool {
		false
	}

	/// Silently reconnects from the persisted session.
	///
	/// `Ok(None)` when there is nothing to restore, or when the stored
	/// credential is stale or rejected by the backend. `Err` is reserved for
	/// local failures such as an unusable endpoint URL.
	async fn restore(&self) -> Result<Option<Arc<dyn Provider>>> {
		Ok(None)
	}
}

impl std::fmt::Debug for dyn Adapter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Adapter").field(&self.id()).finish()
	}
}
