use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use wallet_protocol::{StatusEvent, WindowMessage, methods};
use wallet_runtime::{Error, InPageChannel, Result, WindowTransport};

use super::{Adapter, WalletInfo, WalletKind};
use crate::provider::{Provider, RpcProvider};
use crate::session::SessionStore;

/// Fixed wallet id of the browser extension.
pub const EXTENSION_WALLET_ID: &str = "extension";

/// Adapter for the wallet browser extension.
///
/// Detection posts `SPLICE_WALLET_EXT_READY` and waits a bounded time for
/// `SPLICE_WALLET_EXT_ACK`. The extension talks the local surface directly,
/// so no bridge is involved.
pub struct ExtensionAdapter {
	channel: InPageChannel,
	store: SessionStore,
	detect_timeout: Duration,
}

impl ExtensionAdapter {
	pub fn new(channel: InPageChannel, store: SessionStore, detect_timeout: Duration) -> Self {
		Self {
			channel,
			store,
			detect_timeout,
		}
	}

	fn provider(&self) -> RpcProvider<WindowTransport> {
		RpcProvider::new(Arc::new(WindowTransport::new(self.channel.clone())))
	}
}

async fn wait_for_ack(rx: &mut broadcast::Receiver<WindowMessage>) -> bool {
	loop {
		match rx.recv().await {
			Ok(WindowMessage::ExtAck) => return true,
			Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
			Err(broadcast::error::RecvError::Closed) => return false,
		}
	}
}

#[async_trait]
impl Adapter for ExtensionAdapter {
	fn info(&self) -> WalletInfo {
		WalletInfo {
			id: EXTENSION_WALLET_ID.to_string(),
			name: "Wallet Extension".to_string(),
			kind: WalletKind::Extension,
			icon: None,
			description: Some("Browser extension wallet".to_string()),
			url: None,
		}
	}

	async fn detect(&self) -> bool {
		let mut rx = self.channel.subscribe();
		self.channel.post(WindowMessage::ExtReady);
		let found = tokio::time::timeout(self.detect_timeout, wait_for_ack(&mut rx))
			.await
			.unwrap_or(false);
		tracing::debug!(target: "wallet.discovery", found, "extension probe");
		found
	}

	fn create_provider(&self) -> Result<Arc<dyn Provider>> {
		let provider: Arc<dyn Provider> = Arc::new(self.provider());
		Ok(provider)
	}

	fn teardown(&self) {
		tracing::debug!(target: "wallet.discovery", "extension adapter teardown");
	}

	fn can_restore(&self) -> bool {
		true
	}

	async fn restore(&self) -> Result<Option<Arc<dyn Provider>>> {
		let Some(pointer) = self.store.discovery() else {
			return Ok(None);
		};
		if pointer.kind != WalletKind::Extension {
			return Ok(None);
		}

		let provider = self.provider();
		let status = match provider.request(methods::STATUS, Value::Null).await {
			Ok(value) => serde_json::from_value::<StatusEvent>(value).map_err(Error::from),
			Err(e) => Err(e),
		};
		let status = match status {
			Ok(status) => status,
			Err(e) => {
				tracing::warn!(target: "wallet.discovery", error = %e, "extension status failed; not restoring");
				return Ok(None);
			}
		};
		if !status.connection.is_connected {
			tracing::info!(target: "wallet.discovery", "extension reports disconnected; not restoring");
			return Ok(None);
		}
		let provider: Arc<dyn Provider> = Arc::new(provider);
		Ok(Some(provider))
	}
}
