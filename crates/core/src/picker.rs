//! Wallet picker seam: the UI that lets the user choose a wallet.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wallet_runtime::Result;

use crate::adapter::{WalletId, WalletInfo, WalletKind};

/// One selectable wallet shown by the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPickerEntry {
	pub id: WalletId,
	pub name: String,
	pub kind: WalletKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl From<WalletInfo> for WalletPickerEntry {
	fn from(info: WalletInfo) -> Self {
		Self {
			id: info.id,
			name: info.name,
			kind: info.kind,
			description: info.description,
			icon: info.icon,
			url: info.url,
		}
	}
}

/// What the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletChoice {
	/// One of the offered entries.
	Registered(WalletId),
	/// A gateway URL typed in by the user, possibly not registered yet.
	CustomGateway { name: String, rpc_url: String },
}

#[async_trait]
pub trait WalletPicker: Send + Sync {
	/// Returns the user's choice, or `None` if the picker was dismissed.
	async fn pick(&self, entries: Vec<WalletPickerEntry>) -> Result<Option<WalletChoice>>;
}

/// Picks the first offered entry. Useful for headless hosts with one wallet.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstWalletPicker;

#[async_trait]
impl WalletPicker for FirstWalletPicker {
	async fn pick(&self, entries: Vec<WalletPickerEntry>) -> Result<Option<WalletChoice>> {
		Ok(entries.into_iter().next().map(|entry| WalletChoice::Registered(entry.id)))
	}
}
