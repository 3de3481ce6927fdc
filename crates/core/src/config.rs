//! SDK configuration.
//!
//! Every field has a default, so an empty JSON object (or a missing file)
//! yields a working configuration with the extension adapter enabled and no
//! gateways.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wallet_runtime::Result;

use crate::storage::FileStorage;

/// A remote gateway registered at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
	pub name: String,
	pub rpc_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

/// Bounds on the operations that wait on something outside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
	/// Extension probe, `EXT_READY` to `EXT_ACK`.
	pub extension_detect_ms: u64,
	/// Human login in the approval popup.
	pub connect_ms: u64,
	/// Transaction outcome after `prepareExecute` returned.
	pub transaction_ms: u64,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			extension_detect_ms: 2_000,
			connect_ms: 300_000,
			transaction_ms: 10_000,
		}
	}
}

impl Timeouts {
	pub fn extension_detect(&self) -> Duration {
		Duration::from_millis(self.extension_detect_ms)
	}

	pub fn connect(&self) -> Duration {
		Duration::from_millis(self.connect_ms)
	}

	pub fn transaction(&self) -> Duration {
		Duration::from_millis(self.transaction_ms)
	}
}

/// Geometry and window name of the approval popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupOptions {
	pub target: String,
	pub width: u32,
	pub height: u32,
	pub screen_x: u32,
	pub screen_y: u32,
}

impl Default for PopupOptions {
	fn default() -> Self {
		Self {
			target: "wallet-popup".to_string(),
			width: 400,
			height: 500,
			screen_x: 200,
			screen_y: 200,
		}
	}
}

impl PopupOptions {
	/// `window.open` style feature string.
	pub fn features(&self) -> String {
		format!(
			"popup,width={},height={},screenX={},screenY={}",
			self.width, self.height, self.screen_x, self.screen_y
		)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SdkConfig {
	pub gateways: Vec<GatewayConfig>,
	pub include_extension: bool,
	pub timeouts: Timeouts,
	pub popup: PopupOptions,
	/// Backing file for the session store.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub storage_path: Option<PathBuf>,
	/// Keep the session store on disk even without a `storagePath`.
	pub persist: bool,
}

impl Default for SdkConfig {
	fn default() -> Self {
		Self {
			gateways: Vec::new(),
			include_extension: true,
			timeouts: Timeouts::default(),
			popup: PopupOptions::default(),
			storage_path: None,
			persist: false,
		}
	}
}

impl SdkConfig {
	pub fn from_json_str(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	/// File backing the session store, if any.
	///
	/// `storagePath` wins; `persist` alone falls back to the per-user data
	/// directory. `None` means in-memory.
	pub fn storage_file(&self) -> Option<PathBuf> {
		match (&self.storage_path, self.persist) {
			(Some(path), _) => Some(path.clone()),
			(None, true) => Some(FileStorage::default_path()),
			(None, false) => None,
		}
	}

	/// Loads from `path`. A missing file yields defaults; a malformed one is an error.
	pub fn load(path: &Path) -> Result<Self> {
		match std::fs::read_to_string(path) {
			Ok(content) => Self::from_json_str(&content),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(target: "wallet.config", path = %path.display(), "no config file, using defaults");
				Ok(Self::default())
			}
			Err(e) => Err(e.into()),
		}
	}
}
