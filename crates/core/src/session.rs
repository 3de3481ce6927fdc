//! Durable record of the last used wallet and its credential.
//!
//! Three keys are kept in the backing [`Storage`]:
//!
//! - [`DISCOVERY_KEY`]: which adapter (kind + endpoint) was last connected
//! - [`SESSION_KEY`]: the credential a gateway issued
//! - [`RECENT_GATEWAYS_KEY`]: custom gateways the user picked, newest first
//!
//! Values are JSON. Malformed values and storage failures are logged and
//! read as absent; write failures are logged and never propagated.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wallet_protocol::Session;

use crate::adapter::{WalletId, WalletKind};
use crate::storage::Storage;

pub const DISCOVERY_KEY: &str = "wallet.discovery";
pub const SESSION_KEY: &str = "wallet.session";
pub const RECENT_GATEWAYS_KEY: &str = "wallet.recent_gateways";

/// Most recent custom gateways kept for the picker.
pub const MAX_RECENT_GATEWAYS: usize = 5;

/// Which adapter the last session was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryPointer {
	pub wallet_id: WalletId,
	pub kind: WalletKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Copy of a gateway session plus the page where the user manages it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
	pub session: Session,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGateway {
	pub name: String,
	pub rpc_url: String,
}

#[derive(Clone)]
pub struct SessionStore {
	storage: Arc<dyn Storage>,
}

impl SessionStore {
	pub fn new(storage: Arc<dyn Storage>) -> Self {
		Self { storage }
	}

	pub fn discovery(&self) -> Option<DiscoveryPointer> {
		self.read(DISCOVERY_KEY)
	}

	pub fn set_discovery(&self, pointer: &DiscoveryPointer) {
		self.write(DISCOVERY_KEY, pointer);
	}

	pub fn session(&self) -> Option<StoredSession> {
		self.read(SESSION_KEY)
	}

	pub fn set_session(&self, session: &StoredSession) {
		self.write(SESSION_KEY, session);
	}

	/// Forgets the discovery pointer and the session credential.
	pub fn clear(&self) {
		for key in [DISCOVERY_KEY, SESSION_KEY] {
			if let Err(e) = self.storage.remove(key) {
				tracing::warn!(target: "wallet.store", key, error = %e, "failed to remove stored value");
			}
		}
	}

	pub fn recent_gateways(&self) -> Vec<RecentGateway> {
		self.read(RECENT_GATEWAYS_KEY).unwrap_or_default()
	}

	/// Moves `gateway` to the front, deduplicated by URL and capped.
	pub fn push_recent_gateway(&self, gateway: RecentGateway) {
		let mut recent = self.recent_gateways();
		recent.retain(|g| g.rpc_url != gateway.rpc_url);
		recent.insert(0, gateway);
		recent.truncate(MAX_RECENT_GATEWAYS);
		self.write(RECENT_GATEWAYS_KEY, &recent);
	}

	fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		let raw = match self.storage.get(key) {
			Ok(raw) => raw?,
			Err(e) => {
				tracing::warn!(target: "wallet.store", key, error = %e, "failed to read stored value");
				return None;
			}
		};
		match serde_json::from_str(&raw) {
			Ok(value) => Some(value),
			Err(e) => {
				tracing::warn!(target: "wallet.store", key, error = %e, "ignoring malformed stored value");
				None
			}
		}
	}

	fn write<T: Serialize>(&self, key: &str, value: &T) {
		let result = serde_json::to_string(value)
			.map_err(wallet_runtime::Error::from)
			.and_then(|json| self.storage.set(key, &json));
		if let Err(e) = result {
			tracing::warn!(target: "wallet.store", key, error = %e, "failed to persist value");
		}
	}
}

impl std::fmt::Debug for SessionStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionStore").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::MemoryStorage;

	fn store() -> (SessionStore, Arc<MemoryStorage>) {
		let storage = Arc::new(MemoryStorage::new());
		(SessionStore::new(storage.clone()), storage)
	}

	#[test]
	fn test_discovery_roundtrip_and_clear() {
		let (store, _) = store();
		let pointer = DiscoveryPointer {
			wallet_id: "gateway:https://gw.example/rpc".into(),
			kind: WalletKind::Gateway,
			url: Some("https://gw.example/rpc".into()),
		};
		store.set_discovery(&pointer);
		store.set_session(&StoredSession {
			session: Session {
				access_token: "t".into(),
				user_id: None,
			},
			user_url: None,
		});
		assert_eq!(store.discovery(), Some(pointer));

		store.clear();
		assert!(store.discovery().is_none());
		assert!(store.session().is_none());
	}

	#[test]
	fn test_malformed_value_reads_as_absent() {
		let (store, storage) = store();
		storage.set(SESSION_KEY, "{\"session\": 12").unwrap();
		assert!(store.session().is_none());
	}

	#[test]
	fn test_recent_gateways_dedup_and_cap() {
		let (store, _) = store();
		for i in 0..7 {
			store.push_recent_gateway(RecentGateway {
				name: format!("gw{i}"),
				rpc_url: format!("https://gw{i}.example/rpc"),
			});
		}
		store.push_recent_gateway(RecentGateway {
			name: "again".into(),
			rpc_url: "https://gw4.example/rpc".into(),
		});

		let recent = store.recent_gateways();
		assert_eq!(recent.len(), MAX_RECENT_GATEWAYS);
		assert_eq!(recent[0].name, "again");
		assert_eq!(recent[1].rpc_url, "https://gw6.example/rpc");
		assert_eq!(recent.iter().filter(|g| g.rpc_url == "https://gw4.example/rpc").count(), 1);
	}

	#[test]
	fn test_recent_gateways_survive_clear() {
		let (store, _) = store();
		store.push_recent_gateway(RecentGateway {
			name: "gw".into(),
			rpc_url: "https://gw.example/rpc".into(),
		});
		store.clear();
		assert_eq!(store.recent_gateways().len(), 1);
	}
}
