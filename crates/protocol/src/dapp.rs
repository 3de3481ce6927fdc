//! Params, results and push events of the dApp wallet API.
//!
//! Both the local (extension) and remote (gateway) surfaces share these
//! shapes; the remote surface differs only in [`ConnectResult`] and
//! [`PrepareExecuteResult`], which may point at a user-facing approval URL.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RPC method names.
pub mod methods {
	pub const STATUS: &str = "status";
	pub const CONNECT: &str = "connect";
	pub const DISCONNECT: &str = "disconnect";
	pub const PREPARE_EXECUTE: &str = "prepareExecute";
	pub const PREPARE_EXECUTE_AND_WAIT: &str = "prepareExecuteAndWait";
	pub const LEDGER_API: &str = "ledgerApi";
	pub const LIST_ACCOUNTS: &str = "listAccounts";
	pub const GET_PRIMARY_ACCOUNT: &str = "getPrimaryAccount";
}

/// Push event names.
pub mod events {
	pub const STATUS_CHANGED: &str = "statusChanged";
	pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
	pub const TX_CHANGED: &str = "txChanged";
	pub const CONNECTED: &str = "connected";
}

/// Describes the wallet backend answering the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
	pub id: String,
	pub provider_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Page the user can open to manage the wallet or approve requests.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_url: Option<String>,
}

/// Authentication and network reachability of the wallet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
	pub is_connected: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	#[serde(default)]
	pub is_network_connected: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub network_reason: Option<String>,
}

/// Ledger network the wallet is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
	pub network_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ledger_api: Option<Value>,
}

/// Credential issued by a gateway once the user logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub access_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
}

/// Result of `status` and payload of `statusChanged`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
	pub provider: ProviderInfo,
	pub connection: ConnectionInfo,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub network: Option<Network>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session: Option<Session>,
}

/// Result of the remote `connect` call.
///
/// A gateway that already knows the caller returns a `session` right away;
/// otherwise it returns the `userUrl` where the human has to log in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connection: Option<ConnectionInfo>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session: Option<Session>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_url: Option<String>,
}

/// Params of `prepareExecute` and `prepareExecuteAndWait`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareExecuteParams {
	/// Correlation key for the later `txChanged` events. Generated when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub command_id: Option<String>,
	pub commands: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub act_as: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub read_as: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub disclosed_contracts: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub synchronizer_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub package_id_selection_preference: Option<Vec<String>>,
}

/// Result of the remote `prepareExecute` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareExecuteResult {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_url: Option<String>,
}

/// Signature metadata carried by a `signed` transaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
	pub signature: String,
	pub signed_by: String,
	pub party: String,
}

/// Ledger coordinates of an executed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxExecutedPayload {
	pub update_id: String,
	pub completion_offset: u64,
}

/// Payload of `txChanged`, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TxChangedEvent {
	#[serde(rename_all = "camelCase")]
	Pending { command_id: String },
	#[serde(rename_all = "camelCase")]
	Signed {
		command_id: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		payload: Option<SignedPayload>,
	},
	#[serde(rename_all = "camelCase")]
	Executed {
		command_id: String,
		payload: TxExecutedPayload,
	},
	#[serde(rename_all = "camelCase")]
	Failed { command_id: String },
}

impl TxChangedEvent {
	pub fn command_id(&self) -> &str {
		match self {
			Self::Pending { command_id }
			| Self::Signed { command_id, .. }
			| Self::Executed { command_id, .. }
			| Self::Failed { command_id } => command_id,
		}
	}

	/// `executed` and `failed` end the life of a command.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Executed { .. } | Self::Failed { .. })
	}
}

/// Result of `prepareExecuteAndWait`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareExecuteAndWaitResult {
	pub tx: TxChangedEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
	Get,
	Post,
	Put,
	Delete,
}

/// Params of `ledgerApi`, a proxied call to the ledger JSON API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerApiParams {
	pub request_method: RequestMethod,
	pub resource: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerApiResult {
	pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
	Initialized,
	Allocated,
}

/// One party-bound account held by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
	#[serde(default)]
	pub primary: bool,
	pub party_id: String,
	pub status: WalletStatus,
	#[serde(default)]
	pub hint: String,
	#[serde(default)]
	pub public_key: String,
	#[serde(default)]
	pub namespace: String,
	pub network_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signing_provider_id: Option<String>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_tx_changed_executed() {
		let value = json!({
			"status": "executed",
			"commandId": "cmd-1",
			"payload": {"updateId": "u1", "completionOffset": 42}
		});
		let event: TxChangedEvent = serde_json::from_value(value).unwrap();
		assert!(event.is_terminal());
		assert_eq!(event.command_id(), "cmd-1");
		match event {
			TxChangedEvent::Executed { payload, .. } => {
				assert_eq!(payload.update_id, "u1");
				assert_eq!(payload.completion_offset, 42);
			}
			_ => panic!("Expected Executed"),
		}
	}

	#[test]
	fn test_tx_changed_non_terminal() {
		let pending: TxChangedEvent =
			serde_json::from_value(json!({"status": "pending", "commandId": "c"})).unwrap();
		let signed: TxChangedEvent =
			serde_json::from_value(json!({"status": "signed", "commandId": "c"})).unwrap();
		assert!(!pending.is_terminal());
		assert!(!signed.is_terminal());
	}

	#[test]
	fn test_tx_changed_serializes_status_tag() {
		let json = serde_json::to_value(TxChangedEvent::Failed {
			command_id: "cmd-9".into(),
		})
		.unwrap();
		assert_eq!(json, json!({"status": "failed", "commandId": "cmd-9"}));
	}

	#[test]
	fn test_connect_result_without_session() {
		let value = json!({"session": null, "userUrl": "https://gw.example/approve"});
		let result: ConnectResult = serde_json::from_value(value).unwrap();
		assert!(result.session.is_none());
		assert_eq!(result.user_url.as_deref(), Some("https://gw.example/approve"));
	}

	#[test]
	fn test_prepare_execute_result_carries_only_user_url() {
		let result: PrepareExecuteResult =
			serde_json::from_value(json!({"userUrl": "https://gw.example/approve/c", "commandId": "c"})).unwrap();
		assert_eq!(result.user_url.as_deref(), Some("https://gw.example/approve/c"));
		assert_eq!(
			serde_json::to_value(&result).unwrap(),
			json!({"userUrl": "https://gw.example/approve/c"})
		);
		assert_eq!(serde_json::to_value(PrepareExecuteResult::default()).unwrap(), json!({}));
	}

	#[test]
	fn test_status_event_minimal_connection() {
		let value = json!({
			"provider": {"id": "remote-da", "providerType": "remote"},
			"connection": {"isConnected": true}
		});
		let status: StatusEvent = serde_json::from_value(value).unwrap();
		assert!(status.connection.is_connected);
		assert!(!status.connection.is_network_connected);
		assert!(status.session.is_none());
	}

	#[test]
	fn test_prepare_params_camel_case() {
		let params = PrepareExecuteParams {
			command_id: Some("cmd-1".into()),
			commands: json!([{"CreateCommand": {}}]),
			act_as: Some(vec!["alice::1220".into()]),
			..Default::default()
		};
		let json = serde_json::to_value(&params).unwrap();
		assert_eq!(json["commandId"], "cmd-1");
		assert_eq!(json["actAs"][0], "alice::1220");
		assert!(json.get("readAs").is_none());
	}

	#[test]
	fn test_ledger_api_method_uppercase() {
		let params = LedgerApiParams {
			request_method: RequestMethod::Get,
			resource: "/v2/version".into(),
			body: None,
		};
		let json = serde_json::to_value(&params).unwrap();
		assert_eq!(json["requestMethod"], "GET");
	}
}
