//! In-page messages exchanged between the dApp and the wallet extension.
//!
//! Every message is a JSON object tagged by `type`. The dApp posts
//! [`WindowMessage::Request`] and the extension answers with
//! [`WindowMessage::Response`] carrying the same request id. Detection is a
//! [`WindowMessage::ExtReady`] probe answered by [`WindowMessage::ExtAck`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

/// A message posted on the in-page channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WindowMessage {
	/// dApp to extension call.
	#[serde(rename = "SPLICE_WALLET_REQUEST")]
	Request { request: JsonRpcRequest },
	/// Extension reply, correlated by `response.id`.
	#[serde(rename = "SPLICE_WALLET_RESPONSE")]
	Response { response: JsonRpcResponse },
	/// Detection probe.
	#[serde(rename = "SPLICE_WALLET_EXT_READY")]
	ExtReady,
	/// Detection acknowledgement.
	#[serde(rename = "SPLICE_WALLET_EXT_ACK")]
	ExtAck,
	/// Asks the extension to show its UI at `url`.
	#[serde(rename = "SPLICE_WALLET_EXT_OPEN")]
	ExtOpen { url: String },
	/// Out-of-band notification that the user approved a gateway login.
	#[serde(rename = "SPLICE_WALLET_IDP_AUTH_SUCCESS")]
	IdpAuthSuccess {
		token: String,
		#[serde(rename = "sessionId")]
		session_id: String,
	},
	/// The wallet UI logged the user out.
	#[serde(rename = "SPLICE_WALLET_LOGOUT")]
	Logout,
	/// Push event raised by the extension (`statusChanged`, `txChanged`, ...).
	#[serde(rename = "SPLICE_WALLET_EVENT")]
	Event {
		event: String,
		#[serde(default)]
		payload: Value,
	},
}

impl WindowMessage {
	/// Wire tag of this message.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Request { .. } => "SPLICE_WALLET_REQUEST",
			Self::Response { .. } => "SPLICE_WALLET_RESPONSE",
			Self::ExtReady => "SPLICE_WALLET_EXT_READY",
			Self::ExtAck => "SPLICE_WALLET_EXT_ACK",
			Self::ExtOpen { .. } => "SPLICE_WALLET_EXT_OPEN",
			Self::IdpAuthSuccess { .. } => "SPLICE_WALLET_IDP_AUTH_SUCCESS",
			Self::Logout => "SPLICE_WALLET_LOGOUT",
			Self::Event { .. } => "SPLICE_WALLET_EVENT",
		}
	}

	/// Parses a raw posted value, returning `None` for foreign messages.
	///
	/// Pages receive messages from many sources; anything that is not one of
	/// ours is dropped without error.
	pub fn from_value(value: Value) -> Option<Self> {
		serde_json::from_value(value).ok()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_request_has_type_tag() {
		let msg = WindowMessage::Request {
			request: JsonRpcRequest::new("id-1", "status", Value::Null),
		};
		let json = serde_json::to_value(&msg).unwrap();
		assert_eq!(json["type"], "SPLICE_WALLET_REQUEST");
		assert_eq!(json["request"]["method"], "status");
		assert_eq!(json["request"]["jsonrpc"], "2.0");
	}

	#[test]
	fn test_unit_variants_serialize_to_tag_only() {
		let json = serde_json::to_string(&WindowMessage::ExtReady).unwrap();
		assert_eq!(json, r#"{"type":"SPLICE_WALLET_EXT_READY"}"#);
		let json = serde_json::to_string(&WindowMessage::Logout).unwrap();
		assert_eq!(json, r#"{"type":"SPLICE_WALLET_LOGOUT"}"#);
	}

	#[test]
	fn test_idp_auth_success_deserialization() {
		let value = json!({
			"type": "SPLICE_WALLET_IDP_AUTH_SUCCESS",
			"token": "jwt",
			"sessionId": "s-1"
		});
		match WindowMessage::from_value(value) {
			Some(WindowMessage::IdpAuthSuccess { token, session_id }) => {
				assert_eq!(token, "jwt");
				assert_eq!(session_id, "s-1");
			}
			other => panic!("Expected IdpAuthSuccess, got {other:?}"),
		}
	}

	#[test]
	fn test_response_roundtrip_keeps_id() {
		let value = json!({
			"type": "SPLICE_WALLET_RESPONSE",
			"response": {"jsonrpc": "2.0", "id": "abc", "result": null}
		});
		let msg = WindowMessage::from_value(value).unwrap();
		assert_eq!(msg.kind(), "SPLICE_WALLET_RESPONSE");
		match msg {
			WindowMessage::Response { response } => {
				assert_eq!(response.id.unwrap().to_string(), "abc");
			}
			_ => panic!("Expected Response"),
		}
	}

	#[test]
	fn test_foreign_message_is_ignored() {
		assert!(WindowMessage::from_value(json!({"type": "webpackOk"})).is_none());
		assert!(WindowMessage::from_value(json!("hello")).is_none());
	}
}
