//! JSON-RPC 2.0 envelopes shared by both transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version string carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier. Wallets answer with whatever form they were sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	Number(u64),
	String(String),
}

impl From<u64> for RequestId {
	fn from(id: u64) -> Self {
		Self::Number(id)
	}
}

impl From<String> for RequestId {
	fn from(id: String) -> Self {
		Self::String(id)
	}
}

impl From<&str> for RequestId {
	fn from(id: &str) -> Self {
		Self::String(id.to_string())
	}
}

impl std::fmt::Display for RequestId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::String(s) => f.write_str(s),
		}
	}
}

/// Outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
	pub jsonrpc: String,
	pub id: RequestId,
	pub method: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub params: Option<Value>,
}

impl JsonRpcRequest {
	/// Builds a 2.0 request. `Value::Null` params are omitted on the wire.
	pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id: id.into(),
			method: method.into(),
			params: (!params.is_null()).then_some(params),
		}
	}
}

/// Error object of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

/// Either the `result` or the `error` member of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponsePayload {
	#[serde(rename = "result")]
	Success(Value),
	#[serde(rename = "error")]
	Failure(RpcError),
}

/// Reply to a [`JsonRpcRequest`].
///
/// The id is optional because HTTP gateways may answer a transport failure
/// with an error object that was never correlated to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
	#[serde(default = "default_version")]
	pub jsonrpc: String,
	#[serde(default)]
	pub id: Option<RequestId>,
	#[serde(flatten)]
	pub payload: ResponsePayload,
}

fn default_version() -> String {
	JSONRPC_VERSION.to_string()
}

impl JsonRpcResponse {
	pub fn success(id: impl Into<RequestId>, result: Value) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id: Some(id.into()),
			payload: ResponsePayload::Success(result),
		}
	}

	pub fn failure(id: impl Into<RequestId>, error: RpcError) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id: Some(id.into()),
			payload: ResponsePayload::Failure(error),
		}
	}

	/// Converts the payload into a plain `Result`.
	pub fn into_result(self) -> Result<Value, RpcError> {
		match self.payload {
			ResponsePayload::Success(value) => Ok(value),
			ResponsePayload::Failure(error) => Err(error),
		}
	}
}
