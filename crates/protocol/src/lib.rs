//! Wire types for the dApp wallet surfaces.
//!
//! Nothing in this crate performs I/O. It only describes what travels over
//! the in-page message channel and the HTTP gateway:
//!
//! - [`jsonrpc`] - JSON-RPC 2.0 request and response envelopes
//! - [`message`] - the tagged window messages exchanged with the extension
//! - [`dapp`] - request params, results and push events of the dApp API

pub mod dapp;
pub mod jsonrpc;
pub mod message;

pub use dapp::{
	ConnectResult, ConnectionInfo, LedgerApiParams, LedgerApiResult, Network, PrepareExecuteAndWaitResult,
	PrepareExecuteParams, PrepareExecuteResult, ProviderInfo, RequestMethod, Session, SignedPayload,
	StatusEvent, TxChangedEvent, TxExecutedPayload, Wallet, WalletStatus, events, methods,
};
pub use jsonrpc::{JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, RequestId, ResponsePayload, RpcError};
pub use message::WindowMessage;
