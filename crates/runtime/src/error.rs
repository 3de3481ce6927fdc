//! Error types for wallet providers and their transports.

use serde_json::Value;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification reported to dApp callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// No wallet provider is available where one is required.
	ProviderNotFound,
	/// Connect was asked for a wallet id that is not registered.
	UnknownAdapter,
	/// A connect or transaction wait exceeded its bound.
	Timeout,
	/// The backend reported a terminal failure for a command.
	TransactionFailed,
	/// Channel-level failure (HTTP, push stream, in-page channel).
	TransportError,
	/// Anything else, including opaque backend errors.
	Other,
}

impl ErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ProviderNotFound => "ProviderNotFound",
			Self::UnknownAdapter => "UnknownAdapter",
			Self::Timeout => "Timeout",
			Self::TransactionFailed => "TransactionFailed",
			Self::TransportError => "TransportError",
			Self::Other => "Other",
		}
	}
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors that can occur while discovering, connecting to, or driving a wallet.
#[derive(Debug, Error)]
pub enum Error {
	/// No provider is available for the requested wallet.
	#[error("Wallet provider not found: {0}")]
	ProviderNotFound(String),

	/// An operation needed the active session but none exists.
	#[error("Not connected to a wallet")]
	NotConnected,

	/// Connect was called with an id that no adapter is registered under.
	#[error("Unknown wallet adapter: {0}")]
	UnknownAdapter(String),

	/// Timer expiry on a connect or transaction wait.
	#[error("Timeout after {duration_ms}ms waiting for {operation}")]
	Timeout { operation: String, duration_ms: u64 },

	/// The backend reported `failed` for the command.
	#[error("Transaction with commandId {command_id} failed to execute.")]
	TransactionFailed { command_id: String },

	/// Channel-level failure.
	#[error("Transport error: {0}")]
	Transport(String),

	/// HTTP client failure.
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// Response channel closed before a reply arrived.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Error object returned by the wallet, forwarded as-is.
	#[error("{message}")]
	Rpc {
		code: i64,
		message: String,
		data: Option<Value>,
	},

	/// Failure of a provider request, tagged with the originating method.
	#[error("{method}: {source}")]
	Request {
		method: String,
		#[source]
		source: Box<Error>,
	},

	/// Connect was called while a session is already active.
	#[error("Already connected to wallet '{0}'; disconnect first")]
	AlreadyConnected(String),

	/// The wallet answered `connect` without establishing a connection.
	#[error("Wallet '{wallet_id}' did not connect{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
	ConnectionRefused { wallet_id: String, reason: Option<String> },

	/// The SDK was used before initialization finished.
	#[error("Wallet discovery is not initialized")]
	NotInitialized,

	/// A wait for the same command id is still pending.
	#[error("Command {0} is already pending")]
	DuplicateCommand(String),

	/// The picker was dismissed without a choice.
	#[error("Wallet selection cancelled")]
	PickerCancelled,

	/// Invalid argument provided to a method.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// The provider does not implement the method.
	#[error("Unsupported method: {0}")]
	UnsupportedMethod(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Malformed endpoint URL.
	#[error("Invalid URL: {0}")]
	Url(#[from] url::ParseError),
}

impl Error {
	/// Wraps this error with the method that produced it.
	///
	/// Already-tagged errors keep their innermost method.
	pub fn with_method(self, method: &str) -> Self {
		match self {
			Error::Request { .. } => self,
			other => Error::Request {
				method: method.to_string(),
				source: Box::new(other),
			},
		}
	}

	/// Strips [`Error::Request`] tagging.
	pub fn root(&self) -> &Error {
		match self {
			Error::Request { source, .. } => source.root(),
			other => other,
		}
	}

	/// Returns the originating method if this error was tagged with one.
	pub fn method(&self) -> Option<&str> {
		match self {
			Error::Request { method, .. } => Some(method),
			_ => None,
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self.root() {
			Error::ProviderNotFound(_) | Error::NotConnected => ErrorKind::ProviderNotFound,
			Error::UnknownAdapter(_) => ErrorKind::UnknownAdapter,
			Error::Timeout { .. } => ErrorKind::Timeout,
			Error::TransactionFailed { .. } => ErrorKind::TransactionFailed,
			Error::Transport(_) | Error::Http(_) | Error::ChannelClosed => ErrorKind::TransportError,
			_ => ErrorKind::Other,
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		self.kind() == ErrorKind::Timeout
	}

	/// Returns the command id of a [`Error::TransactionFailed`].
	pub fn command_id(&self) -> Option<&str> {
		match self.root() {
			Error::TransactionFailed { command_id } => Some(command_id),
			Error::DuplicateCommand(command_id) => Some(command_id),
			_ => None,
		}
	}
}

impl From<wallet_protocol::RpcError> for Error {
	fn from(error: wallet_protocol::RpcError) -> Self {
		Error::Rpc {
			code: error.code,
			message: error.message,
			data: error.data,
		}
	}
}
