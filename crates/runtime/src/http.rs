//! JSON-RPC over HTTP with a server-sent-events push channel.
//!
//! Every call is a POST of a JSON-RPC envelope to the gateway's RPC URL. Once
//! a bearer token is installed, it is attached to every request and a push
//! stream is kept open at `<rpcUrl>/events?token=<token>`. Named SSE events
//! are emitted into the transport's [`EventHub`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;
use wallet_protocol::{JsonRpcRequest, JsonRpcResponse};

use crate::error::{Error, Result};
use crate::events::EventHub;
use crate::transport::Transport;

/// SSE events without an `event:` field arrive under this name.
pub const DEFAULT_SSE_EVENT: &str = "message";

/// HTTP transport to a remote wallet gateway.
pub struct HttpTransport {
	client: reqwest::Client,
	rpc_url: Url,
	token: RwLock<Option<String>>,
	events: EventHub,
	next_id: AtomicU64,
	stream: Mutex<Option<JoinHandle<()>>>,
}

impl HttpTransport {
	pub fn new(rpc_url: &str) -> Result<Self> {
		Self::with_client(reqwest::Client::new(), rpc_url)
	}

	pub fn with_client(client: reqwest::Client, rpc_url: &str) -> Result<Self> {
		Ok(Self {
			client,
			rpc_url: Url::parse(rpc_url)?,
			token: RwLock::new(None),
			events: EventHub::new(),
			next_id: AtomicU64::new(1),
			stream: Mutex::new(None),
		})
	}

	pub fn rpc_url(&self) -> &Url {
		&self.rpc_url
	}

	pub fn token(&self) -> Option<String> {
		self.token.read().clone()
	}

	/// Installs or clears the bearer token.
	///
	/// A changed token reopens the push stream; clearing it closes the
	/// stream. Setting the current token again only reopens a stream that
	/// has died (rejected, unreachable, or ended).
	pub fn set_token(&self, token: Option<String>) {
		{
			let mut current = self.token.write();
			if *current == token && (token.is_none() || self.events_open()) {
				return;
			}
			*current = token.clone();
		}

		self.close_events();
		if let Some(token) = token {
			self.open_events(&token);
		}
	}

	/// URL of the push stream for `token`.
	pub fn events_url(&self, token: &str) -> Result<Url> {
		let base = format!("{}/events", self.rpc_url.as_str().trim_end_matches('/'));
		Ok(Url::parse_with_params(&base, &[("token", token)])?)
	}

	/// Whether a push stream task is currently running.
	pub fn events_open(&self) -> bool {
		self.stream.lock().as_ref().is_some_and(|handle| !handle.is_finished())
	}

	fn open_events(&self, token: &str) {
		let url = match self.events_url(token) {
			Ok(url) => url,
			Err(e) => {
				tracing::error!(target: "wallet.runtime", error = %e, "cannot build event stream URL");
				return;
			}
		};
		let Ok(handle) = tokio::runtime::Handle::try_current() else {
			tracing::warn!(target: "wallet.runtime", "no tokio runtime; event stream not opened");
			return;
		};
		let task = handle.spawn(run_event_stream(self.client.clone(), url, self.events.clone()));
		*self.stream.lock() = Some(task);
	}

	/// Closes the push stream if one is open.
	pub fn close_events(&self) {
		if let Some(task) = self.stream.lock().take() {
			task.abort();
			tracing::debug!(target: "wallet.runtime", url = %self.rpc_url, "event stream closed");
		}
	}
}

async fn run_event_stream(client: reqwest::Client, url: Url, events: EventHub) {
	tracing::debug!(target: "wallet.runtime", url = %redact(&url), "opening event stream");
	let resp = match client
		.get(url.clone())
		.header(ACCEPT, HeaderValue::from_static("text/event-stream"))
		.send()
		.await
	{
		Ok(resp) if resp.status().is_success() => resp,
		Ok(resp) => {
			tracing::error!(target: "wallet.runtime", status = %resp.status(), "event stream rejected");
			return;
		}
		Err(e) => {
			tracing::error!(target: "wallet.runtime", error = %e, "event stream connection failed");
			return;
		}
	};

	let mut stream = resp.bytes_stream().eventsource();
	while let Some(event) = stream.next().await {
		match event {
			Ok(event) => {
				let name = if event.event.is_empty() {
					DEFAULT_SSE_EVENT
				} else {
					event.event.as_str()
				};
				tracing::debug!(target: "wallet.runtime", event = name, "gateway event");
				events.emit(name, &parse_event_data(&event.data));
			}
			Err(e) => {
				tracing::error!(target: "wallet.runtime", error = %e, "event stream error; closing");
				return;
			}
		}
	}
	tracing::debug!(target: "wallet.runtime", "event stream ended");
}

/// Parses an SSE `data` field.
///
/// A single-element array is unwrapped to its element; non-JSON data is
/// forwarded as a string.
pub fn parse_event_data(data: &str) -> Value {
	match serde_json::from_str::<Value>(data) {
		Ok(Value::Array(mut items)) if items.len() == 1 => items.remove(0),
		Ok(value) => value,
		Err(_) => Value::String(data.to_string()),
	}
}

fn redact(url: &Url) -> String {
	let mut url = url.clone();
	url.set_query(Some("token=***"));
	url.to_string()
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		tracing::debug!(target: "wallet.runtime", id, method, url = %self.rpc_url, "http request");

		let mut request = self
			.client
			.post(self.rpc_url.clone())
			.json(&JsonRpcRequest::new(id, method, params));
		if let Some(token) = self.token() {
			request = request.bearer_auth(token);
		}

		let resp = request.send().await?;
		let status = resp.status();
		let body = resp.text().await?;

		match serde_json::from_str::<JsonRpcResponse>(&body) {
			Ok(response) => response.into_result().map_err(Error::from),
			Err(_) if !status.is_success() => Err(Error::Transport(format!(
				"HTTP {}: {}",
				status.as_u16(),
				status.canonical_reason().unwrap_or(body.as_str())
			))),
			Err(e) => Err(Error::Transport(format!("malformed JSON-RPC response: {e}"))),
		}
	}

	fn events(&self) -> &EventHub {
		&self.events
	}
}

impl Drop for HttpTransport {
	fn drop(&mut self) {
		if let Some(task) = self.stream.get_mut().take() {
			task.abort();
		}
	}
}

#[cfg(test)]
mod tests;
