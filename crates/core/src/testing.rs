//! Fakes shared by the unit tests of this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use wallet_runtime::{Error, EventHub, Result};

use crate::adapter::{Adapter, WalletInfo, WalletKind};
use crate::provider::Provider;

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value> + Send + Sync>;

/// Provider answering from a closure and recording every call.
pub struct ScriptedProvider {
	events: EventHub,
	handler: Handler,
	calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedProvider {
	pub fn new<F>(handler: F) -> Arc<Self>
	where
		F: Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static,
	{
		Arc::new(Self {
			events: EventHub::new(),
			handler: Box::new(handler),
			calls: Mutex::new(Vec::new()),
		})
	}

	/// A provider whose `status` reports `connected`, everything else `null`.
	pub fn connected(connected: bool) -> Arc<Self> {
		Self::new(move |method, _| {
			Ok(match method {
				"status" => status_json(connected),
				"connect" => json!({"isConnected": true}),
				_ => Value::Null,
			})
		})
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
	}

	pub fn params_of(&self, method: &str) -> Option<Value> {
		self.calls
			.lock()
			.iter()
			.rev()
			.find(|(m, _)| m == method)
			.map(|(_, p)| p.clone())
	}
}

#[async_trait]
impl Provider for ScriptedProvider {
	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		self.calls.lock().push((method.to_string(), params.clone()));
		(self.handler)(method, &params).map_err(|e| e.with_method(method))
	}

	fn events(&self) -> &EventHub {
		&self.events
	}
}

pub fn status_json(connected: bool) -> Value {
	json!({
		"provider": {"id": "test", "providerType": "remote", "userUrl": "https://wallet.example/"},
		"connection": {"isConnected": connected, "isNetworkConnected": connected}
	})
}

/// Adapter handing out a prepared provider, with scripted detect/restore.
pub struct FakeAdapter {
	pub info: WalletInfo,
	pub available: AtomicBool,
	pub provider: Arc<ScriptedProvider>,
	pub restore_outcome: Mutex<RestoreOutcome>,
	pub torn_down: AtomicUsize,
	pub create_fails: AtomicBool,
}

#[derive(Clone, Copy, Debug)]
pub enum RestoreOutcome {
	Unsupported,
	None,
	Restored,
	Fails,
}

impl FakeAdapter {
	pub fn new(id: &str, provider: Arc<ScriptedProvider>) -> Arc<Self> {
		Arc::new(Self {
			info: WalletInfo {
				id: id.to_string(),
				name: format!("Fake {id}"),
				kind: WalletKind::Gateway,
				icon: None,
				description: None,
				url: Some(format!("https://{id}.example/rpc")),
			},
			available: AtomicBool::new(true),
			provider,
			restore_outcome: Mutex::new(RestoreOutcome::Unsupported),
			torn_down: AtomicUsize::new(0),
			create_fails: AtomicBool::new(false),
		})
	}

	pub fn with_restore(self: Arc<Self>, outcome: RestoreOutcome) -> Arc<Self> {
		*self.restore_outcome.lock() = outcome;
		self
	}

	pub fn with_available(self: Arc<Self>, available: bool) -> Arc<Self> {
		self.available.store(available, Ordering::SeqCst);
		self
	}

	pub fn teardowns(&self) -> usize {
		self.torn_down.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Adapter for FakeAdapter {
	fn info(&self) -> WalletInfo {
		self.info.clone()
	}

	async fn detect(&self) -> bool {
		self.available.load(Ordering::SeqCst)
	}

	fn create_provider(&self) -> Result<Arc<dyn Provider>> {
		if self.create_fails.load(Ordering::SeqCst) {
			return Err(Error::Transport("cannot build provider".into()));
		}
		Ok(self.provider.clone())
	}

	fn teardown(&self) {
		self.torn_down.fetch_add(1, Ordering::SeqCst);
	}

	fn can_restore(&self) -> bool {
		!matches!(*self.restore_outcome.lock(), RestoreOutcome::Unsupported)
	}

	async fn restore(&self) -> Result<Option<Arc<dyn Provider>>> {
		let outcome = *self.restore_outcome.lock();
		match outcome {
			RestoreOutcome::Unsupported | RestoreOutcome::None => Ok(None),
			RestoreOutcome::Restored => Ok(Some(self.provider.clone() as Arc<dyn Provider>)),
			RestoreOutcome::Fails => Err(Error::Rpc {
				code: 401,
				message: "session expired".into(),
				data: None,
			}),
		}
	}
}
