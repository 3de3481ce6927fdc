//! In-page message bus between the dApp and the wallet extension.

use tokio::sync::broadcast;
use wallet_protocol::WindowMessage;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus standing in for the page's `postMessage` target.
///
/// Every subscriber sees every message, including the ones it posted itself,
/// so readers filter by message type.
#[derive(Clone, Debug)]
pub struct InPageChannel {
	tx: broadcast::Sender<WindowMessage>,
}

impl InPageChannel {
	pub fn new() -> Self {
		let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
		Self { tx }
	}

	/// Posts a message. Posting with nobody listening is not an error.
	pub fn post(&self, message: WindowMessage) {
		let kind = message.kind();
		match self.tx.send(message) {
			Ok(receivers) => tracing::trace!(target: "wallet.channel", kind, receivers, "posted"),
			Err(_) => tracing::trace!(target: "wallet.channel", kind, "posted with no listeners"),
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
		self.tx.subscribe()
	}
}

impl Default for InPageChannel {
	fn default() -> Self {
		Self::new()
	}
}
