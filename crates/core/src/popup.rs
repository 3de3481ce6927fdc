//! Single-instance approval popup.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use wallet_runtime::Result;

use crate::config::PopupOptions;

/// Window system hook used to show the wallet's approval pages.
///
/// Windows are addressed by their target name, like `window.open`.
pub trait PopupHost: Send + Sync {
	fn open(&self, target: &str, url: &str, features: &str) -> Result<()>;
	/// Points an already open window at `url` and brings it to the front.
	fn focus(&self, target: &str, url: &str);
	fn is_open(&self, target: &str) -> bool;
	fn close(&self, target: &str);
}

/// Host for environments without a window system.
///
/// Logs the URL the user has to visit and remembers which targets are
/// "open" and every URL shown, so callers can inspect them.
#[derive(Debug, Default)]
pub struct HeadlessPopupHost {
	open: Mutex<HashSet<String>>,
	history: Mutex<Vec<String>>,
}

impl HeadlessPopupHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every URL opened or focused, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.history.lock().clone()
	}
}

impl PopupHost for HeadlessPopupHost {
	fn open(&self, target: &str, url: &str, _features: &str) -> Result<()> {
		tracing::info!(target: "wallet.popup", window = target, url, "open wallet page to continue");
		self.open.lock().insert(target.to_string());
		self.history.lock().push(url.to_string());
		Ok(())
	}

	fn focus(&self, target: &str, url: &str) {
		tracing::info!(target: "wallet.popup", window = target, url, "wallet page refocused");
		self.history.lock().push(url.to_string());
	}

	fn is_open(&self, target: &str) -> bool {
		self.open.lock().contains(target)
	}

	fn close(&self, target: &str) {
		self.open.lock().remove(target);
	}
}

/// Owns the one popup window the SDK may have open.
///
/// Opening while the popup is open reuses and refocuses it.
pub struct PopupController {
	host: Arc<dyn PopupHost>,
	options: PopupOptions,
}

impl PopupController {
	pub fn new(host: Arc<dyn PopupHost>, options: PopupOptions) -> Self {
		Self { host, options }
	}

	pub fn open(&self, url: &str) -> Result<()> {
		let target = &self.options.target;
		if self.host.is_open(target) {
			self.host.focus(target, url);
			Ok(())
		} else {
			self.host.open(target, url, &self.options.features())
		}
	}

	/// Opens and logs failures instead of returning them.
	pub fn open_or_warn(&self, url: &str) {
		if let Err(e) = self.open(url) {
			tracing::warn!(target: "wallet.popup", url, error = %e, "failed to open wallet popup");
		}
	}

	pub fn is_open(&self) -> bool {
		self.host.is_open(&self.options.target)
	}

	/// Best-effort close; never fails.
	pub fn close(&self) {
		if self.is_open() {
			self.host.close(&self.options.target);
		}
	}

	/// Hook for the host page's unload so no popup is orphaned.
	pub fn on_page_unload(&self) {
		self.close();
	}
}

impl std::fmt::Debug for PopupController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PopupController")
			.field("target", &self.options.target)
			.field("open", &self.is_open())
			.finish()
	}
}
