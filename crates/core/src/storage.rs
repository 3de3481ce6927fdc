//! Durable key-value string stores backing the session store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use wallet_runtime::Result;

/// Key-value string store with `get`/`set`/`remove` semantics.
pub trait Storage: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>>;
	fn set(&self, key: &str, value: &str) -> Result<()>;
	fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Storage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		self.entries.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.entries.lock().remove(key);
		Ok(())
	}
}

/// Store persisted as one JSON object file.
///
/// The file is re-read on every access so several processes sharing it see
/// each other's writes. An unreadable or malformed file reads as empty.
#[derive(Debug)]
pub struct FileStorage {
	path: PathBuf,
	lock: Mutex<()>,
}

impl FileStorage {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	/// `<data dir>/wallet-discovery/storage.json`, falling back to the working directory.
	pub fn default_path() -> PathBuf {
		dirs::data_dir()
			.unwrap_or_else(|| PathBuf::from("."))
			.join("wallet-discovery")
			.join("storage.json")
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
		let _guard = self.lock.lock();
		let mut entries = load_json(&self.path).unwrap_or_default();
		f(&mut entries);
		save_json(&self.path, &entries)
	}
}

impl Storage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>> {
		let _guard = self.lock.lock();
		let entries: BTreeMap<String, String> = load_json(&self.path).unwrap_or_default();
		Ok(entries.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		self.update(|entries| {
			entries.insert(key.to_string(), value.to_string());
		})
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.update(|entries| {
			entries.remove(key);
		})
	}
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
	fs::read_to_string(path)
		.ok()
		.and_then(|content| serde_json::from_str(&content).ok())
}

fn save_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::write(path, serde_json::to_string_pretty(data)?)?;
	Ok(())
}
