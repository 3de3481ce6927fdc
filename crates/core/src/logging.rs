//! Optional subscriber setup for binaries and examples embedding the SDK.
//!
//! The library itself only emits `tracing` events under `wallet.*` targets.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs a compact stderr subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity`. Calling this twice is harmless.
pub fn init_logging(verbosity: u8) {
	// 0 = warnings only
	// 1 = lifecycle (connect, restore, disconnect)
	// 2+ = message flow
	let filter = match verbosity {
		0 => "warn",
		1 => "warn,wallet=info",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_init_logging_twice_is_harmless() {
		init_logging(0);
		init_logging(2);
		tracing::debug!(target: "wallet.discovery", "logging installed");
	}
}
