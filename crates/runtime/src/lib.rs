//! Wallet runtime - transports, event hub, and error taxonomy
//!
//! This crate provides the low-level plumbing a wallet provider sits on:
//!
//! - **Errors**: one [`Error`] enum classified into an [`ErrorKind`] taxonomy
//! - **Events**: a named-event hub with RAII [`Subscription`] handles
//! - **Transport**: the [`Transport`] trait with two implementations
//!   - [`WindowTransport`]: JSON-RPC over the in-page [`InPageChannel`] (extension)
//!   - [`HttpTransport`]: JSON-RPC over HTTP plus an SSE push stream (gateway)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ wallet-discovery │  Providers, bridge, adapters, registry
//! └────────┬─────────┘
//!          │ Transport trait
//! ┌────────▼─────────┐
//! │  wallet-runtime  │  This crate
//! │  ┌────────────┐  │
//! │  │ EventHub   │  │  push events, listener handles
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Window/Http│  │  request correlation, SSE
//! │  └────────────┘  │
//! └──────────────────┘
//! ```

pub mod channel;
pub mod error;
pub mod events;
pub mod http;
pub mod transport;
pub mod window;

pub use channel::InPageChannel;
pub use error::{Error, ErrorKind, Result};
pub use events::{EventHub, HandlerId, Listener, Subscription, next_handler_id};
pub use http::HttpTransport;
pub use transport::Transport;
pub use window::WindowTransport;
