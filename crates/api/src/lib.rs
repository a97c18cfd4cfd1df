//! Cart API plumbing - the HTTP client and the connectivity monitor
//!
//! - `client` - [`HttpCartApi`], the reqwest implementation of
//!   [`CartApi`](cartchat_core::CartApi)
//! - `monitor` - [`ConnectivityMonitor`], health probes with bounded retries and platform
//!   switching
//!
//! # Driving the monitor
//!
//! ```text
//! probe() ──fail──▶ retry pending ──wait_for_retry()──▶ on_retry_due()
//!    ▲                                                    │
//!    └──────────── interval().tick() ─▶ tick() ◀──────────┘ (after max_retries)
//! ```

pub mod client;
pub mod monitor;

pub use client::HttpCartApi;
pub use monitor::{ConnectivityMonitor, RetryPolicy};
