//! Process-wide tracing setup shared by every Orbit host.

pub mod subscriber;

pub use subscriber::{LogFormat, SubscriberConfig};

/// Install the default subscriber: JSON lines, filtered by `RUST_LOG`
/// (falling back to `info`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::install(&SubscriberConfig::default());
}
