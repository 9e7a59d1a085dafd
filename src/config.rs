//! Hub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level server configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Maximum number of pending messages in the event queue.
    pub event_queue_capacity: usize,

    /// How long a connection waits for queue space before dropping an event.
    pub enqueue_timeout: Duration,

    /// Maximum number of unsent snapshots buffered per connection.
    pub outbound_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            event_queue_capacity: 1000,
            enqueue_timeout: Duration::from_millis(5000),
            outbound_buffer: 64,
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to [`HubConfig::default`] values when a variable is not
    /// set. Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let event_queue_capacity =
            parse_env("EVENT_QUEUE_CAPACITY", defaults.event_queue_capacity).max(1);
        let enqueue_timeout = Duration::from_millis(parse_env(
            "ENQUEUE_TIMEOUT_MS",
            u64::try_from(defaults.enqueue_timeout.as_millis()).unwrap_or(5000),
        ));
        let outbound_buffer = parse_env("OUTBOUND_BUFFER", defaults.outbound_buffer).max(1);

        Ok(Self {
            listen_addr,
            event_queue_capacity,
            enqueue_timeout,
            outbound_buffer,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
