//! # pointing-hub
//!
//! Real-time hub for collaborative planning-poker estimation.
//!
//! Clients connect over WebSocket, register a display name, submit an
//! estimate, and receive a fresh snapshot of every participant after each
//! change. One hub task owns all session state; connections only talk to
//! it through a bounded event queue.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Connection tasks (ws/)      REST Handlers (api/)
//!     │         │                              │
//!     │         └──────────┬───────────────────┘
//!     │                    ▼
//!     ├── EventQueue (service/)   bounded MPSC
//!     │                    ▼
//!     ├── Hub (service/)          single consumer
//!     │     ├── SessionRegistry (domain/)
//!     │     └── Broadcaster (service/) ──► per-connection outbound channels
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
