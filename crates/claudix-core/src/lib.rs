//! Foundational utilities shared across claudix crates.
//!
//! Provides atomic text persistence for the host config store, unix-time
//! helpers, and correlation-id generation for the RPC layer.

pub mod atomic_io;
pub mod ids;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use ids::RequestIdGenerator;
pub use time_utils::current_unix_timestamp_ms;
