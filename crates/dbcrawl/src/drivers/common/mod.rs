//! Utilities shared by the network drivers.
//!
//! - [`tls`]: TLS configuration for PostgreSQL sessions

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
