//! PostgreSQL driver.
//!
//! - [`PostgresDescriptor`]: capabilities, `pg_sequences` retrieval, and the
//!   `pg_enum` probe
//! - [`PostgresConnection`]: tokio-postgres metadata session

mod catalog;
mod connection;
mod descriptor;

pub use connection::PostgresConnection;
pub use descriptor::{PgEnumProbe, PostgresDescriptor};
