//! MySQL and MariaDB driver.
//!
//! MySQL has no schemas inside a database, so every object is keyed by its
//! database as the catalog and a null schema.

#[cfg(feature = "mysql")]
mod catalog;
#[cfg(feature = "mysql")]
mod connection;
mod descriptor;

#[cfg(feature = "mysql")]
pub use connection::MysqlConnection;
pub use descriptor::MysqlDescriptor;
