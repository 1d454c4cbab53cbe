//! Microsoft SQL Server driver.
//!
//! - [`MssqlDescriptor`]: capabilities and system schemas
//! - [`MssqlConnection`]: Tiberius metadata session

mod catalog;
mod connection;
mod descriptor;

pub use connection::MssqlConnection;
pub use descriptor::MssqlDescriptor;
