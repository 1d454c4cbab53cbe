//! SQL Server capability descriptor.

use crate::core::identifier::IdentifierRules;
use crate::core::traits::CapabilityDescriptor;

/// Schemas owned by the engine and by fixed database roles.
const SYSTEM_SCHEMAS: &[&str] = &[
    "sys",
    "INFORMATION_SCHEMA",
    "guest",
    "db_owner",
    "db_accessadmin",
    "db_securityadmin",
    "db_ddladmin",
    "db_backupoperator",
    "db_datareader",
    "db_datawriter",
    "db_denydatareader",
    "db_denydatawriter",
];

#[derive(Debug, Clone, Default)]
pub struct MssqlDescriptor;

impl MssqlDescriptor {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityDescriptor for MssqlDescriptor {
    fn name(&self) -> &str {
        "mssql"
    }

    fn identifier_rules(&self) -> IdentifierRules {
        IdentifierRules::mssql()
    }

    fn system_schemas(&self) -> &[&str] {
        SYSTEM_SCHEMAS
    }
}
