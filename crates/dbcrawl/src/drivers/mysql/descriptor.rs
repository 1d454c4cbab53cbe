//! MySQL capability descriptor.

use crate::core::identifier::IdentifierRules;
use crate::core::traits::CapabilityDescriptor;
use crate::strategy::ObjectCategory;

#[derive(Debug, Clone, Default)]
pub struct MysqlDescriptor;

impl MysqlDescriptor {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityDescriptor for MysqlDescriptor {
    fn name(&self) -> &str {
        "mysql"
    }

    fn identifier_rules(&self) -> IdentifierRules {
        IdentifierRules::mysql()
    }

    fn supports(&self, category: ObjectCategory) -> bool {
        !matches!(
            category,
            ObjectCategory::Sequences | ObjectCategory::Synonyms
        )
    }

    fn system_schemas(&self) -> &[&str] {
        &["information_schema", "mysql", "performance_schema", "sys"]
    }
}
