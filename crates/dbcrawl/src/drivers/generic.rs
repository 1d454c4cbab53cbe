//! Descriptor for database families without a dedicated one.
//!
//! Uses only the generic metadata calls, standard SQL quoting, and no
//! family-specific categories.

use crate::core::identifier::IdentifierRules;
use crate::core::registry::GENERIC;
use crate::core::traits::CapabilityDescriptor;
use crate::strategy::ObjectCategory;

#[derive(Debug, Clone, Default)]
pub struct GenericDescriptor;

impl GenericDescriptor {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityDescriptor for GenericDescriptor {
    fn name(&self) -> &str {
        GENERIC
    }

    fn identifier_rules(&self) -> IdentifierRules {
        IdentifierRules::ansi()
    }

    fn supports(&self, category: ObjectCategory) -> bool {
        category != ObjectCategory::Synonyms
    }

    fn system_schemas(&self) -> &[&str] {
        &["INFORMATION_SCHEMA"]
    }
}
