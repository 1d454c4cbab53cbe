//! Descriptor registry for explicit dependency injection.
//!
//! The [`DriverRegistry`] maps database family names to capability
//! descriptors. It is constructed explicitly and handed to the crawler, so
//! tests can register their own descriptors without global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CrawlError, Result};

use super::traits::CapabilityDescriptor;

/// Name of the family used when no dedicated descriptor applies.
pub const GENERIC: &str = "generic";

/// Registry of capability descriptors by family name.
#[derive(Default)]
pub struct DriverRegistry {
    descriptors: HashMap<String, Arc<dyn CapabilityDescriptor>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with PostgreSQL, SQL Server, MySQL, and generic descriptors.
    pub fn with_builtins() -> Self {
        use crate::drivers::generic::GenericDescriptor;
        use crate::drivers::mssql::MssqlDescriptor;
        use crate::drivers::mysql::MysqlDescriptor;
        use crate::drivers::postgres::PostgresDescriptor;

        let mut registry = Self::new();
        registry.register(PostgresDescriptor::new());
        registry.register(MssqlDescriptor::new());
        registry.register(MysqlDescriptor::new());
        registry.register(GenericDescriptor::new());
        registry
    }

    /// Register a descriptor under its own name.
    pub fn register(&mut self, descriptor: impl CapabilityDescriptor + 'static) {
        self.register_arc(Arc::new(descriptor));
    }

    /// Register a shared descriptor under its own name.
    pub fn register_arc(&mut self, descriptor: Arc<dyn CapabilityDescriptor>) {
        self.descriptors
            .insert(descriptor.name().to_string(), descriptor);
    }

    /// Get a descriptor by family name (aliases accepted).
    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityDescriptor>> {
        let key = Self::normalize_db_type(name).unwrap_or(name);
        self.descriptors.get(key).cloned()
    }

    /// Get a descriptor by name, returning an error if not found.
    pub fn require(&self, name: &str) -> Result<Arc<dyn CapabilityDescriptor>> {
        self.get(name)
            .ok_or_else(|| CrawlError::Config(format!("Unknown database type: {}", name)))
    }

    /// Pick the descriptor for a connection type.
    ///
    /// A family with a dedicated descriptor never silently degrades to the
    /// generic one: if the dedicated descriptor is missing from this
    /// registry, resolution fails unless `allow_generic_fallback` is set.
    pub fn resolve(
        &self,
        db_type: &str,
        allow_generic_fallback: bool,
    ) -> Result<Arc<dyn CapabilityDescriptor>> {
        if let Some(descriptor) = self.get(db_type) {
            return Ok(descriptor);
        }

        let known_family = Self::normalize_db_type(db_type).is_some();
        if allow_generic_fallback {
            if let Some(generic) = self.descriptors.get(GENERIC) {
                tracing::warn!(
                    "No descriptor registered for '{}'; using generic metadata retrieval",
                    db_type
                );
                return Ok(generic.clone());
            }
        }

        if known_family {
            Err(CrawlError::Config(format!(
                "Database type '{}' needs its dedicated descriptor, which is not registered. \
                 Set allow_generic_fallback to crawl it with generic metadata calls",
                db_type
            )))
        } else {
            Err(CrawlError::Config(format!(
                "Unknown database type: '{}'. Supported types: {}",
                db_type,
                self.names().join(", ")
            )))
        }
    }

    /// Check if a family is registered.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered family names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Canonical family name for the aliases of the built-in families:
    /// - "postgres", "postgresql", "pg" → "postgres"
    /// - "mssql", "sqlserver", "sql_server" → "mssql"
    /// - "mysql", "mariadb" → "mysql"
    /// - "generic", "unknown" → "generic"
    pub fn normalize_db_type(db_type: &str) -> Option<&'static str> {
        match db_type.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some("postgres"),
            "mssql" | "sqlserver" | "sql_server" => Some("mssql"),
            "mysql" | "mariadb" => Some("mysql"),
            "generic" | "unknown" => Some(GENERIC),
            _ => None,
        }
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("descriptors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identifier::IdentifierRules;
    use crate::strategy::ObjectCategory;

    struct MockDescriptor(&'static str);

    impl CapabilityDescriptor for MockDescriptor {
        fn name(&self) -> &str {
            self.0
        }

        fn identifier_rules(&self) -> IdentifierRules {
            IdentifierRules::ansi()
        }

        fn supports(&self, category: ObjectCategory) -> bool {
            category != ObjectCategory::Synonyms
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = DriverRegistry::new();
        assert!(registry.names().is_empty());
        assert!(registry.get("postgres").is_none());
        assert!(registry.require("postgres").is_err());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = DriverRegistry::new();
        registry.register(MockDescriptor("oracle"));
        assert!(registry.has("oracle"));
        let d = registry.require("oracle").unwrap();
        assert!(!d.supports(ObjectCategory::Synonyms));
    }

    #[test]
    fn test_builtins_with_aliases() {
        let registry = DriverRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["generic", "mssql", "mysql", "postgres"]);
        assert_eq!(registry.require("PostgreSQL").unwrap().name(), "postgres");
        assert_eq!(registry.require("sqlserver").unwrap().name(), "mssql");
        assert_eq!(registry.require("mariadb").unwrap().name(), "mysql");
    }

    #[test]
    fn test_known_family_without_descriptor_refuses_generic() {
        let mut registry = DriverRegistry::new();
        registry.register(crate::drivers::generic::GenericDescriptor::new());

        let err = registry.resolve("postgres", false).err().unwrap();
        assert!(err.to_string().contains("dedicated descriptor"));

        let d = registry.resolve("postgres", true).unwrap();
        assert_eq!(d.name(), "generic");
    }

    #[test]
    fn test_unknown_family() {
        let registry = DriverRegistry::with_builtins();
        let err = registry.resolve("informix", false).err().unwrap();
        assert!(err.to_string().contains("Unknown database type"));
        assert_eq!(registry.resolve("informix", true).unwrap().name(), "generic");
    }

    #[test]
    fn test_normalize_db_type() {
        assert_eq!(DriverRegistry::normalize_db_type("PG"), Some("postgres"));
        assert_eq!(DriverRegistry::normalize_db_type("sql_server"), Some("mssql"));
        assert_eq!(DriverRegistry::normalize_db_type("unknown"), Some("generic"));
        assert_eq!(DriverRegistry::normalize_db_type("db2"), None);
    }

    #[test]
    fn test_debug_lists_names() {
        let registry = DriverRegistry::with_builtins();
        let debug = format!("{:?}", registry);
        assert!(debug.contains("postgres"));
    }
}
