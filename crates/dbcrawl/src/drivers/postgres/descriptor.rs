//! PostgreSQL capability descriptor.

use async_trait::async_trait;
use futures::StreamExt;

use crate::core::identifier::IdentifierRules;
use crate::core::schema::ColumnDataType;
use crate::core::traits::{CapabilityDescriptor, EnumTypeProbe, MetadataConnection, MetadataRequest};
use crate::error::Result;
use crate::strategy::ObjectCategory;

/// Sequence details from `pg_sequences`, which also carries the comment.
const SEQUENCES_SQL: &str = r#"
    SELECT
        s.schemaname::text AS schema_name,
        s.sequencename::text AS sequence_name,
        s.increment_by AS increment,
        s.min_value AS minimum_value,
        s.max_value AS maximum_value,
        s.cycle AS cycle_option,
        obj_description(c.oid, 'pg_class') AS remarks
    FROM pg_catalog.pg_sequences s
    JOIN pg_catalog.pg_namespace n ON n.nspname = s.schemaname
    JOIN pg_catalog.pg_class c ON c.relnamespace = n.oid AND c.relname = s.sequencename
    ORDER BY s.schemaname, s.sequencename
"#;

/// Labels of an enumerated type in declaration order.
const ENUM_VALUES_SQL: &str = r#"
    SELECT e.enumlabel::text AS enumlabel
    FROM pg_catalog.pg_enum e
    JOIN pg_catalog.pg_type t ON e.enumtypid = t.oid
    WHERE t.typname = $1
    ORDER BY e.enumsortorder
"#;

#[derive(Debug, Clone, Default)]
pub struct PostgresDescriptor {
    probe: PgEnumProbe,
}

impl PostgresDescriptor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CapabilityDescriptor for PostgresDescriptor {
    fn name(&self) -> &str {
        "postgres"
    }

    fn identifier_rules(&self) -> IdentifierRules {
        IdentifierRules::postgres()
    }

    fn supports(&self, category: ObjectCategory) -> bool {
        category != ObjectCategory::Synonyms
    }

    fn retrieval_override(&self, request: &MetadataRequest) -> Option<String> {
        match request {
            MetadataRequest::Sequences => Some(SEQUENCES_SQL.to_string()),
            _ => None,
        }
    }

    fn system_schemas(&self) -> &[&str] {
        &["pg_catalog", "information_schema", "pg_toast"]
    }

    fn enum_probe(&self) -> Option<&dyn EnumTypeProbe> {
        Some(&self.probe)
    }
}

/// Looks enumerated types up in `pg_enum` by type name.
#[derive(Debug, Clone, Default)]
pub struct PgEnumProbe;

#[async_trait]
impl EnumTypeProbe for PgEnumProbe {
    async fn enum_values(
        &self,
        connection: &dyn MetadataConnection,
        data_type: &ColumnDataType,
    ) -> Result<Vec<String>> {
        let mut rows = connection.query(ENUM_VALUES_SQL, &[data_type.name.as_str()]).await?;
        let mut values = Vec::new();
        while let Some(row) = rows.next().await {
            if let Some(label) = row?.string("enumlabel") {
                values.push(label);
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CatalogBuilder, DataTypeDraft};
    use crate::core::schema::SchemaRef;
    use crate::core::Loaded;
    use crate::drivers::memory::MemoryConnection;
    use crate::strategy::DetailLevels;

    #[test]
    fn test_postgres_capabilities() {
        let d = PostgresDescriptor::new();
        assert_eq!(d.name(), "postgres");
        assert!(!d.supports(ObjectCategory::Synonyms));
        assert!(d.supports(ObjectCategory::Sequences));
        assert!(d.is_system_schema("pg_catalog"));
        assert!(!d.is_system_schema("public"));
        // identity is case-sensitive
        assert!(!d.is_system_schema("PG_CATALOG"));
    }

    #[test]
    fn test_sequences_use_catalog_sql() {
        let d = PostgresDescriptor::new();
        let sql = d.retrieval_override(&MetadataRequest::Sequences).unwrap();
        assert!(sql.contains("pg_sequences"));
        assert!(d.retrieval_override(&MetadataRequest::Tables).is_none());
    }

    #[tokio::test]
    async fn test_enum_probe_reads_labels_in_order() {
        let conn = MemoryConnection::from_yaml(
            r#"
db_type: postgres
queries:
  - contains: pg_enum
    params: [mood]
    rows:
      - { enumlabel: sad }
      - { enumlabel: ok }
      - { enumlabel: happy }
"#,
        )
        .unwrap();

        let fields = DetailLevels::builtin().resolve("detailed").unwrap();
        let mut b = CatalogBuilder::new(IdentifierRules::postgres(), fields);
        let cp = b.begin_phase(ObjectCategory::Schemas).unwrap();
        let public = b
            .upsert_schema(SchemaRef::new(None, Some("public")), Loaded::Absent)
            .unwrap();
        b.complete_phase(cp).unwrap();
        let cp = b.begin_phase(ObjectCategory::ColumnDataTypes).unwrap();
        let mood = b
            .upsert_data_type(Some(public), DataTypeDraft::user_defined("mood"))
            .unwrap();

        let d = PostgresDescriptor::new();
        let probe = d.enum_probe().unwrap();
        let values = probe
            .enum_values(&conn, b.data_type(mood).unwrap())
            .await
            .unwrap();
        assert_eq!(values, vec!["sad", "ok", "happy"]);
        b.complete_phase(cp).unwrap();
    }
}
