//! Generic metadata calls answered from `information_schema`.
//!
//! The database is reported as `catalog_name` and `schema_name` is always
//! null. Names are cast to `CHAR` because MySQL 8 reports several
//! `information_schema` columns as binary strings.

use crate::core::traits::MetadataRequest;

const SCHEMAS: &str = r#"
    SELECT
        CAST(SCHEMA_NAME AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(NULL AS CHAR) AS remarks
    FROM information_schema.SCHEMATA
    ORDER BY SCHEMA_NAME
"#;

const SYSTEM_DATA_TYPES: &str = r#"
    SELECT DISTINCT
        CAST(DATA_TYPE AS CHAR) AS type_name,
        CAST(NULL AS CHAR) AS base_type
    FROM information_schema.COLUMNS
    ORDER BY 1
"#;

/// MySQL has no user-defined types.
const USER_DEFINED_DATA_TYPES: &str = r#"
    SELECT
        CAST(NULL AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(NULL AS CHAR) AS type_name,
        CAST(NULL AS CHAR) AS base_type
    FROM DUAL
    WHERE FALSE
"#;

const TABLES: &str = r#"
    SELECT
        CAST(t.TABLE_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(t.TABLE_NAME AS CHAR) AS table_name,
        CAST(CASE t.TABLE_TYPE WHEN 'BASE TABLE' THEN 'TABLE' ELSE t.TABLE_TYPE END AS CHAR) AS table_type,
        CAST(NULLIF(t.TABLE_COMMENT, '') AS CHAR) AS remarks,
        CAST(v.VIEW_DEFINITION AS CHAR) AS definition
    FROM information_schema.TABLES t
    LEFT JOIN information_schema.VIEWS v
        ON v.TABLE_SCHEMA = t.TABLE_SCHEMA AND v.TABLE_NAME = t.TABLE_NAME
    ORDER BY t.TABLE_SCHEMA, t.TABLE_NAME
"#;

const COLUMNS: &str = r#"
    SELECT
        CAST(TABLE_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(TABLE_NAME AS CHAR) AS table_name,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        ORDINAL_POSITION AS ordinal_position,
        CAST(DATA_TYPE AS CHAR) AS type_name,
        COALESCE(CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION) AS column_size,
        NUMERIC_SCALE AS decimal_digits,
        CAST(IS_NULLABLE AS CHAR) AS is_nullable,
        CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
        CAST(NULLIF(COLUMN_COMMENT, '') AS CHAR) AS remarks,
        EXTRA LIKE '%auto_increment%' AS is_autoincrement,
        EXTRA LIKE '%GENERATED%' AS is_generated,
        EXTRA LIKE '%INVISIBLE%' AS is_hidden
    FROM information_schema.COLUMNS
    ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION
"#;

const PRIMARY_KEYS: &str = r#"
    SELECT
        CAST(TABLE_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(TABLE_NAME AS CHAR) AS table_name,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        ORDINAL_POSITION AS key_seq,
        CAST(CONSTRAINT_NAME AS CHAR) AS pk_name
    FROM information_schema.KEY_COLUMN_USAGE
    WHERE CONSTRAINT_NAME = 'PRIMARY'
    ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION
"#;

const INDEXES: &str = r#"
    SELECT
        CAST(TABLE_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(TABLE_NAME AS CHAR) AS table_name,
        CAST(INDEX_NAME AS CHAR) AS index_name,
        NON_UNIQUE AS non_unique,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        SEQ_IN_INDEX AS ordinal_position,
        CAST(INDEX_TYPE AS CHAR) AS index_type
    FROM information_schema.STATISTICS
    ORDER BY TABLE_SCHEMA, TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX
"#;

const TABLE_CONSTRAINTS: &str = r#"
    SELECT
        CAST(tc.TABLE_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(tc.TABLE_NAME AS CHAR) AS table_name,
        CAST(tc.CONSTRAINT_NAME AS CHAR) AS constraint_name,
        CAST(tc.CONSTRAINT_TYPE AS CHAR) AS constraint_type,
        CAST(kcu.COLUMN_NAME AS CHAR) AS column_name,
        CAST(NULL AS CHAR) AS definition
    FROM information_schema.TABLE_CONSTRAINTS tc
    LEFT JOIN information_schema.KEY_COLUMN_USAGE kcu
        ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
        AND kcu.TABLE_NAME = tc.TABLE_NAME
        AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
    ORDER BY 1, 3, 4
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT
        CAST(kcu.CONSTRAINT_NAME AS CHAR) AS fk_name,
        CAST(kcu.REFERENCED_TABLE_SCHEMA AS CHAR) AS pktable_cat,
        CAST(NULL AS CHAR) AS pktable_schem,
        CAST(kcu.REFERENCED_TABLE_NAME AS CHAR) AS pktable_name,
        CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR) AS pkcolumn_name,
        CAST(kcu.TABLE_SCHEMA AS CHAR) AS fktable_cat,
        CAST(NULL AS CHAR) AS fktable_schem,
        CAST(kcu.TABLE_NAME AS CHAR) AS fktable_name,
        CAST(kcu.COLUMN_NAME AS CHAR) AS fkcolumn_name,
        kcu.ORDINAL_POSITION AS key_seq,
        CAST(rc.UPDATE_RULE AS CHAR) AS update_rule,
        CAST(rc.DELETE_RULE AS CHAR) AS delete_rule,
        'NOT DEFERRABLE' AS deferrability
    FROM information_schema.KEY_COLUMN_USAGE kcu
    JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
        ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
        AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
    WHERE kcu.REFERENCED_TABLE_NAME IS NOT NULL
    ORDER BY kcu.TABLE_SCHEMA, kcu.TABLE_NAME, kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

const ROUTINES: &str = r#"
    SELECT
        CAST(ROUTINE_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(ROUTINE_NAME AS CHAR) AS routine_name,
        CAST(SPECIFIC_NAME AS CHAR) AS specific_name,
        CAST(ROUTINE_TYPE AS CHAR) AS routine_type,
        CAST(NULLIF(ROUTINE_COMMENT, '') AS CHAR) AS remarks,
        CAST(ROUTINE_DEFINITION AS CHAR) AS definition,
        CAST(DTD_IDENTIFIER AS CHAR) AS return_type
    FROM information_schema.ROUTINES
    ORDER BY ROUTINE_SCHEMA, ROUTINE_NAME
"#;

const ROUTINE_PARAMETERS: &str = r#"
    SELECT
        CAST(SPECIFIC_SCHEMA AS CHAR) AS catalog_name,
        CAST(NULL AS CHAR) AS schema_name,
        CAST(SPECIFIC_NAME AS CHAR) AS specific_name,
        CAST(PARAMETER_NAME AS CHAR) AS parameter_name,
        ORDINAL_POSITION AS ordinal_position,
        CAST(COALESCE(PARAMETER_MODE, 'RETURN') AS CHAR) AS parameter_mode,
        CAST(DATA_TYPE AS CHAR) AS type_name
    FROM information_schema.PARAMETERS
    ORDER BY SPECIFIC_SCHEMA, SPECIFIC_NAME, ORDINAL_POSITION
"#;

/// SQL for a generic metadata call; `None` where MySQL has no such objects.
pub(super) fn metadata_sql(request: MetadataRequest) -> Option<&'static str> {
    match request {
        MetadataRequest::Schemas => Some(SCHEMAS),
        MetadataRequest::SystemDataTypes => Some(SYSTEM_DATA_TYPES),
        MetadataRequest::UserDefinedDataTypes => Some(USER_DEFINED_DATA_TYPES),
        MetadataRequest::Tables => Some(TABLES),
        MetadataRequest::Columns => Some(COLUMNS),
        MetadataRequest::PrimaryKeys => Some(PRIMARY_KEYS),
        MetadataRequest::Indexes => Some(INDEXES),
        MetadataRequest::TableConstraints => Some(TABLE_CONSTRAINTS),
        MetadataRequest::ForeignKeys => Some(FOREIGN_KEYS),
        MetadataRequest::Routines => Some(ROUTINES),
        MetadataRequest::RoutineParameters => Some(ROUTINE_PARAMETERS),
        MetadataRequest::Sequences | MetadataRequest::Synonyms => None,
    }
}
