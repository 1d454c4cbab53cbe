//! Generic metadata calls answered from the `sys` catalog views.
//!
//! Every result carries `catalog_name` from `DB_NAME()` so objects are keyed
//! by database and schema.

use crate::core::traits::MetadataRequest;

const SCHEMAS: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        CAST(ep.value AS NVARCHAR(4000)) AS remarks
    FROM sys.schemas s
    LEFT JOIN sys.extended_properties ep
        ON ep.class = 3 AND ep.major_id = s.schema_id AND ep.name = 'MS_Description'
    ORDER BY s.name
"#;

const SYSTEM_DATA_TYPES: &str = r#"
    SELECT
        t.name AS type_name,
        CAST(NULL AS NVARCHAR(128)) AS base_type
    FROM sys.types t
    WHERE t.is_user_defined = 0
    ORDER BY t.name
"#;

const USER_DEFINED_DATA_TYPES: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        t.name AS type_name,
        bt.name AS base_type
    FROM sys.types t
    JOIN sys.schemas s ON s.schema_id = t.schema_id
    LEFT JOIN sys.types bt ON bt.user_type_id = t.system_type_id
    WHERE t.is_user_defined = 1
    ORDER BY s.name, t.name
"#;

const TABLES: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        o.name AS table_name,
        CASE o.type WHEN 'V' THEN 'VIEW' ELSE 'TABLE' END AS table_type,
        CAST(ep.value AS NVARCHAR(4000)) AS remarks,
        m.definition AS definition
    FROM sys.objects o
    JOIN sys.schemas s ON s.schema_id = o.schema_id
    LEFT JOIN sys.sql_modules m ON m.object_id = o.object_id
    LEFT JOIN sys.extended_properties ep
        ON ep.class = 1 AND ep.major_id = o.object_id AND ep.minor_id = 0
        AND ep.name = 'MS_Description'
    WHERE o.type IN ('U', 'V')
      AND o.is_ms_shipped = 0
    ORDER BY s.name, o.name
"#;

const COLUMNS: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        o.name AS table_name,
        c.name AS column_name,
        c.column_id AS ordinal_position,
        ts.name AS type_schema,
        t.name AS type_name,
        CAST(CASE WHEN c.max_length = -1 THEN NULL ELSE c.max_length END AS INT) AS column_size,
        CAST(c.scale AS INT) AS decimal_digits,
        c.is_nullable AS is_nullable,
        dc.definition AS column_default,
        CAST(ep.value AS NVARCHAR(4000)) AS remarks,
        c.is_identity AS is_autoincrement,
        c.is_computed AS is_generated,
        CAST(COLUMNPROPERTY(c.object_id, c.name, 'IsHidden') AS BIT) AS is_hidden
    FROM sys.columns c
    JOIN sys.objects o ON o.object_id = c.object_id
    JOIN sys.schemas s ON s.schema_id = o.schema_id
    JOIN sys.types t ON t.user_type_id = c.user_type_id
    JOIN sys.schemas ts ON ts.schema_id = t.schema_id
    LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id
    LEFT JOIN sys.extended_properties ep
        ON ep.class = 1 AND ep.major_id = c.object_id AND ep.minor_id = c.column_id
        AND ep.name = 'MS_Description'
    WHERE o.type IN ('U', 'V')
      AND o.is_ms_shipped = 0
    ORDER BY s.name, o.name, c.column_id
"#;

const PRIMARY_KEYS: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        o.name AS table_name,
        c.name AS column_name,
        CAST(ic.key_ordinal AS INT) AS key_seq,
        kc.name AS pk_name
    FROM sys.key_constraints kc
    JOIN sys.objects o ON o.object_id = kc.parent_object_id
    JOIN sys.schemas s ON s.schema_id = o.schema_id
    JOIN sys.index_columns ic
        ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE kc.type = 'PK'
    ORDER BY s.name, o.name, ic.key_ordinal
"#;

const INDEXES: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        o.name AS table_name,
        i.name AS index_name,
        CAST(CASE WHEN i.is_unique = 1 THEN 0 ELSE 1 END AS BIT) AS non_unique,
        c.name AS column_name,
        CAST(ic.key_ordinal AS INT) AS ordinal_position,
        i.type_desc AS index_type
    FROM sys.indexes i
    JOIN sys.objects o ON o.object_id = i.object_id
    JOIN sys.schemas s ON s.schema_id = o.schema_id
    JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE i.name IS NOT NULL
      AND o.is_ms_shipped = 0
      AND ic.is_included_column = 0
    ORDER BY s.name, o.name, i.name, ic.key_ordinal
"#;

const TABLE_CONSTRAINTS: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        tc.TABLE_SCHEMA AS schema_name,
        tc.TABLE_NAME AS table_name,
        tc.CONSTRAINT_NAME AS constraint_name,
        tc.CONSTRAINT_TYPE AS constraint_type,
        ccu.COLUMN_NAME AS column_name,
        cc.CHECK_CLAUSE AS definition
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    LEFT JOIN INFORMATION_SCHEMA.CONSTRAINT_COLUMN_USAGE ccu
        ON ccu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
        AND ccu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
    LEFT JOIN INFORMATION_SCHEMA.CHECK_CONSTRAINTS cc
        ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
        AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
    ORDER BY 2, 3, 4
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT
        fk.name AS fk_name,
        DB_NAME() AS pktable_cat,
        ps.name AS pktable_schem,
        pt.name AS pktable_name,
        pc.name AS pkcolumn_name,
        DB_NAME() AS fktable_cat,
        fs.name AS fktable_schem,
        ft.name AS fktable_name,
        fc.name AS fkcolumn_name,
        CAST(fkc.constraint_column_id AS INT) AS key_seq,
        REPLACE(fk.update_referential_action_desc, '_', ' ') AS update_rule,
        REPLACE(fk.delete_referential_action_desc, '_', ' ') AS delete_rule,
        'NOT DEFERRABLE' AS deferrability
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN sys.tables ft ON ft.object_id = fk.parent_object_id
    JOIN sys.schemas fs ON fs.schema_id = ft.schema_id
    JOIN sys.columns fc ON fc.object_id = fkc.parent_object_id AND fc.column_id = fkc.parent_column_id
    JOIN sys.tables pt ON pt.object_id = fk.referenced_object_id
    JOIN sys.schemas ps ON ps.schema_id = pt.schema_id
    JOIN sys.columns pc
        ON pc.object_id = fkc.referenced_object_id AND pc.column_id = fkc.referenced_column_id
    ORDER BY fs.name, ft.name, fk.name, fkc.constraint_column_id
"#;

const ROUTINES: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        o.name AS routine_name,
        o.name AS specific_name,
        CASE WHEN o.type IN ('P', 'PC') THEN 'PROCEDURE' ELSE 'FUNCTION' END AS routine_type,
        CAST(ep.value AS NVARCHAR(4000)) AS remarks,
        m.definition AS definition,
        rt.name AS return_type
    FROM sys.objects o
    JOIN sys.schemas s ON s.schema_id = o.schema_id
    LEFT JOIN sys.sql_modules m ON m.object_id = o.object_id
    LEFT JOIN sys.parameters rp ON rp.object_id = o.object_id AND rp.parameter_id = 0
    LEFT JOIN sys.types rt ON rt.user_type_id = rp.user_type_id
    LEFT JOIN sys.extended_properties ep
        ON ep.class = 1 AND ep.major_id = o.object_id AND ep.minor_id = 0
        AND ep.name = 'MS_Description'
    WHERE o.type IN ('P', 'PC', 'FN', 'IF', 'TF', 'FS', 'FT')
      AND o.is_ms_shipped = 0
    ORDER BY s.name, o.name
"#;

const ROUTINE_PARAMETERS: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        o.name AS specific_name,
        p.name AS parameter_name,
        p.parameter_id AS ordinal_position,
        CASE WHEN p.is_output = 1 THEN 'INOUT' ELSE 'IN' END AS parameter_mode,
        ts.name AS type_schema,
        t.name AS type_name
    FROM sys.parameters p
    JOIN sys.objects o ON o.object_id = p.object_id
    JOIN sys.schemas s ON s.schema_id = o.schema_id
    JOIN sys.types t ON t.user_type_id = p.user_type_id
    JOIN sys.schemas ts ON ts.schema_id = t.schema_id
    WHERE p.parameter_id > 0
      AND o.is_ms_shipped = 0
    ORDER BY s.name, o.name, p.parameter_id
"#;

const SEQUENCES: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        q.name AS sequence_name,
        CAST(q.increment AS BIGINT) AS increment,
        CAST(q.minimum_value AS BIGINT) AS minimum_value,
        CAST(q.maximum_value AS BIGINT) AS maximum_value,
        q.is_cycling AS cycle_option
    FROM sys.sequences q
    JOIN sys.schemas s ON s.schema_id = q.schema_id
    ORDER BY s.name, q.name
"#;

const SYNONYMS: &str = r#"
    SELECT
        DB_NAME() AS catalog_name,
        s.name AS schema_name,
        sn.name AS synonym_name,
        sn.base_object_name AS referenced_object,
        CAST(ep.value AS NVARCHAR(4000)) AS remarks
    FROM sys.synonyms sn
    JOIN sys.schemas s ON s.schema_id = sn.schema_id
    LEFT JOIN sys.extended_properties ep
        ON ep.class = 1 AND ep.major_id = sn.object_id AND ep.minor_id = 0
        AND ep.name = 'MS_Description'
    ORDER BY s.name, sn.name
"#;

pub(super) fn metadata_sql(request: MetadataRequest) -> &'static str {
    match request {
        MetadataRequest::Schemas => SCHEMAS,
        MetadataRequest::SystemDataTypes => SYSTEM_DATA_TYPES,
        MetadataRequest::UserDefinedDataTypes => USER_DEFINED_DATA_TYPES,
        MetadataRequest::Tables => TABLES,
        MetadataRequest::Columns => COLUMNS,
        MetadataRequest::PrimaryKeys => PRIMARY_KEYS,
        MetadataRequest::Indexes => INDEXES,
        MetadataRequest::TableConstraints => TABLE_CONSTRAINTS,
        MetadataRequest::ForeignKeys => FOREIGN_KEYS,
        MetadataRequest::Routines => ROUTINES,
        MetadataRequest::RoutineParameters => ROUTINE_PARAMETERS,
        MetadataRequest::Sequences => SEQUENCES,
        MetadataRequest::Synonyms => SYNONYMS,
    }
}
