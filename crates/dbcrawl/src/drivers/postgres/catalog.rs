//! Generic metadata calls answered from `pg_catalog` and `information_schema`.
//!
//! Every query returns the standard labels of its request, with names cast
//! to `text` so rows decode without domain types.

use crate::core::traits::MetadataRequest;

const SCHEMAS: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        obj_description(n.oid, 'pg_namespace') AS remarks
    FROM pg_catalog.pg_namespace n
    ORDER BY n.nspname
"#;

const SYSTEM_DATA_TYPES: &str = r#"
    SELECT
        t.typname::text AS type_name,
        NULL::text AS base_type
    FROM pg_catalog.pg_type t
    JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
    WHERE n.nspname = 'pg_catalog'
      AND t.typtype = 'b'
      AND t.typname NOT LIKE '\_%'
    ORDER BY t.typname
"#;

const USER_DEFINED_DATA_TYPES: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        t.typname::text AS type_name,
        bt.typname::text AS base_type
    FROM pg_catalog.pg_type t
    JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
    LEFT JOIN pg_catalog.pg_type bt ON bt.oid = t.typbasetype
    WHERE t.typtype IN ('e', 'd')
      AND n.nspname NOT IN ('pg_catalog', 'information_schema')
    ORDER BY n.nspname, t.typname
"#;

const TABLES: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        c.relname::text AS table_name,
        CASE c.relkind
            WHEN 'r' THEN 'TABLE'
            WHEN 'p' THEN 'TABLE'
            WHEN 'v' THEN 'VIEW'
            WHEN 'm' THEN 'MATERIALIZED VIEW'
            ELSE 'OTHER'
        END AS table_type,
        obj_description(c.oid, 'pg_class') AS remarks,
        CASE WHEN c.relkind IN ('v', 'm') THEN pg_get_viewdef(c.oid, true) END AS definition
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')
      AND NOT c.relispartition
    ORDER BY n.nspname, c.relname
"#;

const COLUMNS: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        c.relname::text AS table_name,
        a.attname::text AS column_name,
        a.attnum::int4 AS ordinal_position,
        tn.nspname::text AS type_schema,
        t.typname::text AS type_name,
        information_schema._pg_char_max_length(a.atttypid, a.atttypmod) AS column_size,
        information_schema._pg_numeric_scale(a.atttypid, a.atttypmod) AS decimal_digits,
        NOT a.attnotnull AS is_nullable,
        pg_get_expr(d.adbin, d.adrelid) AS column_default,
        col_description(c.oid, a.attnum) AS remarks,
        (a.attidentity <> '' OR pg_get_expr(d.adbin, d.adrelid) LIKE 'nextval(%') AS is_autoincrement,
        (a.attgenerated <> '') AS is_generated
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
    JOIN pg_catalog.pg_namespace tn ON tn.oid = t.typnamespace
    LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
    WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY n.nspname, c.relname, a.attnum
"#;

const PRIMARY_KEYS: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        t.relname::text AS table_name,
        a.attname::text AS column_name,
        k.ord::int4 AS key_seq,
        con.conname::text AS pk_name
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE con.contype = 'p'
    ORDER BY 1, 2, 4
"#;

const INDEXES: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        t.relname::text AS table_name,
        i.relname::text AS index_name,
        NOT ix.indisunique AS non_unique,
        a.attname::text AS column_name,
        k.ord::int4 AS ordinal_position,
        am.amname::text AS index_type
    FROM pg_catalog.pg_index ix
    JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
    JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_am am ON am.oid = i.relam
    CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
    LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    ORDER BY 1, 2, 3, 6
"#;

const TABLE_CONSTRAINTS: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        t.relname::text AS table_name,
        con.conname::text AS constraint_name,
        CASE con.contype
            WHEN 'c' THEN 'CHECK'
            WHEN 'u' THEN 'UNIQUE'
            WHEN 'p' THEN 'PRIMARY KEY'
            WHEN 'f' THEN 'FOREIGN KEY'
            ELSE 'OTHER'
        END AS constraint_type,
        a.attname::text AS column_name,
        pg_get_constraintdef(con.oid, true) AS definition
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    LEFT JOIN LATERAL unnest(con.conkey) AS k(attnum) ON true
    LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    ORDER BY 1, 2, 3
"#;

const FOREIGN_KEYS: &str = r#"
    SELECT
        con.conname::text AS fk_name,
        pn.nspname::text AS pktable_schem,
        pt.relname::text AS pktable_name,
        pa.attname::text AS pkcolumn_name,
        fn.nspname::text AS fktable_schem,
        ft.relname::text AS fktable_name,
        fa.attname::text AS fkcolumn_name,
        k.ord::int4 AS key_seq,
        con.confupdtype::text AS update_rule,
        con.confdeltype::text AS delete_rule,
        CASE
            WHEN NOT con.condeferrable THEN 'NOT DEFERRABLE'
            WHEN con.condeferred THEN 'INITIALLY DEFERRED'
            ELSE 'INITIALLY IMMEDIATE'
        END AS deferrability
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class ft ON ft.oid = con.conrelid
    JOIN pg_catalog.pg_namespace fn ON fn.oid = ft.relnamespace
    JOIN pg_catalog.pg_class pt ON pt.oid = con.confrelid
    JOIN pg_catalog.pg_namespace pn ON pn.oid = pt.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(fk_attnum, pk_attnum, ord)
    JOIN pg_catalog.pg_attribute fa ON fa.attrelid = ft.oid AND fa.attnum = k.fk_attnum
    JOIN pg_catalog.pg_attribute pa ON pa.attrelid = pt.oid AND pa.attnum = k.pk_attnum
    WHERE con.contype = 'f'
    ORDER BY 5, 6, 1, 8
"#;

const ROUTINES: &str = r#"
    SELECT
        n.nspname::text AS schema_name,
        p.proname::text AS routine_name,
        (p.proname || '_' || p.oid)::text AS specific_name,
        CASE p.prokind WHEN 'p' THEN 'PROCEDURE' ELSE 'FUNCTION' END AS routine_type,
        obj_description(p.oid, 'pg_proc') AS remarks,
        pg_get_functiondef(p.oid) AS definition,
        pg_get_function_result(p.oid) AS return_type
    FROM pg_catalog.pg_proc p
    JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
    WHERE p.prokind IN ('f', 'p')
    ORDER BY n.nspname, p.proname, p.oid
"#;

const ROUTINE_PARAMETERS: &str = r#"
    SELECT
        specific_schema::text AS schema_name,
        specific_name::text AS specific_name,
        parameter_name::text AS parameter_name,
        ordinal_position::int4 AS ordinal_position,
        parameter_mode::text AS parameter_mode,
        udt_schema::text AS type_schema,
        udt_name::text AS type_name
    FROM information_schema.parameters
    ORDER BY 1, 2, 4
"#;

const SEQUENCES: &str = r#"
    SELECT
        sequence_schema::text AS schema_name,
        sequence_name::text AS sequence_name,
        increment::text::int8 AS increment,
        minimum_value::text::int8 AS minimum_value,
        maximum_value::text::int8 AS maximum_value,
        cycle_option::text AS cycle_option
    FROM information_schema.sequences
    ORDER BY 1, 2
"#;

/// SQL for a generic metadata call; `None` where PostgreSQL has no such objects.
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
        MetadataRequest::Sequences => Some(SEQUENCES),
        MetadataRequest::Synonyms => None,
    }
}
