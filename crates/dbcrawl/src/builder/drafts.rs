//! Field bundles handed from retrievers to the builder.
//!
//! Fields a row did not provide stay `Loaded::NotRequested` and never
//! overwrite what an earlier row supplied.

use crate::core::load::Loaded;
use crate::core::schema::{
    Column, ConstraintKind, DataTypeId, Deferrability, ForeignKeyRule, ParameterMode, RoutineKind,
    SchemaRef, TableKind, ColumnId,
};

#[derive(Debug, Clone)]
pub struct TableDraft {
    pub name: String,
    pub kind: TableKind,
    pub remarks: Loaded<String>,
    pub definition: Loaded<String>,
}

impl TableDraft {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            remarks: Loaded::NotRequested,
            definition: Loaded::NotRequested,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataTypeDraft {
    pub name: String,
    pub user_defined: bool,
    pub base_type: Loaded<String>,
}

impl DataTypeDraft {
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_defined: false,
            base_type: Loaded::NotRequested,
        }
    }

    pub fn user_defined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_defined: true,
            base_type: Loaded::NotRequested,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnDraft {
    pub name: String,
    pub ordinal: Loaded<i64>,
    pub data_type: Loaded<DataTypeId>,
    pub size: Loaded<i64>,
    pub decimal_digits: Loaded<i64>,
    pub nullable: Loaded<bool>,
    pub default_value: Loaded<String>,
    pub remarks: Loaded<String>,
    pub auto_incremented: Loaded<bool>,
    pub generated: Loaded<bool>,
    pub hidden: Loaded<bool>,
    pub parameter_mode: Loaded<ParameterMode>,
}

impl ColumnDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn merge_into(self, column: &mut Column) {
        column.ordinal.merge(self.ordinal);
        column.data_type.merge(self.data_type);
        column.size.merge(self.size);
        column.decimal_digits.merge(self.decimal_digits);
        column.nullable.merge(self.nullable);
        column.default_value.merge(self.default_value);
        column.remarks.merge(self.remarks);
        column.auto_incremented.merge(self.auto_incremented);
        column.generated.merge(self.generated);
        column.hidden.merge(self.hidden);
        column.parameter_mode.merge(self.parameter_mode);
    }
}

#[derive(Debug, Clone)]
pub struct IndexDraft {
    pub name: String,
    pub unique: bool,
    pub index_type: Loaded<String>,
}

#[derive(Debug, Clone)]
pub struct ConstraintDraft {
    pub name: String,
    pub kind: ConstraintKind,
    pub definition: Loaded<String>,
    pub column: Option<ColumnId>,
}

#[derive(Debug, Clone)]
pub struct RoutineDraft {
    pub name: String,
    pub specific_name: Option<String>,
    pub kind: RoutineKind,
    pub remarks: Loaded<String>,
    pub definition: Loaded<String>,
    pub return_type: Loaded<String>,
}

impl RoutineDraft {
    pub fn new(name: impl Into<String>, kind: RoutineKind) -> Self {
        Self {
            name: name.into(),
            specific_name: None,
            kind,
            remarks: Loaded::NotRequested,
            definition: Loaded::NotRequested,
            return_type: Loaded::NotRequested,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SequenceDraft {
    pub name: String,
    pub increment: Loaded<i64>,
    pub minimum: Loaded<i64>,
    pub maximum: Loaded<i64>,
    pub cycle: Loaded<bool>,
    pub remarks: Loaded<String>,
}

#[derive(Debug, Clone)]
pub struct SynonymDraft {
    pub name: String,
    pub referenced_object: Loaded<String>,
    pub remarks: Loaded<String>,
}

/// Names one endpoint column of a foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLocator {
    pub schema: SchemaRef,
    pub table: String,
    pub column: String,
    /// The endpoint lies outside the inclusion rules.
    pub excluded: bool,
}

impl ColumnLocator {
    pub fn display_name(&self) -> String {
        let schema = self.schema.full_name();
        if schema.is_empty() {
            format!("{}.{}", self.table, self.column)
        } else {
            format!("{}.{}.{}", schema, self.table, self.column)
        }
    }
}

/// One column pair of a foreign key, as reported by one row.
#[derive(Debug, Clone)]
pub struct ForeignKeyDraft {
    pub name: Option<String>,
    pub key_sequence: i64,
    pub primary: ColumnLocator,
    pub foreign: ColumnLocator,
    pub update_rule: Loaded<ForeignKeyRule>,
    pub delete_rule: Loaded<ForeignKeyRule>,
    pub deferrability: Loaded<Deferrability>,
}
