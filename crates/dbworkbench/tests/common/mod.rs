//! Scripted metadata session shared by the integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use dbworkbench::meta;
use dbworkbench::{
    Cx, Error, MetaQuery, MetaSession, Result, Row, RowStream, Value, VecRowStream,
};

pub fn row(columns: &[(&str, Value)]) -> Row {
    Row::new(
        columns.iter().map(|(n, _)| (*n).to_string()).collect(),
        columns.iter().map(|(_, v)| v.clone()).collect(),
    )
}

pub fn table_row(name: &str, table_type: &str) -> Row {
    row(&[
        (meta::TABLE_NAME, Value::from(name)),
        (meta::TABLE_TYPE, Value::from(table_type)),
        (meta::REMARKS, Value::Null),
    ])
}

pub fn column_row(table: &str, name: &str, ordinal: i32) -> Row {
    row(&[
        (meta::TABLE_NAME, Value::from(table)),
        (meta::COLUMN_NAME, Value::from(name)),
        (meta::TYPE_NAME, Value::from("INTEGER")),
        (meta::DATA_TYPE, Value::from(4)),
        (meta::ORDINAL_POSITION, Value::from(ordinal)),
        (meta::COLUMN_SIZE, Value::from(10)),
        (meta::DECIMAL_DIGITS, Value::from(0)),
        (meta::NULLABLE, Value::from(1)),
        (meta::COLUMN_DEF, Value::Null),
        (meta::IS_AUTOINCREMENT, Value::from("NO")),
    ])
}

pub fn index_row(table: &str, index: &str, column: &str, ordinal: i32, non_unique: bool) -> Row {
    row(&[
        (meta::TABLE_NAME, Value::from(table)),
        (meta::INDEX_NAME, Value::from(index)),
        (meta::COLUMN_NAME, Value::from(column)),
        (meta::ORDINAL_POSITION, Value::from(ordinal)),
        (meta::NON_UNIQUE, Value::from(non_unique)),
        (meta::INDEX_TYPE, Value::from(3)),
        (meta::ASC_OR_DESC, Value::from("A")),
    ])
}

pub fn statistic_row(table: &str) -> Row {
    row(&[
        (meta::TABLE_NAME, Value::from(table)),
        (meta::INDEX_NAME, Value::from("STAT")),
        (meta::INDEX_TYPE, Value::from(0)),
    ])
}

pub fn pk_row(table: &str, key: &str, column: &str, seq: i32) -> Row {
    row(&[
        (meta::TABLE_NAME, Value::from(table)),
        (meta::PK_NAME, Value::from(key)),
        (meta::COLUMN_NAME, Value::from(column)),
        (meta::KEY_SEQ, Value::from(seq)),
    ])
}

#[allow(clippy::too_many_arguments)]
pub fn fk_row(
    fk_table: &str,
    fk: &str,
    fk_column: &str,
    pk_table: &str,
    pk_name: Option<&str>,
    pk_column: &str,
    seq: i32,
) -> Row {
    row(&[
        (meta::FKTABLE_NAME, Value::from(fk_table)),
        (meta::FK_NAME, Value::from(fk)),
        (meta::FKCOLUMN_NAME, Value::from(fk_column)),
        (meta::PKTABLE_NAME, Value::from(pk_table)),
        (meta::PK_NAME, Value::from(pk_name)),
        (meta::PKCOLUMN_NAME, Value::from(pk_column)),
        (meta::KEY_SEQ, Value::from(seq)),
        (meta::UPDATE_RULE, Value::from(3)),
        (meta::DELETE_RULE, Value::from(0)),
        (meta::DEFERRABILITY, Value::from(7)),
    ])
}

pub fn procedure_row(name: &str, package: Option<&str>, type_code: i32) -> Row {
    row(&[
        (meta::PROCEDURE_NAME, Value::from(name)),
        (meta::PROCEDURE_CAT, Value::from(package)),
        (meta::PROCEDURE_TYPE, Value::from(type_code)),
        (meta::REMARKS, Value::Null),
    ])
}

/// A metadata session scripted from fixed row sets. Restricted queries
/// filter by the relevant table-name column; every served query is
/// appended to `query_log` for call-count assertions.
#[derive(Default)]
pub struct ScriptedSession {
    pub tables: Vec<Row>,
    pub columns: Vec<Row>,
    pub indexes: Vec<Row>,
    pub primary_keys: Vec<Row>,
    pub imported_keys: Vec<Row>,
    pub procedures: Vec<Row>,
    pub query_log: Mutex<Vec<String>>,
}

impl ScriptedSession {
    fn filtered(rows: &[Row], column: &str, table: Option<&str>) -> Vec<Row> {
        rows.iter()
            .filter(|r| {
                table.is_none_or(|t| {
                    r.safe_string(column)
                        .is_some_and(|v| v.eq_ignore_ascii_case(t))
                })
            })
            .cloned()
            .collect()
    }

    pub fn query_count(&self, tag: &str) -> usize {
        self.query_log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(tag))
            .count()
    }
}

impl MetaSession for ScriptedSession {
    fn query_meta(&self, _cx: &Cx, query: &MetaQuery) -> Result<Box<dyn RowStream + '_>> {
        let (entry, rows) = match query {
            MetaQuery::Tables { .. } => ("tables".to_string(), self.tables.clone()),
            MetaQuery::Columns { table, .. } => (
                format!("columns:{}", table.as_deref().unwrap_or("*")),
                Self::filtered(&self.columns, meta::TABLE_NAME, table.as_deref()),
            ),
            MetaQuery::Indexes { table, .. } => (
                format!("indexes:{}", table.as_deref().unwrap_or("*")),
                Self::filtered(&self.indexes, meta::TABLE_NAME, table.as_deref()),
            ),
            MetaQuery::PrimaryKeys { table, .. } => (
                format!("primary_keys:{}", table.as_deref().unwrap_or("*")),
                Self::filtered(&self.primary_keys, meta::TABLE_NAME, table.as_deref()),
            ),
            MetaQuery::ImportedKeys { table, .. } => (
                format!("imported_keys:{}", table.as_deref().unwrap_or("*")),
                Self::filtered(&self.imported_keys, meta::FKTABLE_NAME, table.as_deref()),
            ),
            MetaQuery::Procedures { .. } => ("procedures".to_string(), self.procedures.clone()),
            MetaQuery::Statement { .. } => {
                return Err(Error::database("scripted session has no statement support"));
            }
        };
        self.query_log.lock().unwrap().push(entry);
        Ok(Box::new(VecRowStream::new(rows)))
    }
}
