//! Metadata session collaborator traits.
//!
//! The caches never talk to a driver directly. They receive a [`MetaSession`]
//! handle, ask it to run a [`MetaQuery`], and consume the resulting
//! [`RowStream`]. Drivers implement these traits; tests script them.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;
use asupersync::Cx;

/// A metadata request issued by a cache.
///
/// The structured variants mirror the common driver metadata entry points
/// (tables, columns, indexes, imported keys, procedures); `Statement` covers
/// vendor-specific introspection SQL. A `table: None` means an unrestricted
/// query spanning every table of the scope - the bulk path.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaQuery {
    /// All tables of a schema.
    Tables { schema: Option<String> },
    /// Columns of one table, or of every table when `table` is `None`.
    Columns {
        schema: Option<String>,
        table: Option<String>,
    },
    /// Index rows (one per index column) for one or all tables.
    Indexes {
        schema: Option<String>,
        table: Option<String>,
    },
    /// Primary/unique key rows, one per key column, for one or all tables.
    PrimaryKeys {
        schema: Option<String>,
        table: Option<String>,
    },
    /// Imported (foreign) key rows, one per key column, for one or all tables.
    ImportedKeys {
        schema: Option<String>,
        table: Option<String>,
    },
    /// Procedures and functions of a schema.
    Procedures { schema: Option<String> },
    /// Vendor-specific introspection statement.
    Statement { sql: String, params: Vec<Value> },
}

/// A streaming source of metadata rows.
///
/// `next_row` returns `Ok(None)` at end of stream. Errors are fatal for the
/// consuming load; the cache discards everything accumulated so far.
pub trait RowStream {
    /// Fetch the next row, or `None` when exhausted.
    #[allow(clippy::result_large_err)]
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// An open metadata session against one data source.
///
/// Sessions are cheap handles over a connection checked out for metadata
/// work; the expensive part is each query they run. Implementations enforce
/// their own statement timeouts - the cache layer does not add one.
pub trait MetaSession: Send + Sync {
    /// Run a metadata query, returning a streaming row source.
    ///
    /// Implementations should honor `cx` cancellation before starting the
    /// remote call; the caches poll it again between rows.
    #[allow(clippy::result_large_err)]
    fn query_meta(&self, cx: &Cx, query: &MetaQuery) -> Result<Box<dyn RowStream + '_>>;
}

/// A `RowStream` over a pre-built vector of rows.
///
/// The standard building block for scripted test sessions, and useful for
/// drivers that buffer a whole metadata result anyway.
pub struct VecRowStream {
    rows: std::vec::IntoIter<Row>,
}

impl VecRowStream {
    /// Wrap a vector of rows.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowStream for VecRowStream {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_stream_drains_in_order() {
        let rows = vec![
            Row::new(vec!["N".to_string()], vec![Value::Int(1)]),
            Row::new(vec!["N".to_string()], vec![Value::Int(2)]),
        ];
        let mut stream = VecRowStream::new(rows);
        assert_eq!(stream.next_row().unwrap().unwrap().safe_int("N"), 1);
        assert_eq!(stream.next_row().unwrap().unwrap().safe_int("N"), 2);
        assert!(stream.next_row().unwrap().is_none());
    }

    #[test]
    fn bulk_query_shape() {
        let bulk = MetaQuery::ImportedKeys {
            schema: Some("PUBLIC".to_string()),
            table: None,
        };
        let single = MetaQuery::ImportedKeys {
            schema: Some("PUBLIC".to_string()),
            table: Some("ORDERS".to_string()),
        };
        assert_ne!(bulk, single);
    }
}
