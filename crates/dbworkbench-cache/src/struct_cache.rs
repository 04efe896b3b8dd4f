//! Two-level cache: a flat object list plus per-parent child rows.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use dbworkbench_core::{
    CacheConfig, Cx, DbObject, MetaSession, NameMatch, ObjectId, Result, Row, RowStream,
    find_object,
};
use tracing::debug;

use crate::object_cache::{ObjectCache, ObjectHooks, check_cancelled};

/// Strategy for a [`StructCache`]: the flat-list queries of
/// [`ObjectHooks`] plus child loading and per-parent bookkeeping.
///
/// Child storage lives on the parent objects themselves;
/// `is_children_cached` / `cache_children` bridge to it. That keeps a
/// parent's children exactly as fresh as the parent that owns them.
pub trait StructHooks: Send + Sync {
    type Object: DbObject + 'static;
    type Child: Send + Sync + 'static;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
    ) -> Result<Box<dyn RowStream + 's>>;

    fn fetch_object(&self, cx: &Cx, row: &Row) -> Result<Option<Self::Object>>;

    /// Opens the child row stream, either restricted to one parent or
    /// unrestricted for a bulk scan (`for_parent` of `None`).
    fn prepare_children<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
        for_parent: Option<&Arc<Self::Object>>,
    ) -> Result<Box<dyn RowStream + 's>>;

    /// Materializes one child row. `Ok(None)` skips the row.
    fn fetch_child(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<Self::Object>,
    ) -> Result<Option<Self::Child>>;

    fn is_children_cached(&self, parent: &Self::Object) -> bool;

    fn cache_children(&self, parent: &Arc<Self::Object>, children: Vec<Self::Child>);
}

struct TopLevel<H>(Arc<H>);

impl<H: StructHooks> ObjectHooks for TopLevel<H> {
    type Object = H::Object;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
    ) -> Result<Box<dyn RowStream + 's>> {
        self.0.prepare_objects(cx, session)
    }

    fn fetch_object(&self, cx: &Cx, row: &Row) -> Result<Option<Self::Object>> {
        self.0.fetch_object(cx, row)
    }
}

/// Cache over parent objects and their owned children (tables and
/// their columns being the canonical case).
///
/// Children load either per parent or in one bulk scan whose rows are
/// attributed back to parents through the configured name column.
/// Bulk attribution skips rows naming unknown parents, never
/// overwrites a parent whose children were already cached, and marks
/// parents absent from the scan as cached-empty so they are not
/// re-queried one by one afterwards.
pub struct StructCache<H: StructHooks> {
    hooks: Arc<H>,
    objects: ObjectCache<TopLevel<H>>,
    children_lock: Mutex<()>,
    object_name_column: String,
    name_match: NameMatch,
    cancel_check_interval: u64,
}

impl<H: StructHooks> StructCache<H> {
    /// `object_name_column` names the column of the bulk child result
    /// set that carries the owning parent's name.
    pub fn new(hooks: H, object_name_column: impl Into<String>) -> Self {
        let hooks = Arc::new(hooks);
        Self {
            objects: ObjectCache::new(TopLevel(hooks.clone())),
            hooks,
            children_lock: Mutex::new(()),
            object_name_column: object_name_column.into(),
            name_match: NameMatch::Sensitive,
            cancel_check_interval: u64::from(CacheConfig::default().cancel_check_interval.max(1)),
        }
    }

    pub fn with_config(mut self, config: &CacheConfig) -> Self {
        self.cancel_check_interval = u64::from(config.cancel_check_interval.max(1));
        self.objects = self.objects.with_config(config);
        self
    }

    pub fn with_name_match(mut self, name_match: NameMatch) -> Self {
        self.name_match = name_match;
        self.objects = self.objects.with_name_match(name_match);
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn get_objects(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
    ) -> Result<Vec<Arc<H::Object>>> {
        self.objects.get_objects(cx, session)
    }

    pub fn get_object(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
        name: &str,
    ) -> Result<Option<Arc<H::Object>>> {
        self.objects.get_object(cx, session, name)
    }

    pub fn cached_object(&self, name: &str) -> Option<Arc<H::Object>> {
        self.objects.cached_object(name)
    }

    pub fn cached_objects(&self) -> Option<Vec<Arc<H::Object>>> {
        self.objects.cached_objects()
    }

    pub fn is_cached(&self) -> bool {
        self.objects.is_cached()
    }

    pub fn set_cache(&self, objects: Vec<Arc<H::Object>>) {
        self.objects.set_cache(objects);
    }

    pub fn clear(&self) {
        self.objects.clear();
    }

    /// Loads children for one parent, or for all parents in one bulk
    /// scan when `for_parent` is `None`. Idempotent per parent: a
    /// parent whose children are cached is left untouched.
    pub fn load_children(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
        for_parent: Option<&Arc<H::Object>>,
    ) -> Result<()> {
        let _guard = self.children_lock.lock().expect("struct cache lock poisoned");
        match for_parent {
            Some(parent) => {
                if !parent.is_persisted() || self.hooks.is_children_cached(parent) {
                    return Ok(());
                }
                let children = self.scan_one(cx, session, parent)?;
                self.hooks.cache_children(parent, children);
                Ok(())
            }
            None => self.scan_all(cx, session),
        }
    }

    fn scan_one(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
        parent: &Arc<H::Object>,
    ) -> Result<Vec<H::Child>> {
        let mut stream = self.hooks.prepare_children(cx, session, Some(parent))?;
        let mut children = Vec::new();
        let mut row_index: u64 = 0;
        while let Some(row) = stream.next_row()? {
            if row_index % self.cancel_check_interval == 0 {
                check_cancelled(cx)?;
            }
            row_index += 1;
            if let Some(child) = self.hooks.fetch_child(cx, &row, parent)? {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn scan_all(&self, cx: &Cx, session: &dyn MetaSession) -> Result<()> {
        let parents = self.objects.get_objects(cx, session)?;
        let mut groups: Vec<(Arc<H::Object>, Vec<H::Child>)> = Vec::new();
        let mut group_index: HashMap<ObjectId, usize> = HashMap::new();
        let mut precached: HashSet<ObjectId> = HashSet::new();

        let mut stream = self.hooks.prepare_children(cx, session, None)?;
        let mut row_index: u64 = 0;
        while let Some(row) = stream.next_row()? {
            if row_index % self.cancel_check_interval == 0 {
                check_cancelled(cx)?;
            }
            row_index += 1;
            let Some(parent_name) = row.safe_string(&self.object_name_column) else {
                continue;
            };
            let Some(parent) = find_object(&parents, &parent_name, self.name_match) else {
                debug!(parent = %parent_name, "child row references unknown parent, skipped");
                continue;
            };
            let parent_id = parent.id();
            if precached.contains(&parent_id) {
                continue;
            }
            if !group_index.contains_key(&parent_id) && self.hooks.is_children_cached(parent) {
                precached.insert(parent_id);
                continue;
            }
            let slot = match group_index.get(&parent_id) {
                Some(slot) => *slot,
                None => {
                    groups.push((parent.clone(), Vec::new()));
                    group_index.insert(parent_id, groups.len() - 1);
                    groups.len() - 1
                }
            };
            if let Some(child) = self.hooks.fetch_child(cx, &row, parent)? {
                groups[slot].1.push(child);
            }
        }

        // Publish only after the scan completed without error.
        for (parent, children) in groups {
            self.hooks.cache_children(&parent, children);
        }
        for parent in &parents {
            let parent_id = parent.id();
            if !group_index.contains_key(&parent_id)
                && !precached.contains(&parent_id)
                && !self.hooks.is_children_cached(parent)
            {
                self.hooks.cache_children(parent, Vec::new());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbworkbench_core::{Error, MetaQuery, ObjectType, Value, VecRowStream};
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TYPE_TABLE: ObjectType = ObjectType::new("table");

    struct Table {
        id: ObjectId,
        name: String,
        columns: RwLock<Option<Vec<String>>>,
    }

    impl Table {
        fn new(name: &str) -> Self {
            Self {
                id: ObjectId::next(),
                name: name.into(),
                columns: RwLock::new(None),
            }
        }

        fn columns(&self) -> Option<Vec<String>> {
            self.columns.read().unwrap().clone()
        }
    }

    impl DbObject for Table {
        fn id(&self) -> ObjectId {
            self.id
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn object_type(&self) -> ObjectType {
            TYPE_TABLE
        }
    }

    struct Db {
        tables: Vec<&'static str>,
        // (table name, column name) in server return order
        columns: Vec<(&'static str, &'static str)>,
        column_queries: AtomicUsize,
    }

    impl Db {
        fn new(tables: Vec<&'static str>, columns: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                tables,
                columns,
                column_queries: AtomicUsize::new(0),
            }
        }

        fn column_row(table: &str, column: &str) -> Row {
            Row::new(
                vec!["TABLE_NAME".into(), "COLUMN_NAME".into()],
                vec![Value::from(table), Value::from(column)],
            )
        }
    }

    impl MetaSession for Db {
        fn query_meta(&self, _cx: &Cx, query: &MetaQuery) -> Result<Box<dyn RowStream + '_>> {
            match query {
                MetaQuery::Tables { .. } => Ok(Box::new(VecRowStream::new(
                    self.tables
                        .iter()
                        .map(|t| Row::new(vec!["TABLE_NAME".into()], vec![Value::from(*t)]))
                        .collect(),
                ))),
                MetaQuery::Columns { table, .. } => {
                    self.column_queries.fetch_add(1, Ordering::SeqCst);
                    let rows = self
                        .columns
                        .iter()
                        .filter(|(t, _)| table.as_deref().is_none_or(|name| name == *t))
                        .map(|(t, c)| Self::column_row(t, c))
                        .collect();
                    Ok(Box::new(VecRowStream::new(rows)))
                }
                _ => Err(Error::database("unsupported metadata query")),
            }
        }
    }

    struct TableHooks;

    impl StructHooks for TableHooks {
        type Object = Table;
        type Child = String;

        fn prepare_objects<'s>(
            &self,
            cx: &Cx,
            session: &'s dyn MetaSession,
        ) -> Result<Box<dyn RowStream + 's>> {
            session.query_meta(cx, &MetaQuery::Tables { schema: None })
        }

        fn fetch_object(&self, _cx: &Cx, row: &Row) -> Result<Option<Table>> {
            Ok(row.safe_string("TABLE_NAME").map(|name| Table {
                id: ObjectId::next(),
                name,
                columns: RwLock::new(None),
            }))
        }

        fn prepare_children<'s>(
            &self,
            cx: &Cx,
            session: &'s dyn MetaSession,
            for_parent: Option<&Arc<Table>>,
        ) -> Result<Box<dyn RowStream + 's>> {
            session.query_meta(
                cx,
                &MetaQuery::Columns {
                    schema: None,
                    table: for_parent.map(|p| p.name.clone()),
                },
            )
        }

        fn fetch_child(
            &self,
            _cx: &Cx,
            row: &Row,
            _parent: &Arc<Table>,
        ) -> Result<Option<String>> {
            Ok(row.safe_string("COLUMN_NAME"))
        }

        fn is_children_cached(&self, parent: &Table) -> bool {
            parent.columns.read().unwrap().is_some()
        }

        fn cache_children(&self, parent: &Arc<Table>, children: Vec<String>) {
            *parent.columns.write().unwrap() = Some(children);
        }
    }

    #[test]
    fn per_parent_load_is_idempotent() {
        let cx = Cx::for_testing();
        let db = Db::new(vec!["t1"], vec![("t1", "a"), ("t1", "b")]);
        let cache = StructCache::new(TableHooks, "TABLE_NAME");

        let t1 = cache.get_object(&cx, &db, "t1").unwrap().unwrap();
        cache.load_children(&cx, &db, Some(&t1)).unwrap();
        cache.load_children(&cx, &db, Some(&t1)).unwrap();

        assert_eq!(t1.columns().unwrap(), vec!["a", "b"]);
        assert_eq!(db.column_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bulk_scan_groups_rows_by_parent() {
        let cx = Cx::for_testing();
        let db = Db::new(
            vec!["t1", "t2"],
            vec![("t1", "a"), ("t2", "x"), ("t1", "b")],
        );
        let cache = StructCache::new(TableHooks, "TABLE_NAME");

        cache.load_children(&cx, &db, None).unwrap();
        let t1 = cache.cached_object("t1").unwrap();
        let t2 = cache.cached_object("t2").unwrap();
        assert_eq!(t1.columns().unwrap(), vec!["a", "b"]);
        assert_eq!(t2.columns().unwrap(), vec!["x"]);
        assert_eq!(db.column_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bulk_scan_skips_unknown_parents() {
        let cx = Cx::for_testing();
        let db = Db::new(vec!["t1"], vec![("ghost", "a"), ("t1", "b")]);
        let cache = StructCache::new(TableHooks, "TABLE_NAME");

        cache.load_children(&cx, &db, None).unwrap();
        let t1 = cache.cached_object("t1").unwrap();
        assert_eq!(t1.columns().unwrap(), vec!["b"]);
    }

    #[test]
    fn bulk_scan_marks_absent_parents_as_empty() {
        let cx = Cx::for_testing();
        let db = Db::new(vec!["t1", "lonely"], vec![("t1", "a")]);
        let cache = StructCache::new(TableHooks, "TABLE_NAME");

        cache.load_children(&cx, &db, None).unwrap();
        let lonely = cache.cached_object("lonely").unwrap();
        assert_eq!(lonely.columns().unwrap(), Vec::<String>::new());
        // A follow-up per-parent request must not hit the source again.
        cache.load_children(&cx, &db, Some(&lonely)).unwrap();
        assert_eq!(db.column_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bulk_scan_preserves_previously_cached_children() {
        let cx = Cx::for_testing();
        let db = Db::new(vec!["t1", "t2"], vec![("t1", "a"), ("t2", "stale")]);
        let cache = StructCache::new(TableHooks, "TABLE_NAME");

        let t2 = cache.get_object(&cx, &db, "t2").unwrap().unwrap();
        *t2.columns.write().unwrap() = Some(vec!["pinned".into()]);

        cache.load_children(&cx, &db, None).unwrap();
        assert_eq!(t2.columns().unwrap(), vec!["pinned"]);
        let t1 = cache.cached_object("t1").unwrap();
        assert_eq!(t1.columns().unwrap(), vec!["a"]);
    }
}
