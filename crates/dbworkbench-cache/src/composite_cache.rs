//! Cache for composite objects assembled from per-part metadata rows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dbworkbench_core::{
    CacheConfig, Cx, DbObject, MetaSession, NameMatch, ObjectId, Result, Row, RowStream,
};
use tracing::debug;

use crate::object_cache::check_cancelled;

/// Strategy for a [`CompositeCache`].
///
/// Composite objects (indexes, foreign keys, unique constraints) come
/// back from the remote source one part per row: the engine groups the
/// rows into objects per parent and the hooks materialize them.
/// `ensure_parents_loaded` / `resolve_parent` / `known_parents` bridge
/// to whatever cache owns the parent objects without tying the engine
/// to that cache's type.
pub trait CompositeHooks: Send + Sync {
    type Parent: DbObject + 'static;
    type Object: DbObject + 'static;
    type RowChild: Send + Sync + 'static;

    /// Opens the part-row stream, restricted to one parent or
    /// unrestricted for a bulk scan.
    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
        for_parent: Option<&Arc<Self::Parent>>,
    ) -> Result<Box<dyn RowStream + 's>>;

    /// Creates the composite object the first time its name shows up
    /// under `parent`. `Ok(None)` drops the whole group for this row's
    /// (parent, name) pair.
    fn fetch_object(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<Self::Parent>,
        object_name: &str,
    ) -> Result<Option<Self::Object>>;

    /// Extracts one part (an index column, a key column) from a row.
    /// `Ok(None)` skips the part but keeps the object.
    fn fetch_row_child(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<Self::Parent>,
        object: &Arc<Self::Object>,
    ) -> Result<Option<Self::RowChild>>;

    fn is_children_cached(&self, parent: &Self::Parent) -> bool;

    /// Stores the finished object list on its parent.
    fn cache_children(&self, parent: &Arc<Self::Parent>, objects: Vec<Arc<Self::Object>>);

    /// Stores the collected parts on a finished object.
    fn cache_row_children(&self, object: &Arc<Self::Object>, rows: Vec<Self::RowChild>);

    /// Makes the parent cache's list available before a bulk scan.
    fn ensure_parents_loaded(&self, cx: &Cx, session: &dyn MetaSession) -> Result<()>;

    /// Resolves a parent by the name a scan row carries. Called only
    /// after `ensure_parents_loaded` succeeded.
    fn resolve_parent(&self, name: &str) -> Option<Arc<Self::Parent>>;

    /// All parents the parent cache currently knows.
    fn known_parents(&self) -> Vec<Arc<Self::Parent>>;

    /// Whether an object that collected no parts survives the scan.
    /// Hooks whose parts can fail to resolve return `false` so such
    /// husks are dropped instead of published.
    fn empty_objects_allowed(&self) -> bool {
        true
    }
}

struct Group<H: CompositeHooks> {
    object: Arc<H::Object>,
    rows: Vec<H::RowChild>,
}

/// Per-parent grouping state during a scan. A parent whose children
/// were cached before this scan is held as `Precached` so the scan's
/// rows for it are discarded instead of overwriting the earlier list.
enum Slot<H: CompositeHooks> {
    Precached,
    Groups {
        order: Vec<String>,
        map: HashMap<String, Group<H>>,
    },
}

/// Cache over composite objects read one part per row.
///
/// A single scan covers many parents: each row names its parent and
/// its object, the engine resolves the parent, groups rows into
/// (parent, object-name) units in arrival order, and publishes each
/// parent's finished list through the hooks. Parents the scan never
/// mentioned get an explicit empty list so they are not re-queried.
/// Nothing is published when the scan fails or is cancelled.
pub struct CompositeCache<H: CompositeHooks> {
    hooks: H,
    parent_column: String,
    object_column: String,
    name_match: NameMatch,
    cancel_check_interval: u64,
    list: Mutex<Option<Vec<Arc<H::Object>>>>,
}

impl<H: CompositeHooks> CompositeCache<H> {
    /// `parent_column` and `object_column` name the result-set columns
    /// carrying the owning parent's name and the composite object's
    /// name.
    pub fn new(
        hooks: H,
        parent_column: impl Into<String>,
        object_column: impl Into<String>,
    ) -> Self {
        Self {
            hooks,
            parent_column: parent_column.into(),
            object_column: object_column.into(),
            name_match: NameMatch::Sensitive,
            cancel_check_interval: u64::from(CacheConfig::default().cancel_check_interval.max(1)),
            list: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: &CacheConfig) -> Self {
        self.cancel_check_interval = u64::from(config.cancel_check_interval.max(1));
        self
    }

    pub fn with_name_match(mut self, name_match: NameMatch) -> Self {
        self.name_match = name_match;
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the global object list across all parents, running the
    /// bulk scan on first call.
    pub fn get_objects(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
    ) -> Result<Vec<Arc<H::Object>>> {
        self.load(cx, session, None)?;
        Ok(self
            .list
            .lock()
            .expect("composite cache lock poisoned")
            .clone()
            .unwrap_or_default())
    }

    /// Looks up one object in the global list by name.
    pub fn get_object(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
        name: &str,
    ) -> Result<Option<Arc<H::Object>>> {
        let list = self.get_objects(cx, session)?;
        Ok(list
            .iter()
            .find(|o| self.name_match.matches(o.name(), name))
            .cloned())
    }

    /// True once a bulk scan has published the global list.
    pub fn is_cached(&self) -> bool {
        self.list
            .lock()
            .expect("composite cache lock poisoned")
            .is_some()
    }

    pub fn set_cache(&self, objects: Vec<Arc<H::Object>>) {
        let mut guard = self.list.lock().expect("composite cache lock poisoned");
        *guard = Some(objects);
    }

    pub fn clear(&self) {
        let mut guard = self.list.lock().expect("composite cache lock poisoned");
        *guard = None;
    }

    /// Runs the scan-and-group load, for one parent or for all.
    ///
    /// Idempotent: returns immediately when the requested scope is
    /// already cached, and concurrent callers serialize on the
    /// internal lock so exactly one scan runs.
    pub fn load(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
        for_parent: Option<&Arc<H::Parent>>,
    ) -> Result<()> {
        let mut guard = self.list.lock().expect("composite cache lock poisoned");
        if guard.is_some() {
            // A completed bulk scan already covered every parent.
            return Ok(());
        }
        match for_parent {
            None => self.hooks.ensure_parents_loaded(cx, session)?,
            Some(parent) => {
                if !parent.is_persisted() || self.hooks.is_children_cached(parent) {
                    return Ok(());
                }
            }
        }

        let mut parents: Vec<(Arc<H::Parent>, Slot<H>)> = Vec::new();
        let mut parent_index: HashMap<ObjectId, usize> = HashMap::new();

        let mut stream = self.hooks.prepare_objects(cx, session, for_parent)?;
        let mut row_index: u64 = 0;
        while let Some(row) = stream.next_row()? {
            if row_index % self.cancel_check_interval == 0 {
                check_cancelled(cx)?;
            }
            row_index += 1;
            let Some(parent_name) = row.safe_string(&self.parent_column) else {
                continue;
            };
            let Some(object_name) = row.safe_string(&self.object_column) else {
                continue;
            };
            let parent = match for_parent {
                Some(parent) => parent.clone(),
                None => match self.hooks.resolve_parent(&parent_name) {
                    Some(parent) => parent,
                    None => {
                        debug!(
                            parent = %parent_name,
                            object = %object_name,
                            "scan row references unknown parent, skipped"
                        );
                        continue;
                    }
                },
            };

            let slot_index = match parent_index.get(&parent.id()) {
                Some(index) => *index,
                None => {
                    let slot = if self.hooks.is_children_cached(&parent) {
                        Slot::Precached
                    } else {
                        Slot::Groups {
                            order: Vec::new(),
                            map: HashMap::new(),
                        }
                    };
                    parents.push((parent.clone(), slot));
                    parent_index.insert(parent.id(), parents.len() - 1);
                    parents.len() - 1
                }
            };
            let Slot::Groups { order, map } = &mut parents[slot_index].1 else {
                continue;
            };

            if !map.contains_key(&object_name) {
                let Some(object) = self.hooks.fetch_object(cx, &row, &parent, &object_name)?
                else {
                    continue;
                };
                order.push(object_name.clone());
                map.insert(
                    object_name.clone(),
                    Group {
                        object: Arc::new(object),
                        rows: Vec::new(),
                    },
                );
            }
            let group = map
                .get_mut(&object_name)
                .expect("group inserted above");
            if let Some(part) = self.hooks.fetch_row_child(cx, &row, &parent, &group.object)? {
                group.rows.push(part);
            }
        }

        // The scan completed; publish per parent, then the global list.
        let mut global: Vec<Arc<H::Object>> = Vec::new();
        for (parent, slot) in parents {
            let Slot::Groups { order, mut map } = slot else {
                continue;
            };
            let mut objects = Vec::with_capacity(order.len());
            for name in order {
                if let Some(group) = map.remove(&name) {
                    if group.rows.is_empty() && !self.hooks.empty_objects_allowed() {
                        debug!(object = %group.object.name(), "object collected no parts, dropped");
                        continue;
                    }
                    self.hooks.cache_row_children(&group.object, group.rows);
                    objects.push(group.object);
                }
            }
            if for_parent.is_none() {
                global.extend(objects.iter().cloned());
            }
            self.hooks.cache_children(&parent, objects);
        }

        match for_parent {
            None => {
                for parent in self.hooks.known_parents() {
                    if !parent_index.contains_key(&parent.id())
                        && !self.hooks.is_children_cached(&parent)
                    {
                        self.hooks.cache_children(&parent, Vec::new());
                    }
                }
                *guard = Some(global);
            }
            Some(parent) => {
                if !parent_index.contains_key(&parent.id()) {
                    self.hooks.cache_children(parent, Vec::new());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::CancelReason;
    use dbworkbench_core::{Error, MetaQuery, ObjectType, Value, VecRowStream};
    use std::sync::RwLock;

    const TYPE_TABLE: ObjectType = ObjectType::new("table");
    const TYPE_KEY: ObjectType = ObjectType::new("key");

    struct Table {
        id: ObjectId,
        name: String,
        keys: RwLock<Option<Vec<Arc<Key>>>>,
    }

    impl Table {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                id: ObjectId::next(),
                name: name.into(),
                keys: RwLock::new(None),
            })
        }

        fn key_names(&self) -> Option<Vec<String>> {
            self.keys
                .read()
                .unwrap()
                .as_ref()
                .map(|keys| keys.iter().map(|k| k.name.clone()).collect())
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

    #[derive(Debug)]
    struct Key {
        id: ObjectId,
        name: String,
        columns: RwLock<Vec<String>>,
    }

    impl DbObject for Key {
        fn id(&self) -> ObjectId {
            self.id
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn object_type(&self) -> ObjectType {
            TYPE_KEY
        }
    }

    /// (table, key, column) triples played back as scan rows.
    struct KeyDb {
        rows: Vec<(&'static str, &'static str, &'static str)>,
        fail_after: Option<usize>,
        cancel_after: Option<usize>,
    }

    impl MetaSession for KeyDb {
        fn query_meta(&self, cx: &Cx, query: &MetaQuery) -> Result<Box<dyn RowStream + '_>> {
            let MetaQuery::ImportedKeys { table, .. } = query else {
                return Err(Error::database("unsupported metadata query"));
            };
            let rows: Vec<Row> = self
                .rows
                .iter()
                .filter(|(t, _, _)| table.as_deref().is_none_or(|name| name == *t))
                .map(|(t, k, c)| {
                    Row::new(
                        vec!["TABLE_NAME".into(), "KEY_NAME".into(), "COLUMN_NAME".into()],
                        vec![Value::from(*t), Value::from(*k), Value::from(*c)],
                    )
                })
                .collect();
            if let Some(n) = self.cancel_after {
                return Ok(Box::new(CancelAfter {
                    rows: VecRowStream::new(rows),
                    cx: cx.clone(),
                    remaining: n,
                }));
            }
            match self.fail_after {
                Some(n) => Ok(Box::new(FailAfter {
                    rows: VecRowStream::new(rows),
                    remaining: n,
                })),
                None => Ok(Box::new(VecRowStream::new(rows))),
            }
        }
    }

    struct FailAfter {
        rows: VecRowStream,
        remaining: usize,
    }

    impl RowStream for FailAfter {
        fn next_row(&mut self) -> Result<Option<Row>> {
            if self.remaining == 0 {
                return Err(Error::database("connection reset mid-scan"));
            }
            self.remaining -= 1;
            self.rows.next_row()
        }
    }

    /// Cancels the caller's context after serving `remaining` rows.
    struct CancelAfter {
        rows: VecRowStream,
        cx: Cx,
        remaining: usize,
    }

    impl RowStream for CancelAfter {
        fn next_row(&mut self) -> Result<Option<Row>> {
            if self.remaining == 0 {
                self.cx.set_cancel_reason(CancelReason::default());
            } else {
                self.remaining -= 1;
            }
            self.rows.next_row()
        }
    }

    struct KeyHooks {
        tables: Vec<Arc<Table>>,
        allow_empty: bool,
    }

    impl CompositeHooks for KeyHooks {
        type Parent = Table;
        type Object = Key;
        type RowChild = String;

        fn prepare_objects<'s>(
            &self,
            cx: &Cx,
            session: &'s dyn MetaSession,
            for_parent: Option<&Arc<Table>>,
        ) -> Result<Box<dyn RowStream + 's>> {
            session.query_meta(
                cx,
                &MetaQuery::ImportedKeys {
                    schema: None,
                    table: for_parent.map(|p| p.name.clone()),
                },
            )
        }

        fn fetch_object(
            &self,
            _cx: &Cx,
            _row: &Row,
            _parent: &Arc<Table>,
            object_name: &str,
        ) -> Result<Option<Key>> {
            if object_name == "BROKEN" {
                return Err(Error::database("unreadable key definition"));
            }
            Ok(Some(Key {
                id: ObjectId::next(),
                name: object_name.into(),
                columns: RwLock::new(Vec::new()),
            }))
        }

        fn fetch_row_child(
            &self,
            _cx: &Cx,
            row: &Row,
            _parent: &Arc<Table>,
            _object: &Arc<Key>,
        ) -> Result<Option<String>> {
            Ok(row.safe_string("COLUMN_NAME"))
        }

        fn is_children_cached(&self, parent: &Table) -> bool {
            parent.keys.read().unwrap().is_some()
        }

        fn cache_children(&self, parent: &Arc<Table>, objects: Vec<Arc<Key>>) {
            *parent.keys.write().unwrap() = Some(objects);
        }

        fn cache_row_children(&self, object: &Arc<Key>, rows: Vec<String>) {
            *object.columns.write().unwrap() = rows;
        }

        fn ensure_parents_loaded(&self, _cx: &Cx, _session: &dyn MetaSession) -> Result<()> {
            Ok(())
        }

        fn resolve_parent(&self, name: &str) -> Option<Arc<Table>> {
            self.tables.iter().find(|t| t.name == name).cloned()
        }

        fn known_parents(&self) -> Vec<Arc<Table>> {
            self.tables.clone()
        }

        fn empty_objects_allowed(&self) -> bool {
            self.allow_empty
        }
    }

    fn key_cache(tables: Vec<Arc<Table>>) -> CompositeCache<KeyHooks> {
        CompositeCache::new(
            KeyHooks {
                tables,
                allow_empty: true,
            },
            "TABLE_NAME",
            "KEY_NAME",
        )
    }

    fn strict_key_cache(tables: Vec<Arc<Table>>) -> CompositeCache<KeyHooks> {
        CompositeCache::new(
            KeyHooks {
                tables,
                allow_empty: false,
            },
            "TABLE_NAME",
            "KEY_NAME",
        )
    }

    #[test]
    fn bulk_scan_groups_parts_per_parent_and_object() {
        let cx = Cx::for_testing();
        let (t1, t2, t3) = (Table::new("T1"), Table::new("T2"), Table::new("T3"));
        let cache = key_cache(vec![t1.clone(), t2.clone(), t3.clone()]);
        let db = KeyDb {
            rows: vec![
                ("T1", "FK_A", "c1"),
                ("T1", "FK_A", "c2"),
                ("T1", "FK_B", "c1"),
                ("T2", "FK_C", "c1"),
            ],
            fail_after: None,
            cancel_after: None,
        };

        let all = cache.get_objects(&cx, &db).unwrap();
        let names: Vec<&str> = all.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["FK_A", "FK_B", "FK_C"]);

        assert_eq!(t1.key_names().unwrap(), vec!["FK_A", "FK_B"]);
        assert_eq!(t2.key_names().unwrap(), vec!["FK_C"]);
        // T3 had no rows but is marked cached with an empty list.
        assert_eq!(t3.key_names().unwrap(), Vec::<String>::new());

        let fk_a = &all[0];
        assert_eq!(*fk_a.columns.read().unwrap(), vec!["c1", "c2"]);
    }

    #[test]
    fn rows_with_unknown_parents_or_blank_names_are_skipped() {
        let cx = Cx::for_testing();
        let t1 = Table::new("T1");
        let cache = key_cache(vec![t1.clone()]);
        let db = KeyDb {
            rows: vec![
                ("GHOST", "FK_X", "c1"),
                ("T1", "", "c1"),
                ("T1", "FK_A", "c1"),
            ],
            fail_after: None,
            cancel_after: None,
        };

        let all = cache.get_objects(&cx, &db).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "FK_A");
    }

    #[test]
    fn bulk_scan_preserves_previously_cached_parents() {
        let cx = Cx::for_testing();
        let (t1, t2) = (Table::new("T1"), Table::new("T2"));
        let cache = key_cache(vec![t1.clone(), t2.clone()]);
        let pinned = Arc::new(Key {
            id: ObjectId::next(),
            name: "PINNED".into(),
            columns: RwLock::new(Vec::new()),
        });
        *t2.keys.write().unwrap() = Some(vec![pinned]);

        let db = KeyDb {
            rows: vec![("T1", "FK_A", "c1"), ("T2", "FK_STALE", "c1")],
            fail_after: None,
            cancel_after: None,
        };
        let all = cache.get_objects(&cx, &db).unwrap();

        // T2's rows were discarded, its earlier list survives, and the
        // global list carries only the objects this scan created.
        assert_eq!(t2.key_names().unwrap(), vec!["PINNED"]);
        let names: Vec<&str> = all.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["FK_A"]);
    }

    #[test]
    fn per_parent_load_is_scoped_and_idempotent() {
        let cx = Cx::for_testing();
        let (t1, t2) = (Table::new("T1"), Table::new("T2"));
        let cache = key_cache(vec![t1.clone(), t2.clone()]);
        let db = KeyDb {
            rows: vec![("T1", "FK_A", "c1"), ("T2", "FK_C", "c1")],
            fail_after: None,
            cancel_after: None,
        };

        cache.load(&cx, &db, Some(&t1)).unwrap();
        assert_eq!(t1.key_names().unwrap(), vec!["FK_A"]);
        assert!(t2.key_names().is_none());
        assert!(!cache.is_cached());

        // Second per-parent load is a no-op; a later bulk scan leaves
        // the per-parent result alone and fills in the rest.
        cache.load(&cx, &db, Some(&t1)).unwrap();
        let all = cache.get_objects(&cx, &db).unwrap();
        let names: Vec<&str> = all.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["FK_C"]);
        assert_eq!(t2.key_names().unwrap(), vec!["FK_C"]);
    }

    #[test]
    fn parent_with_no_rows_gets_an_empty_list() {
        let cx = Cx::for_testing();
        let t1 = Table::new("T1");
        let cache = key_cache(vec![t1.clone()]);
        let db = KeyDb {
            rows: vec![],
            fail_after: None,
            cancel_after: None,
        };

        cache.load(&cx, &db, Some(&t1)).unwrap();
        assert_eq!(t1.key_names().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn failed_scan_publishes_nothing() {
        let cx = Cx::for_testing();
        let (t1, t2) = (Table::new("T1"), Table::new("T2"));
        let cache = key_cache(vec![t1.clone(), t2.clone()]);
        let db = KeyDb {
            rows: vec![("T1", "FK_A", "c1"), ("T2", "FK_C", "c1")],
            fail_after: Some(1),
            cancel_after: None,
        };

        assert!(cache.get_objects(&cx, &db).is_err());
        assert!(t1.key_names().is_none());
        assert!(t2.key_names().is_none());
        assert!(!cache.is_cached());
    }

    #[test]
    fn cancelled_scan_publishes_nothing() {
        let cx = Cx::for_testing();
        let (t1, t2) = (Table::new("T1"), Table::new("T2"));
        let cache = key_cache(vec![t1.clone(), t2.clone()])
            .with_config(&CacheConfig::default().cancel_check_interval(1));
        let db = KeyDb {
            rows: vec![("T1", "FK_A", "c1"), ("T2", "FK_C", "c1")],
            fail_after: None,
            cancel_after: Some(1),
        };

        let err = cache.get_objects(&cx, &db).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(t1.key_names().is_none());
        assert!(t2.key_names().is_none());
        assert!(!cache.is_cached());
    }

    #[test]
    fn objects_without_parts_can_be_dropped() {
        let cx = Cx::for_testing();
        let t1 = Table::new("T1");
        let cache = strict_key_cache(vec![t1.clone()]);
        let db = KeyDb {
            rows: vec![("T1", "FK_A", ""), ("T1", "FK_B", "c1")],
            fail_after: None,
            cancel_after: None,
        };

        let all = cache.get_objects(&cx, &db).unwrap();
        let names: Vec<&str> = all.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["FK_B"]);
        assert_eq!(t1.key_names().unwrap(), vec!["FK_B"]);
    }

    #[test]
    fn unreadable_object_definition_aborts_the_load() {
        let cx = Cx::for_testing();
        let t1 = Table::new("T1");
        let cache = key_cache(vec![t1.clone()]);
        let db = KeyDb {
            rows: vec![("T1", "FK_A", "c1"), ("T1", "BROKEN", "c1")],
            fail_after: None,
            cancel_after: None,
        };

        assert!(cache.load(&cx, &db, None).is_err());
        assert!(t1.key_names().is_none());
    }
}
