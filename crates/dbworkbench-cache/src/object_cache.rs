//! Flat list cache over a single metadata query.

use std::sync::{Arc, Mutex};

use dbworkbench_core::{
    CacheConfig, Cx, DbObject, Error, MetaSession, NameMatch, Result, Row, RowStream, find_object,
};
use tracing::debug;

/// Returns `Err(Error::Cancelled)` once the context carries a cancel
/// reason. Loads call this between rows so a long scan stops promptly.
pub(crate) fn check_cancelled(cx: &Cx) -> Result<()> {
    if cx.cancel_reason().is_some() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Strategy for an [`ObjectCache`]: how to query the remote source and
/// how to turn each row into an object.
pub trait ObjectHooks: Send + Sync {
    type Object: DbObject + 'static;

    /// Opens the row stream that lists the cached objects.
    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
    ) -> Result<Box<dyn RowStream + 's>>;

    /// Materializes one object from a row. `Ok(None)` skips the row
    /// without failing the load (filtered or unusable rows).
    fn fetch_object(&self, cx: &Cx, row: &Row) -> Result<Option<Self::Object>>;
}

/// Cache over a flat list of named metadata objects.
///
/// The list is fetched at most once: concurrent requesters block on the
/// internal lock and the late ones observe the published list. A failed
/// or cancelled load publishes nothing, so the next request retries.
pub struct ObjectCache<H: ObjectHooks> {
    hooks: H,
    name_match: NameMatch,
    cancel_check_interval: u64,
    list: Mutex<Option<Vec<Arc<H::Object>>>>,
}

impl<H: ObjectHooks> ObjectCache<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks,
            name_match: NameMatch::Sensitive,
            cancel_check_interval: u64::from(CacheConfig::default().cancel_check_interval.max(1)),
            list: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: &CacheConfig) -> Self {
        self.cancel_check_interval = u64::from(config.cancel_check_interval.max(1));
        self
    }

    /// Name comparison policy used by [`get_object`](Self::get_object).
    pub fn with_name_match(mut self, name_match: NameMatch) -> Self {
        self.name_match = name_match;
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the cached list, loading it on first call.
    pub fn get_objects(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
    ) -> Result<Vec<Arc<H::Object>>> {
        let mut guard = self.list.lock().expect("object cache lock poisoned");
        if let Some(list) = guard.as_ref() {
            return Ok(list.clone());
        }
        let list = self.load(cx, session)?;
        *guard = Some(list.clone());
        Ok(list)
    }

    /// Looks up one object by name, loading the list if needed.
    pub fn get_object(
        &self,
        cx: &Cx,
        session: &dyn MetaSession,
        name: &str,
    ) -> Result<Option<Arc<H::Object>>> {
        let list = self.get_objects(cx, session)?;
        Ok(find_object(&list, name, self.name_match).cloned())
    }

    /// Looks up one object by name without triggering a load.
    pub fn cached_object(&self, name: &str) -> Option<Arc<H::Object>> {
        let guard = self.list.lock().expect("object cache lock poisoned");
        guard
            .as_ref()
            .and_then(|list| find_object(list, name, self.name_match).cloned())
    }

    pub fn cached_objects(&self) -> Option<Vec<Arc<H::Object>>> {
        self.list
            .lock()
            .expect("object cache lock poisoned")
            .clone()
    }

    pub fn is_cached(&self) -> bool {
        self.list
            .lock()
            .expect("object cache lock poisoned")
            .is_some()
    }

    /// Replaces the cached list wholesale, marking the cache loaded.
    pub fn set_cache(&self, objects: Vec<Arc<H::Object>>) {
        let mut guard = self.list.lock().expect("object cache lock poisoned");
        *guard = Some(objects);
    }

    /// Drops the cached list; the next request reloads from the source.
    pub fn clear(&self) {
        let mut guard = self.list.lock().expect("object cache lock poisoned");
        *guard = None;
    }

    fn load(&self, cx: &Cx, session: &dyn MetaSession) -> Result<Vec<Arc<H::Object>>> {
        let mut stream = self.hooks.prepare_objects(cx, session)?;
        let mut objects = Vec::new();
        let mut row_index: u64 = 0;
        while let Some(row) = stream.next_row()? {
            if row_index % self.cancel_check_interval == 0 {
                check_cancelled(cx)?;
            }
            row_index += 1;
            match self.hooks.fetch_object(cx, &row)? {
                Some(object) => objects.push(Arc::new(object)),
                None => debug!(row = row_index, "skipped unusable metadata row"),
            }
        }
        Ok(objects)
    }
}
