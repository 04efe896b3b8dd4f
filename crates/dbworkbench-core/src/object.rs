//! Database object identity and lookup.
//!
//! Every domain object (table, column, index, constraint, ...) implements
//! [`DbObject`]. Identity is carried by an [`ObjectId`] token assigned at
//! construction, so maps keyed by objects never depend on name equality or
//! pointer comparisons, and by an [`ObjectType`] tag used by the navigator
//! to match folder nodes to the objects they contain without downcasting.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity token for a live database object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a fresh, process-unique identity.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric form, for diagnostics.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag for a category of database objects.
///
/// Compared by tag string, so two crates can agree on a type without sharing
/// a concrete Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectType(&'static str);

impl ObjectType {
    /// Create a type tag. The tag string is the identity.
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// The tag string.
    pub fn tag(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live database object exposed to caches and the navigator.
///
/// Parent links are non-owning: implementations hold a `Weak` reference and
/// upgrade it in `parent_object`, while the parent owns its children through
/// its caches. This keeps the container/child relationship acyclic.
pub trait DbObject: Send + Sync {
    /// Stable identity of this object instance.
    fn id(&self) -> ObjectId;

    /// Object name, unique within its parent.
    fn name(&self) -> &str;

    /// Category tag (table, column, index, ...).
    fn object_type(&self) -> ObjectType;

    /// The owning object, if any. Root containers return `None`.
    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        None
    }

    /// Whether this object exists on the remote side.
    ///
    /// Freshly created, not-yet-committed objects are not persisted and must
    /// not trigger metadata loads.
    fn is_persisted(&self) -> bool {
        true
    }
}

/// Name matching policy for cache lookups.
///
/// JDBC-style drivers commonly report identifiers uppercased, so containers
/// choose the policy per cache instead of it being fixed here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMatch {
    /// Exact comparison
    #[default]
    Sensitive,
    /// ASCII case-insensitive comparison
    Insensitive,
}

impl NameMatch {
    /// Compare two object names under this policy.
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            NameMatch::Sensitive => a == b,
            NameMatch::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// Find an object by name in a cached list.
pub fn find_object<'a, T: DbObject>(
    objects: &'a [Arc<T>],
    name: &str,
    name_match: NameMatch,
) -> Option<&'a Arc<T>> {
    objects.iter().find(|o| name_match.matches(o.name(), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: ObjectId,
        name: String,
    }

    impl Dummy {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                id: ObjectId::next(),
                name: name.to_string(),
            })
        }
    }

    impl DbObject for Dummy {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn object_type(&self) -> ObjectType {
            ObjectType::new("dummy")
        }
    }

    #[test]
    fn object_ids_are_unique() {
        let a = Dummy::new("a");
        let b = Dummy::new("a");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn name_match_policies() {
        assert!(NameMatch::Sensitive.matches("Orders", "Orders"));
        assert!(!NameMatch::Sensitive.matches("Orders", "ORDERS"));
        assert!(NameMatch::Insensitive.matches("Orders", "ORDERS"));
    }

    #[test]
    fn find_by_name() {
        let objects = vec![Dummy::new("alpha"), Dummy::new("beta")];
        assert!(find_object(&objects, "beta", NameMatch::Sensitive).is_some());
        assert!(find_object(&objects, "BETA", NameMatch::Sensitive).is_none());
        assert!(find_object(&objects, "BETA", NameMatch::Insensitive).is_some());
    }

    #[test]
    fn object_type_tags() {
        assert_eq!(ObjectType::new("table"), ObjectType::new("table"));
        assert_ne!(ObjectType::new("table"), ObjectType::new("column"));
    }
}
