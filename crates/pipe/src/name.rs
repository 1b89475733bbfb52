use fxhash::FxHashSet;
use lazy_static::lazy_static;
use std::fmt;
use std::sync::{Arc, Mutex};

lazy_static! {
    static ref INTERN: Mutex<FxHashSet<Arc<str>>> = Mutex::new(FxHashSet::default());
}

/// Interned string handle. Interning keeps repeated names (object keys,
/// field names, enum entries) cheap to clone, hash and compare.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    pub fn new(s: &str) -> Name {
        let mut table = INTERN.lock().expect("name intern table poisoned");
        match table.get(s) {
            Some(interned) => Name(interned.clone()),
            None => {
                let interned: Arc<str> = Arc::from(s);
                table.insert(interned.clone());
                Name(interned)
            }
        }
    }

    /// The empty name, used where a name is structurally present but unset.
    pub fn none() -> Name {
        Name::new("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Name {
    fn default() -> Self {
        Name::none()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Name {
        Name::new(s)
    }
}

impl From<Name> for diag::Arg {
    fn from(name: Name) -> Self {
        diag::Arg::Str(name.as_str().to_owned())
    }
}

impl From<&Name> for diag::Arg {
    fn from(name: &Name) -> Self {
        diag::Arg::Str(name.as_str().to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_intern_shares_storage() {
        let a = Name::new("shared");
        let b = Name::new("shared");
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(Name::new("Key"), Name::new("key"));
    }

    #[test]
    fn test_none() {
        assert!(Name::none().is_none());
        assert!(!Name::new("x").is_none());
    }
}
