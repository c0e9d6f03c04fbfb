use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a logical class group: the compiled units that originate
/// from one source file.
///
/// A group is keyed by the directory the units live in and the outer class
/// name shared by their file names. `a/Foo.class`, `a/Foo$Inner.class` and
/// `a/Foo$Inner$1.class` all belong to the group `(a, Foo)`; `b/Foo.class`
/// belongs to a different group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    dir: String,
    outer: String,
}

impl GroupKey {
    /// Build a key from a directory prefix and an outer class name.
    pub fn new(dir: impl Into<String>, outer: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            outer: outer.into(),
        }
    }

    /// The directory the group lives in. Empty for the archive root.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// The shared outer class name. Empty for synthetic `$`-prefixed names.
    pub fn outer(&self) -> &str {
        &self.outer
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.outer)
        } else {
            write!(f, "{}/{}", self.dir, self.outer)
        }
    }
}
