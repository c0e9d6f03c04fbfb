use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PathError;
use crate::group::GroupKey;

const CLASS_SUFFIX: &str = ".class";
const SOURCE_SUFFIX: &str = ".java";

/// Validated, normalized relative path of an entry inside a class archive.
///
/// Always `/`-separated, never absolute, never contains `.` or `..`
/// segments, never empty, never ends in a slash. An `ArchivePath` is the
/// identity of a compiled unit: the same path in two archives names the
/// same unit.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchivePath(String);

impl ArchivePath {
    /// Validate and normalize a relative archive path.
    pub fn parse(path: impl AsRef<str>) -> Result<Self, PathError> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path.contains('\\') {
            return Err(PathError::Backslash(path.to_string()));
        }
        if path.starts_with('/') {
            return Err(PathError::Absolute(path.to_string()));
        }
        if path.ends_with('/') {
            return Err(PathError::TrailingSlash(path.to_string()));
        }
        for segment in path.split('/') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(path.to_string()));
            }
            if segment == "." || segment == ".." {
                return Err(PathError::RelativeSegment(path.to_string()));
            }
        }
        Ok(Self(path.to_string()))
    }

    /// The raw `/`-separated path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The directory prefix, without a trailing slash. Empty for entries at
    /// the archive root.
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Whether this entry is a compiled unit (`.class`).
    pub fn is_class_file(&self) -> bool {
        self.0.ends_with(CLASS_SUFFIX)
    }

    /// The outer class name: the file name up to the first `$`, with a
    /// trailing `.class` stripped.
    ///
    /// `Foo.class` and `Foo$Inner$1.class` both yield `Foo`. Synthetic
    /// names beginning with `$` yield the empty string.
    pub fn outer_name(&self) -> &str {
        let name = self.file_name();
        let name = match name.find('$') {
            Some(idx) => &name[..idx],
            None => name,
        };
        name.strip_suffix(CLASS_SUFFIX).unwrap_or(name)
    }

    /// Whether the file name marks a nested or anonymous class
    /// (`Foo$Inner.class`).
    pub fn is_inner_class(&self) -> bool {
        self.is_class_file() && self.file_name().contains('$')
    }

    /// The logical group this entry belongs to. Groups never span
    /// directories: `a/Foo.class` and `b/Foo.class` are unrelated.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.parent(), self.outer_name())
    }

    /// The source file a compiled unit originates from: the outer class
    /// name with a `.java` suffix, in the same directory.
    ///
    /// `com/a/Foo$Inner.class` maps to `com/a/Foo.java`. Returns `None`
    /// for entries that are not class files and for synthetic names with
    /// no outer class.
    pub fn source_path(&self) -> Option<ArchivePath> {
        if !self.is_class_file() {
            return None;
        }
        let outer = self.outer_name();
        if outer.is_empty() {
            return None;
        }
        let dir = self.parent();
        let source = if dir.is_empty() {
            format!("{outer}{SOURCE_SUFFIX}")
        } else {
            format!("{dir}/{outer}{SOURCE_SUFFIX}")
        };
        // Built from segments of an already validated path.
        Some(Self(source))
    }
}

impl fmt::Debug for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchivePath({})", self.0)
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ArchivePath> for String {
    fn from(path: ArchivePath) -> Self {
        path.0
    }
}

impl Serialize for ArchivePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

// Deserialization re-validates through `parse`, so a manifest can never
// smuggle in an absolute or traversing path.
impl<'de> Deserialize<'de> for ArchivePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ArchivePath::parse(&raw).map_err(D::Error::custom)
    }
}
