use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;

/// Separator used by [`Key::new`].
pub const DEFAULT_SEPARATOR: &str = ":";

/// An immutable Redis key name, optionally segmented by a separator.
///
/// Equality and hashing only consider the key text; two keys with the same
/// text but different separators are equal because they address the same
/// value on the server.
///
/// ```
/// use redkey::Key;
///
/// let key = Key::new("user:1000:followers");
/// assert_eq!(key.parts(), ["user", "1000", "followers"]);
/// assert_eq!(key.to_string(), "user:1000:followers");
/// ```
#[derive(Debug, Clone)]
pub struct Key {
    value: String,
    separator: Cow<'static, str>,
}

impl Key {
    /// Creates a key segmented by [`DEFAULT_SEPARATOR`].
    pub fn new(value: impl Into<String>) -> Self {
        Self::with_separator(value, DEFAULT_SEPARATOR)
    }

    /// Creates a key segmented by `separator`, which may be several
    /// characters long (`"::"`, `"->"`). An empty separator leaves the key
    /// unsegmented.
    ///
    /// ```
    /// use redkey::Key;
    ///
    /// let key = Key::with_separator("app::cache::v2", "::");
    /// assert_eq!(key.parts(), ["app", "cache", "v2"]);
    /// ```
    pub fn with_separator(
        value: impl Into<String>,
        separator: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            value: value.into(),
            separator: separator.into(),
        }
    }

    /// The raw key text.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The segment separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Splits the key on its separator.
    ///
    /// Empty segments from leading, trailing or doubled separators are kept.
    /// A key without the separator, or with an empty one, yields a single
    /// segment.
    pub fn parts(&self) -> Vec<&str> {
        if self.separator.is_empty() {
            return vec![self.value.as_str()];
        }
        self.value.split(&*self.separator).collect()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&Key> for Bytes {
    fn from(key: &Key) -> Self {
        Bytes::copy_from_slice(key.value.as_bytes())
    }
}

impl From<Key> for Bytes {
    fn from(key: Key) -> Self {
        Bytes::from(key.value)
    }
}
