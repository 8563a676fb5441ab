//! Redis data types and their facades.
//!
//! - [`DataType`] - what `TYPE` can report for a key
//! - [`string`] - the string facade, [`RedisString`](string::RedisString)
//! - [`bitfield`] - typed `BITFIELD` sub-operations

use std::fmt;

pub mod bitfield;
pub mod string;

/// The kind of value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Binary-safe string (also used for bitmaps and bitfields).
    String,
    /// Linked list of strings.
    List,
    /// Unordered set of unique strings.
    Set,
    /// Set ordered by score.
    SortedSet,
    /// Field/value map.
    Hash,
    /// Append-only log.
    Stream,
}

/// `TYPE` reply tags. `none` is deliberately absent.
const TYPE_TAGS: [(&str, DataType); 6] = [
    ("string", DataType::String),
    ("list", DataType::List),
    ("set", DataType::Set),
    ("zset", DataType::SortedSet),
    ("hash", DataType::Hash),
    ("stream", DataType::Stream),
];

impl DataType {
    /// Looks up the data type for a `TYPE` reply tag.
    ///
    /// Returns `None` for `none` (missing key) and for tags this crate does
    /// not know, such as module types.
    pub fn from_tag(tag: &str) -> Option<Self> {
        TYPE_TAGS
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|&(_, ty)| ty)
    }

    /// The tag `TYPE` uses for this data type.
    pub fn tag(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::SortedSet => "zset",
            DataType::Hash => "hash",
            DataType::Stream => "stream",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
