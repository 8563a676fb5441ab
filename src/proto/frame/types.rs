use bytes::Bytes;

/// A RESP2 (Redis Serialization Protocol) frame.
///
/// Commands travel to the server as an [`Frame::Array`] of bulk strings;
/// replies come back as any of the variants below.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string (+OK).
    SimpleString(Vec<u8>),
    /// Error (-ERR).
    Error(Vec<u8>),
    /// Integer (:1000).
    Integer(i64),
    /// Bulk string ($6\r\nfoobar).
    BulkString(Option<Bytes>),
    /// Array (*2\r\n...).
    Array(Vec<Frame>),
    /// Null array (*-1).
    Null,
}

impl Frame {
    /// Short name of the frame variant, used in protocol error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::SimpleString(_) => "simple string",
            Frame::Error(_) => "error",
            Frame::Integer(_) => "integer",
            Frame::BulkString(_) => "bulk string",
            Frame::Array(_) => "array",
            Frame::Null => "null",
        }
    }

    /// Returns true for `Null` and for a null bulk string.
    pub fn is_nil(&self) -> bool {
        matches!(self, Frame::Null | Frame::BulkString(None))
    }
}
