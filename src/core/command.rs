use std::time::Duration;

use bytes::Bytes;

use crate::data_types::bitfield::{BitFieldOp, Overflow};
use crate::proto::frame::Frame;
use crate::Error;

/// A command ready to be sent to Redis.
///
/// Commands are built with the builder methods or the constructor functions
/// in this module, then handed to an [`Executor`](crate::Executor).
///
/// # Example
///
/// ```
/// use redkey::core::command::{Cmd, ttl};
///
/// let cmd = Cmd::new("TTL").arg("user:1");
/// assert_eq!(cmd.args(), ttl("user:1").args());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<Bytes>,
}

impl Cmd {
    /// Creates a new command with the given name.
    #[inline]
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            args: vec![name.into()],
        }
    }

    /// Appends an argument to the command.
    #[inline]
    pub fn arg<T: Into<Bytes>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends every argument from `args`.
    #[inline]
    pub fn args_from<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The command name as sent, e.g. `b"RENAME"`.
    pub fn name(&self) -> &[u8] {
        &self.args[0]
    }

    /// All arguments including the command name.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Converts the command to a RESP Array frame.
    #[inline]
    pub fn into_frame(self) -> Frame {
        Frame::Array(
            self.args
                .into_iter()
                .map(|b| Frame::BulkString(Some(b)))
                .collect(),
        )
    }
}

/// Write condition for a SET command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// `NX`: only set when the key does not exist.
    IfNotExists,
    /// `XX`: only set when the key already exists.
    IfExists,
}

/// Expiry handling for a SET command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetExpiry {
    /// `EX seconds`.
    Seconds(u64),
    /// `PX milliseconds`.
    Milliseconds(u64),
    /// `KEEPTTL`: retain the TTL already attached to the key.
    KeepTtl,
}

/// Creates a PING command.
#[inline]
pub fn ping() -> Cmd {
    Cmd::new("PING")
}

/// Creates an AUTH command with password only.
#[inline]
pub fn auth(password: impl Into<Bytes>) -> Cmd {
    Cmd::new("AUTH").arg(password)
}

/// Creates an AUTH command with username and password (ACL style).
#[inline]
pub fn auth_with_username(username: impl Into<Bytes>, password: impl Into<Bytes>) -> Cmd {
    Cmd::new("AUTH").arg(username).arg(password)
}

/// Creates a SELECT command.
#[inline]
pub fn select(db: u8) -> Cmd {
    Cmd::new("SELECT").arg(db.to_string())
}

/// Creates a CLIENT SETNAME command.
#[inline]
pub fn client_setname(name: impl Into<Bytes>) -> Cmd {
    Cmd::new("CLIENT").arg("SETNAME").arg(name)
}

/// Creates a GET command.
#[inline]
pub fn get(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("GET").arg(key)
}

/// Creates a SET command with an optional condition and expiry.
pub fn set(
    key: impl Into<Bytes>,
    value: impl Into<Bytes>,
    condition: Option<SetCondition>,
    expiry: Option<SetExpiry>,
) -> Cmd {
    let mut cmd = Cmd::new("SET").arg(key).arg(value);
    cmd = match expiry {
        Some(SetExpiry::Seconds(s)) => cmd.arg("EX").arg(s.to_string()),
        Some(SetExpiry::Milliseconds(ms)) => cmd.arg("PX").arg(ms.to_string()),
        Some(SetExpiry::KeepTtl) => cmd.arg("KEEPTTL"),
        None => cmd,
    };
    match condition {
        Some(SetCondition::IfNotExists) => cmd.arg("NX"),
        Some(SetCondition::IfExists) => cmd.arg("XX"),
        None => cmd,
    }
}

/// Creates an APPEND command.
#[inline]
pub fn append(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("APPEND").arg(key).arg(value)
}

/// Creates a STRLEN command.
#[inline]
pub fn strlen(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("STRLEN").arg(key)
}

/// Creates a BITCOUNT command over the byte range `start..=end`.
#[inline]
pub fn bitcount(key: impl Into<Bytes>, start: i64, end: i64) -> Cmd {
    Cmd::new("BITCOUNT")
        .arg(key)
        .arg(start.to_string())
        .arg(end.to_string())
}

/// Creates a BITFIELD command.
///
/// `OVERFLOW` is only sent when a write sub-operation follows it, since
/// it has no effect on `GET`.
pub fn bitfield(key: impl Into<Bytes>, ops: &[BitFieldOp], overflow: Overflow) -> Cmd {
    let mut cmd = Cmd::new("BITFIELD").arg(key);
    if ops.iter().any(BitFieldOp::is_write) {
        cmd = cmd.arg("OVERFLOW").arg(overflow.as_str());
    }
    ops.iter().fold(cmd, |cmd, op| op.write_args(cmd))
}

/// Creates a DEL command for one or more keys.
#[inline]
pub fn del<I, K>(keys: I) -> Cmd
where
    I: IntoIterator<Item = K>,
    K: Into<Bytes>,
{
    Cmd::new("DEL").args_from(keys)
}

/// Creates a DUMP command.
#[inline]
pub fn dump(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("DUMP").arg(key)
}

/// Creates a RESTORE command. A `ttl` of zero restores without expiry.
#[inline]
pub fn restore(key: impl Into<Bytes>, ttl: Duration, payload: impl Into<Bytes>) -> Cmd {
    Cmd::new("RESTORE")
        .arg(key)
        .arg(ttl.as_millis().to_string())
        .arg(payload)
}

/// Creates an EXISTS command.
#[inline]
pub fn exists(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("EXISTS").arg(key)
}

/// Creates an EXPIRE command.
#[inline]
pub fn expire(key: impl Into<Bytes>, seconds: i64) -> Cmd {
    Cmd::new("EXPIRE").arg(key).arg(seconds.to_string())
}

/// Creates an EXPIREAT command.
#[inline]
pub fn expireat(key: impl Into<Bytes>, timestamp: i64) -> Cmd {
    Cmd::new("EXPIREAT").arg(key).arg(timestamp.to_string())
}

/// Creates a PEXPIRE command.
#[inline]
pub fn pexpire(key: impl Into<Bytes>, milliseconds: i64) -> Cmd {
    Cmd::new("PEXPIRE").arg(key).arg(milliseconds.to_string())
}

/// Creates a PEXPIREAT command.
#[inline]
pub fn pexpireat(key: impl Into<Bytes>, timestamp_ms: i64) -> Cmd {
    Cmd::new("PEXPIREAT").arg(key).arg(timestamp_ms.to_string())
}

/// Creates a PERSIST command.
#[inline]
pub fn persist(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("PERSIST").arg(key)
}

/// Creates a TTL command.
#[inline]
pub fn ttl(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("TTL").arg(key)
}

/// Creates a PTTL command.
#[inline]
pub fn pttl(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("PTTL").arg(key)
}

/// Creates a RANDOMKEY command.
#[inline]
pub fn randomkey() -> Cmd {
    Cmd::new("RANDOMKEY")
}

/// Creates a RENAME command.
#[inline]
pub fn rename(key: impl Into<Bytes>, newkey: impl Into<Bytes>) -> Cmd {
    Cmd::new("RENAME").arg(key).arg(newkey)
}

/// Creates a RENAMENX command.
#[inline]
pub fn renamenx(key: impl Into<Bytes>, newkey: impl Into<Bytes>) -> Cmd {
    Cmd::new("RENAMENX").arg(key).arg(newkey)
}

/// Creates a TOUCH command.
#[inline]
pub fn touch(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("TOUCH").arg(key)
}

/// Creates a TYPE command.
#[inline]
pub fn key_type(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("TYPE").arg(key)
}

/// Creates a KEYS command.
#[inline]
pub fn keys(pattern: impl Into<Bytes>) -> Cmd {
    Cmd::new("KEYS").arg(pattern)
}

fn server_error(e: &[u8]) -> Error {
    Error::Server {
        message: String::from_utf8_lossy(e).into_owned(),
    }
}

fn utf8(data: &[u8]) -> Result<String, Error> {
    std::str::from_utf8(data)
        .map(str::to_owned)
        .map_err(|_| Error::Protocol {
            message: format!("reply is not valid UTF-8: {:?}", Bytes::copy_from_slice(data)),
        })
}

fn unexpected(expected: &str, frame: &Frame) -> Error {
    Error::Protocol {
        message: format!("expected {expected}, got {}", frame.kind()),
    }
}

/// Passes the frame through unless it is a server error.
#[inline]
pub fn parse_frame_response(frame: Frame) -> Result<Frame, Error> {
    match frame {
        Frame::Error(e) => Err(server_error(&e)),
        _ => Ok(frame),
    }
}

/// Converts a status reply (e.g. `+OK`, `+string`) to a string.
#[inline]
pub fn frame_to_status(frame: Frame) -> Result<String, Error> {
    match frame {
        Frame::SimpleString(s) => Ok(String::from_utf8_lossy(&s).into_owned()),
        Frame::BulkString(Some(b)) => Ok(String::from_utf8_lossy(&b).into_owned()),
        Frame::Error(e) => Err(server_error(&e)),
        other => Err(unexpected("status", &other)),
    }
}

/// Converts a frame to bytes; nil becomes `None`.
#[inline]
pub fn frame_to_bytes(frame: Frame) -> Result<Option<Bytes>, Error> {
    match frame {
        Frame::BulkString(b) => Ok(b),
        Frame::Null => Ok(None),
        Frame::Error(e) => Err(server_error(&e)),
        other => Err(unexpected("bulk string", &other)),
    }
}

/// Converts a frame to an integer.
#[inline]
pub fn frame_to_int(frame: Frame) -> Result<i64, Error> {
    match frame {
        Frame::Integer(i) => Ok(i),
        Frame::Error(e) => Err(server_error(&e)),
        other => Err(unexpected("integer", &other)),
    }
}

/// Converts a non-negative integer reply (a count or a length).
#[inline]
pub fn frame_to_count(frame: Frame) -> Result<u64, Error> {
    let n = frame_to_int(frame)?;
    u64::try_from(n).map_err(|_| Error::Protocol {
        message: format!("expected non-negative integer, got {n}"),
    })
}

/// Converts an integer reply to a boolean (`:0` is false).
#[inline]
pub fn frame_to_bool(frame: Frame) -> Result<bool, Error> {
    frame_to_int(frame).map(|i| i != 0)
}

/// Converts a bulk string reply to UTF-8 text; nil becomes `None`.
///
/// Invalid UTF-8 is a protocol error rather than being replaced, so the
/// text can be sent back to address the same key.
#[inline]
pub fn frame_to_opt_string(frame: Frame) -> Result<Option<String>, Error> {
    frame_to_bytes(frame)?.map(|b| utf8(&b)).transpose()
}

/// Converts an array of bulk strings to UTF-8 strings.
///
/// Fails with [`Error::Protocol`] if any element is not valid UTF-8.
#[inline]
pub fn frame_to_vec_string(frame: Frame) -> Result<Vec<String>, Error> {
    match frame {
        Frame::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Frame::BulkString(Some(b)) => utf8(&b),
                Frame::SimpleString(s) => utf8(&s),
                Frame::Error(e) => Err(server_error(&e)),
                other => Err(unexpected("bulk string in array", &other)),
            })
            .collect(),
        Frame::Error(e) => Err(server_error(&e)),
        other => Err(unexpected("array", &other)),
    }
}

/// Converts a BITFIELD reply.
///
/// A nil reply becomes `None`; a nil element (a sub-operation stopped by
/// `OVERFLOW FAIL`) becomes `Some(None)` at that position.
#[inline]
pub fn frame_to_int_array(frame: Frame) -> Result<Option<Vec<Option<i64>>>, Error> {
    match frame {
        Frame::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Frame::Integer(i) => Ok(Some(i)),
                Frame::BulkString(None) | Frame::Null => Ok(None),
                Frame::Error(e) => Err(server_error(&e)),
                other => Err(unexpected("integer in array", &other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Frame::Null | Frame::BulkString(None) => Ok(None),
        Frame::Error(e) => Err(server_error(&e)),
        other => Err(unexpected("array", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::bitfield::{BitFieldType, BitOffset};

    fn strs(cmd: &Cmd) -> Vec<String> {
        cmd.args()
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[test]
    fn test_into_frame() {
        assert_eq!(
            get("key").into_frame(),
            Frame::Array(vec![
                Frame::BulkString(Some("GET".into())),
                Frame::BulkString(Some("key".into()))
            ])
        );
    }

    #[test]
    fn test_set_plain() {
        assert_eq!(strs(&set("k", "v", None, None)), ["SET", "k", "v"]);
    }

    #[test]
    fn test_set_options() {
        assert_eq!(
            strs(&set("k", "v", Some(SetCondition::IfNotExists), None)),
            ["SET", "k", "v", "NX"]
        );
        assert_eq!(
            strs(&set("k", "v", Some(SetCondition::IfExists), None)),
            ["SET", "k", "v", "XX"]
        );
        assert_eq!(
            strs(&set("k", "v", None, Some(SetExpiry::Seconds(10)))),
            ["SET", "k", "v", "EX", "10"]
        );
        assert_eq!(
            strs(&set("k", "v", None, Some(SetExpiry::Milliseconds(1500)))),
            ["SET", "k", "v", "PX", "1500"]
        );
        assert_eq!(
            strs(&set("k", "v", None, Some(SetExpiry::KeepTtl))),
            ["SET", "k", "v", "KEEPTTL"]
        );
    }

    #[test]
    fn test_del_many() {
        assert_eq!(strs(&del(["a", "b", "c"])), ["DEL", "a", "b", "c"]);
    }

    #[test]
    fn test_restore_ttl_in_millis() {
        let cmd = restore("k", Duration::from_secs(2), Bytes::from_static(b"\x00blob"));
        assert_eq!(cmd.name(), b"RESTORE");
        assert_eq!(cmd.args()[2], Bytes::from("2000"));
        assert_eq!(cmd.args()[3], Bytes::from_static(b"\x00blob"));
    }

    #[test]
    fn test_bitcount_range() {
        assert_eq!(strs(&bitcount("k", 0, -1)), ["BITCOUNT", "k", "0", "-1"]);
    }

    #[test]
    fn test_bitfield_get_only_skips_overflow() {
        let ops = [BitFieldOp::Get {
            ty: BitFieldType::unsigned(8).unwrap(),
            offset: BitOffset::Field(0),
        }];
        assert_eq!(
            strs(&bitfield("k", &ops, Overflow::Wrap)),
            ["BITFIELD", "k", "GET", "u8", "#0"]
        );
    }

    #[test]
    fn test_bitfield_write_sends_overflow_first() {
        let ops = [
            BitFieldOp::IncrBy {
                ty: BitFieldType::signed(5).unwrap(),
                offset: BitOffset::Bit(100),
                increment: 1,
            },
            BitFieldOp::Get {
                ty: BitFieldType::unsigned(4).unwrap(),
                offset: BitOffset::Bit(0),
            },
        ];
        assert_eq!(
            strs(&bitfield("k", &ops, Overflow::Sat)),
            [
                "BITFIELD", "k", "OVERFLOW", "SAT", "INCRBY", "i5", "100", "1", "GET", "u4", "0"
            ]
        );
    }

    #[test]
    fn test_key_commands() {
        assert_eq!(strs(&dump("k")), ["DUMP", "k"]);
        assert_eq!(strs(&expire("k", 10)), ["EXPIRE", "k", "10"]);
        assert_eq!(strs(&expireat("k", 1700000000)), ["EXPIREAT", "k", "1700000000"]);
        assert_eq!(strs(&pexpire("k", 1000)), ["PEXPIRE", "k", "1000"]);
        assert_eq!(strs(&pexpireat("k", 1)), ["PEXPIREAT", "k", "1"]);
        assert_eq!(strs(&renamenx("a", "b")), ["RENAMENX", "a", "b"]);
        assert_eq!(strs(&keys("user:*")), ["KEYS", "user:*"]);
        assert_eq!(strs(&randomkey()), ["RANDOMKEY"]);
    }

    #[test]
    fn test_frame_to_int_server_error() {
        let err = frame_to_int(Frame::Error(b"ERR no such key".to_vec())).unwrap_err();
        assert_eq!(err.server_message(), Some("ERR no such key"));
    }

    #[test]
    fn test_frame_to_int_wrong_kind() {
        let err = frame_to_int(Frame::Array(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "protocol error: expected integer, got array");
    }

    #[test]
    fn test_frame_to_count_rejects_negative() {
        assert_eq!(frame_to_count(Frame::Integer(3)).unwrap(), 3);
        assert!(frame_to_count(Frame::Integer(-1)).is_err());
    }

    #[test]
    fn test_frame_to_status() {
        assert_eq!(
            frame_to_status(Frame::SimpleString(b"zset".to_vec())).unwrap(),
            "zset"
        );
    }

    #[test]
    fn test_frame_to_vec_string() {
        let frame = Frame::Array(vec![
            Frame::BulkString(Some("user:1".into())),
            Frame::BulkString(Some("user:2".into())),
        ]);
        assert_eq!(frame_to_vec_string(frame).unwrap(), ["user:1", "user:2"]);
    }

    #[test]
    fn test_non_utf8_names_are_rejected() {
        let frame = Frame::Array(vec![
            Frame::BulkString(Some("user:1".into())),
            Frame::BulkString(Some(Bytes::from_static(b"user:\xff"))),
        ]);
        let err = frame_to_vec_string(frame).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(err.to_string().contains("user:\\xff"));

        let truncated = Frame::BulkString(Some(Bytes::from_static(b"\xc3")));
        let err = frame_to_opt_string(truncated).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_frame_to_opt_string() {
        assert_eq!(
            frame_to_opt_string(Frame::BulkString(Some("k".into()))).unwrap(),
            Some("k".to_string())
        );
        assert_eq!(frame_to_opt_string(Frame::BulkString(None)).unwrap(), None);
    }

    #[test]
    fn test_frame_to_int_array() {
        let frame = Frame::Array(vec![Frame::Integer(27), Frame::BulkString(None)]);
        assert_eq!(
            frame_to_int_array(frame).unwrap(),
            Some(vec![Some(27), None])
        );
        assert_eq!(frame_to_int_array(Frame::Null).unwrap(), None);
    }
}
