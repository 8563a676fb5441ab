use bytes::Bytes;
use tracing::instrument;

use crate::core::command::{self, Cmd, SetCondition, SetExpiry};
use crate::data_types::bitfield::{BitFieldOp, BitFieldType, BitOffset, Overflow};
use crate::key::Key;
use crate::proto::frame::Frame;
use crate::{Executor, Result};

/// Reply of a `BITFIELD` call: one entry per sub-operation, `None` where
/// `OVERFLOW FAIL` stopped a write.
pub type BitFieldReply = Option<Vec<Option<i64>>>;

/// Operations on the string value stored at one key.
///
/// Writers return `&mut Self` so calls can be chained:
///
/// ```no_run
/// use redkey::{Client, Key, RedisString};
///
/// # #[tokio::main]
/// # async fn main() -> redkey::Result<()> {
/// let client = Client::connect("redis://127.0.0.1:6379").await?;
/// let mut greeting = RedisString::new(client, Key::new("greeting"));
/// greeting.set("Hello").await?.append(", World").await?;
/// assert_eq!(greeting.length(), Some(12));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RedisString<E> {
    client: E,
    key: Key,
    length: Option<u64>,
}

impl<E: Executor> RedisString<E> {
    /// Wraps the string stored at `key`.
    pub fn new(client: E, key: Key) -> Self {
        Self {
            client,
            key,
            length: None,
        }
    }

    /// The key this string lives at.
    pub fn key(&self) -> &Key {
        &self.key
    }

    async fn call(&self, cmd: Cmd) -> Result<Frame> {
        self.client.execute(cmd).await
    }

    async fn write(
        &mut self,
        value: Bytes,
        condition: Option<SetCondition>,
        expiry: Option<SetExpiry>,
    ) -> Result<&mut Self> {
        let cmd = command::set(&self.key, value, condition, expiry);
        command::parse_frame_response(self.call(cmd).await?)?;
        Ok(self)
    }

    /// `SET key value`.
    pub async fn set(&mut self, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.write(value.into(), None, None).await
    }

    /// `SET key value NX`: only writes if the key is absent.
    pub async fn set_if_not_exists(&mut self, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.write(value.into(), Some(SetCondition::IfNotExists), None)
            .await
    }

    /// `SET key value XX`: only writes if the key already exists.
    pub async fn set_if_exists(&mut self, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.write(value.into(), Some(SetCondition::IfExists), None)
            .await
    }

    /// Same as [`set_if_exists`](Self::set_if_exists).
    pub async fn override_value(&mut self, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.set_if_exists(value).await
    }

    /// `SET key value EX seconds`.
    pub async fn set_and_expire(
        &mut self,
        value: impl Into<Bytes>,
        seconds: u64,
    ) -> Result<&mut Self> {
        self.write(value.into(), None, Some(SetExpiry::Seconds(seconds)))
            .await
    }

    /// `SET key value PX milliseconds`.
    pub async fn set_and_expire_ms(
        &mut self,
        value: impl Into<Bytes>,
        milliseconds: u64,
    ) -> Result<&mut Self> {
        self.write(
            value.into(),
            None,
            Some(SetExpiry::Milliseconds(milliseconds)),
        )
        .await
    }

    /// `SET key value KEEPTTL`: replaces the value, keeps the expiry.
    pub async fn set_and_keep_ttl(&mut self, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.write(value.into(), None, Some(SetExpiry::KeepTtl)).await
    }

    /// `GET key`.
    pub async fn get(&self) -> Result<Option<Bytes>> {
        command::frame_to_bytes(self.call(command::get(&self.key)).await?)
    }

    /// `APPEND key value`, remembering the new total length.
    pub async fn append(&mut self, value: impl Into<Bytes>) -> Result<&mut Self> {
        let reply = self.call(command::append(&self.key, value)).await?;
        self.length = Some(command::frame_to_count(reply)?);
        Ok(self)
    }

    /// Length reported by the last [`append`](Self::append) or
    /// [`fetch_length`](Self::fetch_length); `None` if neither ran yet.
    ///
    /// This never contacts the server, so it may be stale.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// `STRLEN key`: reads the current length and remembers it.
    pub async fn fetch_length(&mut self) -> Result<u64> {
        let len = command::frame_to_count(self.call(command::strlen(&self.key)).await?)?;
        self.length = Some(len);
        Ok(len)
    }

    /// Counts set bits in the whole value.
    pub async fn bit_count(&self) -> Result<u64> {
        self.bit_count_range(0, -1).await
    }

    /// Counts set bits between byte offsets `start` and `end` inclusive;
    /// negative offsets count from the end.
    pub async fn bit_count_range(&self, start: i64, end: i64) -> Result<u64> {
        command::frame_to_count(self.call(command::bitcount(&self.key, start, end)).await?)
    }

    /// Writes `value` into one field, replying with the previous value.
    pub async fn bit_field_set(
        &self,
        ty: BitFieldType,
        offset: BitOffset,
        value: i64,
    ) -> Result<BitFieldReply> {
        self.bit_field(&[BitFieldOp::Set { ty, offset, value }], Overflow::Wrap)
            .await
    }

    /// Reads one field.
    pub async fn bit_field_get(
        &self,
        ty: BitFieldType,
        offset: BitOffset,
    ) -> Result<BitFieldReply> {
        self.bit_field(&[BitFieldOp::Get { ty, offset }], Overflow::Wrap)
            .await
    }

    /// Adds `increment` to one field, replying with the new value.
    pub async fn bit_field_increment_by(
        &self,
        ty: BitFieldType,
        offset: BitOffset,
        increment: i64,
    ) -> Result<BitFieldReply> {
        self.bit_field(
            &[BitFieldOp::IncrBy {
                ty,
                offset,
                increment,
            }],
            Overflow::Wrap,
        )
        .await
    }

    /// Runs several sub-operations in one `BITFIELD` call.
    #[instrument(skip(self, ops), fields(key = %self.key, ops = ops.len()), level = "debug")]
    pub async fn bit_field(&self, ops: &[BitFieldOp], overflow: Overflow) -> Result<BitFieldReply> {
        let cmd = command::bitfield(&self.key, ops, overflow);
        command::frame_to_int_array(self.call(cmd).await?)
    }
}
