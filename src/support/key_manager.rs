use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::core::command::{self, Cmd};
use crate::data_types::DataType;
use crate::key::Key;
use crate::proto::frame::Frame;
use crate::support::error::KeyError;
use crate::{Error, Executor, Result};

/// Remaining lifetime of a key as reported by `TTL` / `PTTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist (`-2`).
    Missing,
    /// The key exists and has no expiry (`-1`).
    Persistent,
    /// The key expires after this long.
    Expires(Duration),
}

impl Ttl {
    fn from_reply(n: i64, unit: fn(u64) -> Duration) -> Result<Self> {
        match n {
            -2 => Ok(Ttl::Missing),
            -1 => Ok(Ttl::Persistent),
            n if n >= 0 => Ok(Ttl::Expires(unit(n as u64))),
            n => Err(Error::Protocol {
                message: format!("unexpected TTL reply {n}"),
            }),
        }
    }
}

/// Key-lifecycle operations against one [`Executor`].
///
/// Each method sends exactly one command. A handful of server replies are
/// translated into [`KeyError`]s (see the method docs); every other server
/// error is returned unchanged as [`Error::Server`].
///
/// ```no_run
/// use redkey::{Client, Key, KeyManager};
///
/// # #[tokio::main]
/// # async fn main() -> redkey::Result<()> {
/// let keys = KeyManager::new(Client::connect("redis://127.0.0.1:6379").await?);
/// let session = Key::new("session:42");
/// keys.expire(&session, 300).await?;
/// let renamed = keys.rename(&session, &Key::new("session:43")).await?;
/// assert_eq!(renamed.as_str(), "session:43");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KeyManager<E> {
    client: E,
}

impl<E: Executor> KeyManager<E> {
    /// Binds a key manager to `client`.
    pub fn new(client: E) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &E {
        &self.client
    }

    async fn call(&self, cmd: Cmd) -> Result<Frame> {
        self.client.execute(cmd).await
    }

    /// Deletes `key`, returning how many keys were removed (0 or 1).
    pub async fn delete(&self, key: &Key) -> Result<u64> {
        command::frame_to_count(self.call(command::del([key])).await?)
    }

    /// Deletes every key in `keys`, returning how many existed.
    ///
    /// An empty slice sends nothing and returns 0.
    pub async fn delete_many(&self, keys: &[Key]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        command::frame_to_count(self.call(command::del(keys)).await?)
    }

    /// Serializes the value at `key` with `DUMP`.
    ///
    /// # Errors
    ///
    /// [`KeyError::DumpKeyNotFound`] if the key does not exist.
    #[instrument(skip(self), fields(key = %key), level = "debug")]
    pub async fn dump(&self, key: &Key) -> Result<Bytes> {
        match command::frame_to_bytes(self.call(command::dump(key)).await?)? {
            Some(payload) => Ok(payload),
            None => Err(KeyError::dump_key_not_found(key).into()),
        }
    }

    /// Recreates `key` from a [`dump`](Self::dump) payload, without expiry.
    pub async fn restore(&self, key: &Key, dump: Bytes) -> Result<bool> {
        self.restore_with_ttl(key, dump, Duration::ZERO).await
    }

    /// Recreates `key` from a dump payload, expiring after `ttl`
    /// (millisecond precision; zero means no expiry).
    ///
    /// Returns true if the server acknowledged with `OK`.
    ///
    /// # Errors
    ///
    /// [`KeyError::RestoreKeyExists`] if `key` already exists.
    #[instrument(skip(self, dump), fields(key = %key), level = "debug")]
    pub async fn restore_with_ttl(&self, key: &Key, dump: Bytes, ttl: Duration) -> Result<bool> {
        match self.call(command::restore(key, ttl, dump)).await? {
            Frame::Error(e) if e.starts_with(b"BUSYKEY") => {
                debug!("restore target already exists");
                Err(KeyError::restore_key_exists(key).into())
            }
            reply => Ok(command::frame_to_status(reply)?.eq_ignore_ascii_case("ok")),
        }
    }

    /// Whether `key` exists.
    pub async fn exists(&self, key: &Key) -> Result<bool> {
        command::frame_to_bool(self.call(command::exists(key)).await?)
    }

    /// Sets a timeout of `seconds` on `key`. False if the key does not exist.
    pub async fn expire(&self, key: &Key, seconds: i64) -> Result<bool> {
        command::frame_to_bool(self.call(command::expire(key, seconds)).await?)
    }

    /// Expires `key` at a unix timestamp in seconds.
    pub async fn expire_at_timestamp(&self, key: &Key, unix_seconds: i64) -> Result<bool> {
        command::frame_to_bool(self.call(command::expireat(key, unix_seconds)).await?)
    }

    /// Expires `key` at `at`, truncated to whole seconds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `at` is before the unix epoch.
    pub async fn expire_at_datetime(&self, key: &Key, at: SystemTime) -> Result<bool> {
        let since_epoch = at.duration_since(UNIX_EPOCH).map_err(|_| Error::InvalidArgument {
            message: "expiry time is before the unix epoch".to_string(),
        })?;
        self.expire_at_timestamp(key, to_i64(since_epoch.as_secs())?)
            .await
    }

    /// Removes any timeout from `key`. False if there was none.
    pub async fn persist(&self, key: &Key) -> Result<bool> {
        command::frame_to_bool(self.call(command::persist(key)).await?)
    }

    /// Sets a timeout of `milliseconds` on `key`.
    pub async fn p_expire(&self, key: &Key, milliseconds: i64) -> Result<bool> {
        command::frame_to_bool(self.call(command::pexpire(key, milliseconds)).await?)
    }

    /// Expires `key` at a unix timestamp in milliseconds.
    pub async fn p_expire_at(&self, key: &Key, unix_millis: i64) -> Result<bool> {
        command::frame_to_bool(self.call(command::pexpireat(key, unix_millis)).await?)
    }

    /// Remaining time to live in milliseconds; -1 without expiry, -2 if the
    /// key does not exist.
    pub async fn p_ttl(&self, key: &Key) -> Result<i64> {
        command::frame_to_int(self.call(command::pttl(key)).await?)
    }

    /// Returns a random key, or `None` if the database is empty.
    pub async fn random_key(&self) -> Result<Option<Key>> {
        let reply = command::frame_to_opt_string(self.call(command::randomkey()).await?)?;
        Ok(reply.map(Key::new))
    }

    /// Renames `key` to `new_key`, overwriting any existing `new_key`.
    ///
    /// Returns `new_key` on success.
    ///
    /// # Errors
    ///
    /// [`KeyError::RenameKeyNotFound`] if `key` does not exist.
    #[instrument(skip(self), fields(key = %key, new_key = %new_key), level = "debug")]
    pub async fn rename(&self, key: &Key, new_key: &Key) -> Result<Key> {
        let reply = self.call(command::rename(key, new_key)).await?;
        rename_reply(key, reply).and_then(command::parse_frame_response)?;
        Ok(new_key.clone())
    }

    /// Renames `key` to `target` only if `target` does not exist yet.
    ///
    /// Returns false, without error, when `target` already exists.
    ///
    /// # Errors
    ///
    /// [`KeyError::RenameKeyNotFound`] if `key` does not exist.
    #[instrument(skip(self), fields(key = %key, target = %target), level = "debug")]
    pub async fn rename_nx(&self, key: &Key, target: &Key) -> Result<bool> {
        let reply = self.call(command::renamenx(key, target)).await?;
        rename_reply(key, reply).and_then(command::frame_to_bool)
    }

    /// Same as [`rename_nx`](Self::rename_nx).
    pub async fn rename_if_available(&self, key: &Key, target: &Key) -> Result<bool> {
        self.rename_nx(key, target).await
    }

    /// Updates the last access time of `key`. False if it does not exist.
    pub async fn touch(&self, key: &Key) -> Result<bool> {
        command::frame_to_bool(self.call(command::touch(key)).await?)
    }

    /// Remaining time to live in seconds; -1 without expiry, -2 if the key
    /// does not exist.
    pub async fn ttl(&self, key: &Key) -> Result<i64> {
        command::frame_to_int(self.call(command::ttl(key)).await?)
    }

    /// The data type stored at `key`.
    ///
    /// # Errors
    ///
    /// [`KeyError::TypeNotFound`] if the key does not exist or holds a type
    /// [`DataType`] does not cover.
    #[instrument(skip(self), fields(key = %key), level = "debug")]
    pub async fn key_type(&self, key: &Key) -> Result<DataType> {
        let tag = command::frame_to_status(self.call(command::key_type(key)).await?)?;
        DataType::from_tag(&tag).ok_or_else(|| {
            debug!(%tag, "no data type for tag");
            KeyError::type_not_found(key).into()
        })
    }

    /// All keys matching a glob-style `pattern`, in server order.
    pub async fn matching(&self, pattern: &str) -> Result<Vec<Key>> {
        let names =
            command::frame_to_vec_string(self.call(command::keys(pattern.to_string())).await?)?;
        Ok(names.into_iter().map(Key::new).collect())
    }

    /// Same as [`matching`](Self::matching).
    pub async fn keys(&self, pattern: &str) -> Result<Vec<Key>> {
        self.matching(pattern).await
    }

    /// Sets a timeout on `key`, truncated to whole seconds.
    pub async fn set_ttl(&self, key: &Key, ttl: Duration) -> Result<bool> {
        self.expire(key, to_i64(ttl.as_secs())?).await
    }

    /// Sets a timeout on `key` with millisecond precision.
    pub async fn set_ttl_ms(&self, key: &Key, ttl: Duration) -> Result<bool> {
        let millis = u64::try_from(ttl.as_millis()).map_err(|_| too_large())?;
        self.p_expire(key, to_i64(millis)?).await
    }

    /// Remaining lifetime of `key` in whole seconds.
    pub async fn get_ttl(&self, key: &Key) -> Result<Ttl> {
        Ttl::from_reply(self.ttl(key).await?, Duration::from_secs)
    }

    /// Remaining lifetime of `key` in milliseconds.
    pub async fn get_ttl_ms(&self, key: &Key) -> Result<Ttl> {
        Ttl::from_reply(self.p_ttl(key).await?, Duration::from_millis)
    }
}

/// Maps the "no such key" reply of RENAME / RENAMENX.
fn rename_reply(key: &Key, reply: Frame) -> Result<Frame> {
    match reply {
        Frame::Error(e) if is_no_such_key(&e) => {
            debug!(key = %key, "rename source does not exist");
            Err(KeyError::rename_key_not_found(key).into())
        }
        reply => Ok(reply),
    }
}

fn is_no_such_key(message: &[u8]) -> bool {
    String::from_utf8_lossy(message)
        .to_ascii_lowercase()
        .contains("no such key")
}

fn to_i64(n: u64) -> Result<i64> {
    i64::try_from(n).map_err(|_| too_large())
}

fn too_large() -> Error {
    Error::InvalidArgument {
        message: "duration does not fit in a signed 64-bit integer".to_string(),
    }
}
