//! # Client capability
//!
//! The facades in this crate talk to Redis through the [`Executor`] trait:
//! send one command, get one reply frame. [`Client`] is the bundled
//! implementation, a multiplexed RESP2 connection over TCP.
//!
//! ## Modules
//!
//! - [`builder`] - Client configuration
//! - [`command`] - Command builders and reply conversions
//! - [`connection`] - Framed stream handling
//! - [`multiplexed`] - One connection shared by many callers

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, instrument};

use crate::proto::frame::Frame;
pub use crate::proto::error::{Error, Result};

/// Client builder configuration.
pub mod builder;
/// Command construction helpers.
pub mod command;
/// Low-level connection management.
pub mod connection;
/// Multiplexing logic.
pub mod multiplexed;

use builder::{ClientBuilder, ConnectionSettings};
use command::Cmd;

/// Anything that can run a single Redis command.
///
/// Implementations must return the server's reply frame as-is, including
/// `Frame::Error` replies; translating those is the caller's job. Transport
/// failures are returned as `Err`.
pub trait Executor: Send + Sync {
    /// Sends `cmd` and resolves to its reply.
    fn execute(&self, cmd: Cmd) -> BoxFuture<'_, Result<Frame>>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, cmd: Cmd) -> BoxFuture<'_, Result<Frame>> {
        (**self).execute(cmd)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, cmd: Cmd) -> BoxFuture<'_, Result<Frame>> {
        (**self).execute(cmd)
    }
}

/// Redis client for a standalone server.
///
/// Cloning is cheap; all clones share one multiplexed connection.
///
/// # Example
///
/// ```no_run
/// use redkey::{Client, Key, KeyManager};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::connect("redis://localhost:6379").await?;
///     let keys = KeyManager::new(client);
///     let exists = keys.exists(&Key::new("user:1000")).await?;
///     println!("user:1000 exists: {exists}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    connection: multiplexed::MultiplexedConnection,
}

impl Client {
    /// Connects with default settings to `addr` (`redis://host:port`).
    pub async fn connect<T: AsRef<str>>(addr: T) -> Result<Self> {
        ClientBuilder::new().address(addr.as_ref()).build().await
    }

    /// Returns a [`ClientBuilder`] for finer control.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    #[instrument(skip(settings), fields(address = %settings.socket_address()))]
    pub(crate) async fn connect_with(settings: ConnectionSettings) -> Result<Self> {
        let address = settings.socket_address();
        let connect = tokio::net::TcpStream::connect(&address);
        let stream = match settings.connection_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| Error::Timeout {
                    address: address.clone(),
                })??,
            None => connect.await?,
        };
        stream.set_nodelay(true)?;

        let mut connection = connection::Connection::new(stream);

        if let Some(password) = settings.password {
            let auth = match settings.username {
                Some(username) => command::auth_with_username(username, password),
                None => command::auth(password),
            };
            if let Frame::Error(e) = connection.round_trip(&auth.into_frame()).await? {
                debug!(reply = %String::from_utf8_lossy(&e), "authentication rejected");
                return Err(Error::Auth);
            }
        }

        if let Some(db) = settings.database {
            let reply = connection
                .round_trip(&command::select(db).into_frame())
                .await?;
            command::parse_frame_response(reply)?;
        }

        if let Some(name) = settings.client_name {
            let reply = connection
                .round_trip(&command::client_setname(name).into_frame())
                .await?;
            command::parse_frame_response(reply)?;
        }

        debug!("connected");
        let connection = multiplexed::MultiplexedConnection::new(connection, settings.queue_size);
        Ok(Self { connection })
    }

    /// Sends a PING and checks for the PONG status.
    pub async fn ping(&self) -> Result<()> {
        let reply = self.execute(command::ping()).await?;
        match command::frame_to_status(reply)?.as_str() {
            "PONG" => Ok(()),
            other => Err(Error::Protocol {
                message: format!("unexpected PING reply: {other}"),
            }),
        }
    }
}

impl Executor for Client {
    fn execute(&self, cmd: Cmd) -> BoxFuture<'_, Result<Frame>> {
        self.connection.send(cmd.into_frame()).boxed()
    }
}
