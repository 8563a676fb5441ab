use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::core::connection::{Connection, ConnectionReader, ConnectionWriter};
use crate::proto::frame::Frame;
use crate::{Error, Result};

type Reply = oneshot::Sender<Result<Frame>>;

struct Request {
    frame: Frame,
    reply: Reply,
}

/// A cloneable handle to one connection shared by many callers.
///
/// A writer task sends requests in arrival order and queues each reply
/// slot; a reader task matches incoming frames to those slots in the same
/// order. Both tasks stop when the connection fails or every handle has
/// been dropped.
#[derive(Clone)]
pub struct MultiplexedConnection {
    sender: mpsc::Sender<Request>,
}

impl MultiplexedConnection {
    /// Spawns the writer and reader tasks for `connection`.
    ///
    /// `queue_size` bounds both the pending-request and in-flight queues.
    pub fn new<S>(connection: Connection<S>, queue_size: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = connection.split();
        let (request_tx, request_rx) = mpsc::channel(queue_size);
        let (waiter_tx, waiter_rx) = mpsc::channel(queue_size);

        tokio::spawn(run_writer(writer, request_rx, waiter_tx));
        tokio::spawn(run_reader(reader, waiter_rx));

        Self { sender: request_tx }
    }

    /// Sends a frame and waits for the matching reply.
    pub async fn send(&self, frame: Frame) -> Result<Frame> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request { frame, reply })
            .await
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }

    /// True once the background tasks have stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for MultiplexedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplexedConnection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn closed() -> Error {
    Error::Io {
        source: io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"),
    }
}

async fn run_writer<S>(
    mut writer: ConnectionWriter<S>,
    mut request_rx: mpsc::Receiver<Request>,
    waiter_tx: mpsc::Sender<Reply>,
) where
    S: AsyncWrite,
{
    while let Some(req) = request_rx.recv().await {
        debug!(frame = ?req.frame, "sending frame");
        if let Err(e) = writer.write_frame(&req.frame).await {
            error!(error = %e, "failed to write frame");
            let _ = req.reply.send(Err(e));
            return;
        }
        if waiter_tx.send(req.reply).await.is_err() {
            return;
        }
    }
}

async fn run_reader<S>(mut reader: ConnectionReader<S>, mut waiter_rx: mpsc::Receiver<Reply>)
where
    S: AsyncRead,
{
    while let Some(reply) = waiter_rx.recv().await {
        match reader.read_frame().await {
            Ok(frame) => {
                debug!(frame = ?frame, "received frame");
                let _ = reply.send(Ok(frame));
            }
            Err(e) => {
                error!(error = %e, "failed to read frame");
                let _ = reply.send(Err(e));
                return;
            }
        }
    }
}
