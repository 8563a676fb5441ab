use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::trace;

use crate::proto::codec::{Decoder, Encoder};
use crate::proto::frame::Frame;
use crate::{Error, Result};

const READ_CHUNK: usize = 4096;

/// A framed connection to a Redis server.
///
/// Wraps a byte stream (normally a `TcpStream`) and converts between RESP
/// bytes and [`Frame`]s. [`split`](Connection::split) separates the read
/// and write sides so they can be driven by different tasks.
pub struct Connection<S> {
    reader: ConnectionReader<S>,
    writer: ConnectionWriter<S>,
}

/// Read half of a [`Connection`].
pub struct ConnectionReader<S> {
    stream: ReadHalf<S>,
    decoder: Decoder,
}

/// Write half of a [`Connection`].
pub struct ConnectionWriter<S> {
    stream: WriteHalf<S>,
    encoder: Encoder,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Creates a connection over `stream`.
    pub fn new(stream: S) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: ConnectionReader {
                stream: read,
                decoder: Decoder::new(),
            },
            writer: ConnectionWriter {
                stream: write,
                encoder: Encoder::new(),
            },
        }
    }

    /// Writes one frame and flushes it.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_frame(frame).await
    }

    /// Reads the next complete frame.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        self.reader.read_frame().await
    }

    /// Sends one frame and waits for its reply.
    pub async fn round_trip(&mut self, frame: &Frame) -> Result<Frame> {
        self.write_frame(frame).await?;
        self.read_frame().await
    }

    /// Splits the connection into independently owned halves.
    pub fn split(self) -> (ConnectionReader<S>, ConnectionWriter<S>) {
        (self.reader, self.writer)
    }
}

impl<S> ConnectionReader<S>
where
    S: AsyncRead,
{
    /// Reads until the decoder yields a complete frame.
    ///
    /// Fails with [`Error::Protocol`] if the peer closes the stream first.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.decoder.decode()? {
                trace!(kind = frame.kind(), "decoded frame");
                return Ok(frame);
            }
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Err(Error::Protocol {
                    message: "connection closed by server".to_string(),
                });
            }
            self.decoder.append(&buf[..n]);
        }
    }
}

impl<S> ConnectionWriter<S>
where
    S: AsyncWrite,
{
    /// Encodes and writes one frame, then flushes the stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.encoder.encode(frame);
        let data = self.encoder.take();
        self.stream.write_all(&data).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("buffered", &self.reader.decoder.buffered())
            .finish()
    }
}
