use bytes::{BufMut, BytesMut};

use crate::proto::frame::Frame;

/// Serializes [`Frame`]s into RESP bytes.
///
/// Frames accumulate in an internal buffer until [`take`](Encoder::take)
/// hands the bytes over, so several frames can be batched into one write.
///
/// ```
/// use redkey::proto::codec::Encoder;
/// use redkey::proto::frame::Frame;
///
/// let mut encoder = Encoder::new();
/// encoder.encode(&Frame::Integer(7));
/// assert_eq!(&encoder.take()[..], b":7\r\n");
/// ```
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates a new encoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the RESP form of `frame` to the buffer.
    pub fn encode(&mut self, frame: &Frame) {
        match frame {
            Frame::SimpleString(s) => self.put_line(b'+', s),
            Frame::Error(e) => self.put_line(b'-', e),
            Frame::Integer(n) => self.put_line(b':', n.to_string().as_bytes()),
            Frame::BulkString(None) => self.put_line(b'$', b"-1"),
            Frame::BulkString(Some(data)) => {
                self.put_line(b'$', data.len().to_string().as_bytes());
                self.buf.extend_from_slice(data);
                self.buf.extend_from_slice(b"\r\n");
            }
            Frame::Array(items) => {
                self.put_line(b'*', items.len().to_string().as_bytes());
                for item in items {
                    self.encode(item);
                }
            }
            Frame::Null => self.put_line(b'*', b"-1"),
        }
    }

    /// Number of bytes waiting in the buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been encoded since the last `take`.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Takes the encoded bytes, leaving the encoder ready for reuse.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    fn put_line(&mut self, prefix: u8, body: &[u8]) {
        self.buf.reserve(body.len() + 3);
        self.buf.put_u8(prefix);
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn encoded(frame: Frame) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.encode(&frame);
        encoder.take().to_vec()
    }

    #[test]
    fn test_encode_status_and_error() {
        assert_eq!(encoded(Frame::SimpleString(b"OK".to_vec())), b"+OK\r\n");
        assert_eq!(
            encoded(Frame::Error(b"ERR no such key".to_vec())),
            b"-ERR no such key\r\n"
        );
    }

    #[test]
    fn test_encode_negative_integer() {
        assert_eq!(encoded(Frame::Integer(-2)), b":-2\r\n");
    }

    #[test]
    fn test_encode_binary_bulk_string() {
        let frame = Frame::BulkString(Some(Bytes::from_static(b"\x00\r\n\xff")));
        assert_eq!(encoded(frame), b"$4\r\n\x00\r\n\xff\r\n");
    }

    #[test]
    fn test_encode_nil_values() {
        assert_eq!(encoded(Frame::BulkString(None)), b"$-1\r\n");
        assert_eq!(encoded(Frame::Null), b"*-1\r\n");
    }

    #[test]
    fn test_encode_command_array() {
        let frame = Frame::Array(vec![
            Frame::BulkString(Some(Bytes::from("TTL"))),
            Frame::BulkString(Some(Bytes::from("user:1"))),
        ]);
        assert_eq!(encoded(frame), b"*2\r\n$3\r\nTTL\r\n$6\r\nuser:1\r\n");
    }

    #[test]
    fn test_take_resets_buffer() {
        let mut encoder = Encoder::new();
        encoder.encode(&Frame::Integer(1));
        assert_eq!(encoder.len(), 4);
        let _ = encoder.take();
        assert!(encoder.is_empty());
    }
}
