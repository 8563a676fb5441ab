use bytes::{Buf, BytesMut};

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted in a single reply.
const MAX_NESTING: usize = 512;

/// Incremental RESP decoder.
///
/// Feed network reads in with [`append`](Decoder::append) and pull frames
/// out with [`decode`](Decoder::decode). Parsing resumes where the previous
/// call stopped: finished elements of a partially received array are kept
/// aside, so each byte is examined a bounded number of times no matter how
/// the reply is split across reads.
///
/// ```
/// use redkey::proto::codec::Decoder;
/// use redkey::proto::frame::Frame;
///
/// let mut decoder = Decoder::new();
/// decoder.append(b":-2\r\n");
/// assert_eq!(decoder.decode().unwrap(), Some(Frame::Integer(-2)));
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    max_frame_size: usize,
    /// Arrays whose elements are still arriving, innermost last.
    pending: Vec<PendingArray>,
    /// Bytes already taken from `buf` for the frame in progress.
    frame_bytes: usize,
    /// Offset in `buf` before which the current line has no CRLF.
    line_scan: usize,
    /// Total bytes examined while searching for line ends.
    scanned: usize,
}

#[derive(Debug)]
struct PendingArray {
    len: usize,
    items: Vec<Frame>,
}

enum Step {
    Frame(Frame),
    Array(usize),
}

impl Decoder {
    /// Creates a decoder with the default 512 MB frame limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a decoder that rejects frames larger than `max_frame_size`.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
            pending: Vec::new(),
            frame_bytes: 0,
            line_scan: 0,
            scanned: 0,
        }
    }

    /// Appends raw bytes read from the network.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete frame.
    ///
    /// Returns `Ok(None)` when more data is needed and
    /// [`Error::Protocol`] when the buffered bytes are not valid RESP.
    /// After an error the decoder state is unspecified and the connection
    /// should be dropped.
    pub fn decode(&mut self) -> Result<Option<Frame>> {
        loop {
            let Some(step) = self.next_step()? else {
                if self.frame_bytes + self.buf.len() > self.max_frame_size {
                    return Err(protocol("buffered frame exceeds maximum frame size"));
                }
                return Ok(None);
            };
            match step {
                Step::Array(len) => {
                    if self.pending.len() >= MAX_NESTING {
                        return Err(protocol("array nesting exceeds maximum depth"));
                    }
                    self.pending.push(PendingArray {
                        len,
                        items: Vec::with_capacity(len.min(1024)),
                    });
                }
                Step::Frame(frame) => {
                    if let Some(done) = self.complete(frame) {
                        return Ok(Some(done));
                    }
                }
            }
        }
    }

    /// Adds a finished element to the innermost pending array, closing
    /// every array it fills. Returns the top-level frame once done.
    fn complete(&mut self, mut frame: Frame) -> Option<Frame> {
        while let Some(mut array) = self.pending.pop() {
            array.items.push(frame);
            if array.items.len() < array.len {
                self.pending.push(array);
                return None;
            }
            frame = Frame::Array(array.items);
        }
        self.frame_bytes = 0;
        Some(frame)
    }

    /// Parses one element at the front of the buffer and consumes it.
    /// Leaves the buffer untouched when the element is incomplete.
    fn next_step(&mut self) -> Result<Option<Step>> {
        let Some(&tag) = self.buf.first() else {
            return Ok(None);
        };
        let Some(line_end) = self.find_line_end() else {
            return Ok(None);
        };
        let header = &self.buf[1..line_end];
        let next = line_end + 2;

        let step = match tag {
            b'+' => Step::Frame(Frame::SimpleString(header.to_vec())),
            b'-' => Step::Frame(Frame::Error(header.to_vec())),
            b':' => Step::Frame(Frame::Integer(parse_int(header)?)),
            b'$' => match parse_int(header)? {
                -1 => Step::Frame(Frame::BulkString(None)),
                len => {
                    let len =
                        usize::try_from(len).map_err(|_| protocol("negative bulk length"))?;
                    return self.take_bulk(next, len);
                }
            },
            b'*' => match parse_int(header)? {
                -1 => Step::Frame(Frame::Null),
                0 => Step::Frame(Frame::Array(Vec::new())),
                len => {
                    let len =
                        usize::try_from(len).map_err(|_| protocol("negative array length"))?;
                    // Every element needs at least a tag byte and a CRLF.
                    if len > self.max_frame_size / 3 {
                        return Err(protocol("array length exceeds maximum frame size"));
                    }
                    Step::Array(len)
                }
            },
            other => {
                return Err(protocol(format!(
                    "unknown frame type byte: {:?}",
                    other as char
                )))
            }
        };

        self.consume(next);
        Ok(Some(step))
    }

    fn take_bulk(&mut self, start: usize, len: usize) -> Result<Option<Step>> {
        if len > self.max_frame_size {
            return Err(protocol("bulk string length exceeds maximum frame size"));
        }
        let end = start + len;
        if self.buf.len() < end + 2 {
            return Ok(None);
        }
        if &self.buf[end..end + 2] != b"\r\n" {
            return Err(protocol("bulk string is not terminated by CRLF"));
        }
        self.consume(start);
        let data = self.buf.split_to(len).freeze();
        self.frame_bytes += len;
        self.consume(2);
        Ok(Some(Step::Frame(Frame::BulkString(Some(data)))))
    }

    /// Finds the CRLF ending the line at the front of the buffer, resuming
    /// the search where the last unsuccessful one stopped.
    fn find_line_end(&mut self) -> Option<usize> {
        let from = self.line_scan.max(1);
        let rest = self.buf.get(from..)?;
        match rest.windows(2).position(|w| w == b"\r\n") {
            Some(i) => {
                self.scanned += i + 2;
                Some(from + i)
            }
            None => {
                self.scanned += rest.len();
                // A trailing CR may be completed by the next read.
                self.line_scan = self.buf.len().saturating_sub(1);
                None
            }
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.advance(n);
        self.frame_bytes += n;
        self.line_scan = 0;
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_int(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| protocol(format!("invalid integer: {:?}", String::from_utf8_lossy(line))))
}

fn protocol(message: impl Into<String>) -> Error {
    Error::Protocol {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn decode_all(input: &[u8]) -> Option<Frame> {
        let mut decoder = Decoder::new();
        decoder.append(input);
        decoder.decode().unwrap()
    }

    #[test]
    fn test_decode_status() {
        assert_eq!(
            decode_all(b"+OK\r\n"),
            Some(Frame::SimpleString(b"OK".to_vec()))
        );
    }

    #[test]
    fn test_decode_error_line() {
        assert_eq!(
            decode_all(b"-BUSYKEY Target key name already exists.\r\n"),
            Some(Frame::Error(
                b"BUSYKEY Target key name already exists.".to_vec()
            ))
        );
    }

    #[test]
    fn test_decode_negative_integer() {
        assert_eq!(decode_all(b":-1\r\n"), Some(Frame::Integer(-1)));
    }

    #[test]
    fn test_decode_bulk_string_with_crlf_inside() {
        assert_eq!(
            decode_all(b"$4\r\na\r\nb\r\n"),
            Some(Frame::BulkString(Some(Bytes::from_static(b"a\r\nb"))))
        );
    }

    #[test]
    fn test_decode_nils() {
        assert_eq!(decode_all(b"$-1\r\n"), Some(Frame::BulkString(None)));
        assert_eq!(decode_all(b"*-1\r\n"), Some(Frame::Null));
    }

    #[test]
    fn test_decode_bitfield_reply_with_nil() {
        assert_eq!(
            decode_all(b"*2\r\n:22\r\n$-1\r\n"),
            Some(Frame::Array(vec![
                Frame::Integer(22),
                Frame::BulkString(None)
            ]))
        );
    }

    #[test]
    fn test_partial_array_resumes() {
        let mut decoder = Decoder::new();
        decoder.append(b"*2\r\n$3\r\nfoo\r\n$3\r");
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.buffered(), 3);
        assert_eq!(decoder.pending.len(), 1);

        decoder.append(b"\nbar\r\n");
        assert_eq!(
            decoder.decode().unwrap(),
            Some(Frame::Array(vec![
                Frame::BulkString(Some(Bytes::from("foo"))),
                Frame::BulkString(Some(Bytes::from("bar"))),
            ]))
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_two_frames_in_one_read() {
        let mut decoder = Decoder::new();
        decoder.append(b":1\r\n:0\r\n");
        assert_eq!(decoder.decode().unwrap(), Some(Frame::Integer(1)));
        assert_eq!(decoder.decode().unwrap(), Some(Frame::Integer(0)));
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_unknown_type_byte() {
        let mut decoder = Decoder::new();
        decoder.append(b"?what\r\n");
        assert!(matches!(decoder.decode(), Err(Error::Protocol { .. })));
    }

    #[test]
    fn test_bulk_string_exceeds_max_size() {
        let mut decoder = Decoder::with_max_frame_size(10);
        decoder.append(b"$100\r\n");
        let err = decoder.decode().unwrap_err();
        assert!(err.to_string().contains("bulk string length exceeds"));
    }

    #[test]
    fn test_unterminated_line_exceeds_max_size() {
        let mut decoder = Decoder::with_max_frame_size(10);
        decoder.append(b"+");
        decoder.append(&[b'x'; 20]);
        let err = decoder.decode().unwrap_err();
        assert!(err.to_string().contains("exceeds maximum frame size"));
    }

    fn keys_reply(count: usize) -> Vec<u8> {
        let mut wire = format!("*{count}\r\n").into_bytes();
        for i in 0..count {
            let name = format!("user:{i}:name");
            wire.extend_from_slice(format!("${}\r\n{name}\r\n", name.len()).as_bytes());
        }
        wire
    }

    #[test]
    fn test_large_array_in_small_reads_scans_linearly() {
        let wire = keys_reply(100_000);
        let mut decoder = Decoder::new();
        let mut decoded = None;
        for chunk in wire.chunks(4096) {
            decoder.append(chunk);
            if let Some(frame) = decoder.decode().unwrap() {
                decoded = Some(frame);
            }
        }

        let Some(Frame::Array(items)) = decoded else {
            panic!("expected an array");
        };
        assert_eq!(items.len(), 100_000);
        assert_eq!(
            items[99_999],
            Frame::BulkString(Some(Bytes::from("user:99999:name")))
        );
        assert!(
            decoder.scanned <= wire.len(),
            "scanned {} bytes of a {} byte reply",
            decoder.scanned,
            wire.len()
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_split_points_do_not_change_result() {
        let wire = b"*3\r\n*2\r\n:1\r\n$3\r\nfoo\r\n$-1\r\n+OK\r\n";
        let expected = decode_all(wire);
        for split in 1..wire.len() {
            let mut decoder = Decoder::new();
            decoder.append(&wire[..split]);
            let first = decoder.decode().unwrap();
            decoder.append(&wire[split..]);
            let frame = first.or_else(|| decoder.decode().unwrap());
            assert_eq!(frame, expected, "split at {split}");
        }
    }

    #[test]
    fn test_long_status_line_in_small_reads() {
        let mut wire = vec![b'+'];
        wire.extend(std::iter::repeat(b'x').take(64 * 1024));
        wire.extend_from_slice(b"\r\n");

        let mut decoder = Decoder::new();
        let mut decoded = None;
        for chunk in wire.chunks(100) {
            decoder.append(chunk);
            decoded = decoded.or(decoder.decode().unwrap());
        }
        assert!(matches!(decoded, Some(Frame::SimpleString(s)) if s.len() == 64 * 1024));
        assert!(decoder.scanned <= 2 * wire.len());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut decoder = Decoder::new();
        decoder.append(&b"*1\r\n".repeat(100_000));
        let err = decoder.decode().unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = MAX_NESTING;
        let mut wire = b"*1\r\n".repeat(depth);
        wire.extend_from_slice(b":7\r\n");

        let mut frame = decode_all(&wire).unwrap();
        for _ in 0..depth {
            let Frame::Array(mut items) = frame else {
                panic!("expected an array");
            };
            frame = items.remove(0);
        }
        assert_eq!(frame, Frame::Integer(7));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(decode_all(b"*0\r\n"), Some(Frame::Array(Vec::new())));
    }
}
