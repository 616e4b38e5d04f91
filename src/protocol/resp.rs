use std::fmt::Display;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;

use anyhow::{bail, Context, Result};
use bytes::Bytes;

/// One RESP frame. `Bulk` payloads are opaque bytes; only the command token
/// of a request array ever gets interpreted as text (see `protocol::command`).
/// `File` is the headerless bulk used for the RDB transfer after FULLRESYNC:
/// `$<len>\r\n<bytes>` with no trailing CRLF.
#[derive(Debug, Clone, PartialEq)]
pub enum RESP {
    String(String),
    Error(String),
    Int(i64),
    Bulk(Bytes),
    Array(Vec<RESP>),
    Null,
    File(Vec<u8>),
}

impl RESP {
    pub fn bulk(value: impl AsRef<[u8]>) -> RESP {
        RESP::Bulk(Bytes::copy_from_slice(value.as_ref()))
    }

    /// Builds a command request: an array of bulk strings.
    pub fn command(tokens: &[&str]) -> RESP {
        RESP::Array(tokens.iter().map(RESP::bulk).collect())
    }
}

impl Display for RESP {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RESP::String(s) => write!(f, "{}", s),
            RESP::Error(s) => write!(f, "!{}", s),
            RESP::Int(i) => write!(f, "{}", i),
            RESP::Bulk(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            RESP::Array(array) => {
                for item in array {
                    write!(f, "{} ", item)?;
                }
                Ok(())
            }
            RESP::Null => write!(f, "null"),
            RESP::File(file) => write!(f, "File[{}]", file.len()),
        }
    }
}

/// Encodes one frame into a fresh buffer. Writing the buffer in one piece
/// keeps socket writes whole-frame and gives callers the encoded length for
/// the replication offset.
pub fn encode(message: &RESP) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(&mut buf, message);
    buf
}

fn encode_into(buf: &mut Vec<u8>, message: &RESP) {
    match message {
        RESP::String(s) => {
            buf.extend_from_slice(format!("+{}\r\n", s).as_bytes());
        }
        RESP::Error(s) => {
            buf.extend_from_slice(format!("-{}\r\n", s).as_bytes());
        }
        RESP::Int(n) => {
            buf.extend_from_slice(format!(":{}\r\n", n).as_bytes());
        }
        RESP::Bulk(b) => {
            buf.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
            buf.extend_from_slice(b);
            buf.extend_from_slice(b"\r\n");
        }
        RESP::Null => {
            buf.extend_from_slice(b"$-1\r\n");
        }
        RESP::Array(array) => {
            buf.extend_from_slice(format!("*{}\r\n", array.len()).as_bytes());
            for item in array {
                encode_into(buf, item);
            }
        }
        RESP::File(file) => {
            buf.extend_from_slice(format!("${}\r\n", file.len()).as_bytes());
            buf.extend_from_slice(file);
        }
    }
}

/// Decodes the next frame. `Ok(None)` means the peer closed the connection
/// cleanly before a new frame started; a close mid-frame is an error.
pub fn decode_message<R: BufRead>(reader: &mut R) -> Result<Option<RESP>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(decode_frame(reader, &line)?))
}

fn decode_frame<R: BufRead>(reader: &mut R, line: &str) -> Result<RESP> {
    let line = line.trim_end_matches(['\r', '\n']);
    let type_byte = match line.as_bytes().first() {
        Some(byte) => *byte,
        None => bail!("empty frame line"),
    };
    // recognized type bytes are ASCII; anything else falls through to the
    // unknown-frame error without slicing mid-character
    let rest = line.get(1..).unwrap_or("");
    match type_byte {
        b'+' => Ok(RESP::String(rest.to_string())),
        b'-' => Ok(RESP::Error(rest.to_string())),
        b':' => Ok(RESP::Int(
            rest.parse().with_context(|| format!("bad integer frame: {}", line))?,
        )),
        b'$' => {
            let len: i64 = rest
                .parse()
                .with_context(|| format!("bad bulk length: {}", line))?;
            if len < 0 {
                return Ok(RESP::Null);
            }
            // payload plus the CRLF delimiter
            let mut buf = vec![0u8; len as usize + 2];
            reader
                .read_exact(&mut buf)
                .context("bulk payload cut short")?;
            if &buf[len as usize..] != b"\r\n" {
                bail!("bulk payload not terminated by CRLF");
            }
            buf.truncate(len as usize);
            Ok(RESP::Bulk(Bytes::from(buf)))
        }
        b'*' => {
            let len: i64 = rest
                .parse()
                .with_context(|| format!("bad array length: {}", line))?;
            if len < 0 {
                return Ok(RESP::Null);
            }
            let mut array = Vec::with_capacity(len as usize);
            for _ in 0..len {
                match decode_message(reader)? {
                    Some(item) => array.push(item),
                    None => bail!("array cut short after {} items", array.len()),
                }
            }
            Ok(RESP::Array(array))
        }
        _ => bail!("unknown frame type: {}", line),
    }
}

/// A buffered RESP connection over a TCP stream, shared by client workers,
/// the replica-side master link and master-side replica sinks.
pub struct RespConnection {
    peer: String,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RespConnection {
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "?".to_string());
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Ok(Self { peer, reader, writer })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn read_message(&mut self) -> Result<Option<RESP>> {
        decode_message(&mut self.reader)
    }

    /// Writes one frame, returns its encoded length.
    pub fn send_message(&mut self, message: &RESP) -> Result<usize> {
        let buf = encode(message);
        self.writer.write_all(&buf)?;
        self.writer.flush()?;
        Ok(buf.len())
    }

    pub fn send_messages(&mut self, messages: &[&RESP]) -> Result<usize> {
        let mut len = 0;
        for message in messages {
            len += self.send_message(message)?;
        }
        Ok(len)
    }

    /// Reads the `$<n>\r\n<n bytes>` RDB transfer that follows FULLRESYNC.
    /// Unlike a bulk string there is no trailing CRLF.
    pub fn read_rdb_payload(&mut self) -> Result<Vec<u8>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            bail!("connection closed before RDB transfer");
        }
        let line = line.trim_end_matches(['\r', '\n']);
        let len: usize = line
            .strip_prefix('$')
            .and_then(|l| l.parse().ok())
            .with_context(|| format!("invalid RDB transfer header: {}", line))?;
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact(&mut buf)
            .context("RDB transfer cut short")?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn round_trip(message: &RESP) -> RESP {
        let mut cursor = Cursor::new(encode(message));
        decode_message(&mut cursor).unwrap().unwrap()
    }

    #[test]
    fn command_arrays_round_trip() {
        let message = RESP::command(&["SET", "foo", "bar", "PX", "100"]);
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn bulk_payload_is_binary_safe() {
        let message = RESP::Bulk(Bytes::from_static(b"a\r\nb\x00c"));
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn empty_array_round_trips() {
        assert_eq!(round_trip(&RESP::Array(vec![])), RESP::Array(vec![]));
    }

    #[test]
    fn null_encodes_as_negative_bulk() {
        assert_eq!(encode(&RESP::Null), b"$-1\r\n");
        assert_eq!(round_trip(&RESP::Null), RESP::Null);
    }

    #[test]
    fn scalar_frames_round_trip() {
        for message in [
            RESP::String("OK".to_string()),
            RESP::Error("ERR oops".to_string()),
            RESP::Int(-42),
        ] {
            assert_eq!(round_trip(&message), message);
        }
    }

    #[test]
    fn file_frame_has_no_trailing_crlf() {
        assert_eq!(encode(&RESP::File(vec![1, 2, 3])), b"$3\r\n\x01\x02\x03");
    }

    #[test]
    fn eof_before_frame_is_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(decode_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn truncated_bulk_is_an_error() {
        let mut cursor = Cursor::new(b"$10\r\nshort".to_vec());
        assert!(decode_message(&mut cursor).is_err());
    }
}
