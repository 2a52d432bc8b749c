use bytes::BytesMut;
use std::io;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};

/// Stream of decoded lines from an async reader
pub type LineStream<R> = FramedRead<R, LossyLinesCodec>;

/// Longest line kept by [`line_stream`], in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Wrap a reader into a stream of lines
pub fn line_stream<R: AsyncRead>(reader: R) -> LineStream<R> {
    FramedRead::new(reader, LossyLinesCodec::default())
}

/// Newline-delimited decoder that tolerates invalid UTF-8
///
/// Device logs occasionally carry broken multi-byte sequences; those are
/// replaced rather than ending the stream. `\r\n` endings are stripped.
/// Lines longer than the maximum length are cut at that length and the rest
/// of the line is discarded.
#[derive(Clone, Debug)]
pub struct LossyLinesCodec {
    /// Bytes already scanned for a newline
    next_index: usize,

    max_length: usize,

    /// Skipping the tail of an over-long line
    discarding: bool,
}

impl Default for LossyLinesCodec {
    fn default() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl LossyLinesCodec {
    /// Decoder keeping at most `max_length` bytes of each line
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length: max_length.max(1),
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn take_line(&mut self, buf: &mut BytesMut, len: usize, consumed: usize) -> String {
        self.next_index = 0;
        let bytes = buf.split_to(consumed);
        if len > self.max_length {
            tracing::warn!(length = len, max = self.max_length, "truncating over-long line");
        }
        let line = String::from_utf8_lossy(&bytes[..len.min(self.max_length)]);
        line.strip_suffix('\r').unwrap_or(&*line).to_string()
    }
}

impl Decoder for LossyLinesCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            if self.discarding {
                self.next_index = 0;
                match newline {
                    Some(idx) => {
                        let _ = buf.split_to(idx + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        buf.clear();
                        return Ok(None);
                    }
                }
            }

            return match newline {
                Some(idx) => Ok(Some(self.take_line(buf, idx, idx + 1))),
                None if buf.len() > self.max_length => {
                    let len = buf.len();
                    self.discarding = true;
                    Ok(Some(self.take_line(buf, len, len)))
                }
                None => {
                    self.next_index = buf.len();
                    Ok(None)
                }
            };
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let len = buf.len();
        Ok(Some(self.take_line(buf, len, len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        line_stream(input)
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_splits_lines() {
        assert_eq!(collect(b"one\ntwo\r\nthree").await, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_keeps_empty_lines() {
        assert_eq!(collect(b"a\n\nb\n").await, vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let lines = collect(b"ok\nbad \xff byte\n").await;
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[1], "bad \u{FFFD} byte");
    }

    #[tokio::test]
    async fn test_long_line_is_truncated() {
        let input: &'static [u8] = b"abcdefgh\nij\n";
        let lines: Vec<String> = FramedRead::new(input, LossyLinesCodec::with_max_length(4))
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["abcd", "ij"]);
    }

    #[test]
    fn test_unterminated_line_does_not_grow_buffer() {
        let mut codec = LossyLinesCodec::with_max_length(4);
        let mut buf = BytesMut::from(&b"abcdefg"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("abcd"));
        assert!(buf.is_empty());

        buf.extend_from_slice(b"more tail");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b"xyz\nok\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("ok"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_default_max_length() {
        assert_eq!(LossyLinesCodec::default().max_length(), DEFAULT_MAX_LINE_LENGTH);
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(collect(b"").await.is_empty());
    }
}
