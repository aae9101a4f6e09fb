//! Pull-based decoding of a newline-delimited response body.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

use super::codec::EncodingScheme;
use super::errors::RemoteError;
use crate::domain::models::Item;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Decodes one Item per line of a streamed response body.
///
/// Only the current chunk and any unfinished line are buffered. Dropping the stream drops
/// the underlying response, which closes the connection; the remote side is
/// not told to stop. The stream ends after the first error.
pub struct LineDecoderStream {
    inner: ByteStream,
    buffer: Vec<u8>,
    /// Start of the unconsumed bytes in `buffer`
    consumed: usize,
    /// Bytes before this offset are known to hold no newline
    scanned: usize,
    scheme: EncodingScheme,
    expected: usize,
    decoded: usize,
    inner_done: bool,
    finished: bool,
}

impl std::fmt::Debug for LineDecoderStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineDecoderStream")
            .field("scheme", &self.scheme)
            .field("expected", &self.expected)
            .field("decoded", &self.decoded)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl LineDecoderStream {
    /// Wrap a byte stream expected to carry `expected` lines
    pub fn new(
        stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
        scheme: EncodingScheme,
        expected: usize,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
            buffer: Vec::new(),
            consumed: 0,
            scanned: 0,
            scheme,
            expected,
            decoded: 0,
            inner_done: false,
            finished: false,
        }
    }

    /// Number of Items decoded so far
    pub const fn decoded(&self) -> usize {
        self.decoded
    }

    pub const fn scheme(&self) -> EncodingScheme {
        self.scheme
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Item, RemoteError> {
        if self.decoded >= self.expected {
            self.finished = true;
            return Err(RemoteError::RowCountMismatch {
                expected: self.expected,
                actual: self.decoded + 1,
            });
        }
        match self.scheme.decode(line) {
            Ok(item) => {
                self.decoded += 1;
                Ok(item)
            }
            Err(source) => {
                warn!(line = self.decoded, error = %source, "Failed to decode remote line");
                self.finished = true;
                Err(RemoteError::Decode {
                    line: self.decoded,
                    source,
                })
            }
        }
    }

    fn finish(&mut self) -> Option<Result<Item, RemoteError>> {
        self.finished = true;
        if self.decoded == self.expected {
            debug!(rows = self.decoded, "Remote stream complete");
            None
        } else {
            Some(Err(RemoteError::RowCountMismatch {
                expected: self.expected,
                actual: self.decoded,
            }))
        }
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &line[..end]
}

impl Stream for LineDecoderStream {
    type Item = Result<Item, RemoteError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            let from = this.scanned;
            if let Some(offset) = this.buffer[from..].iter().position(|b| *b == b'\n') {
                let newline = from + offset;
                let raw = this.buffer[this.consumed..=newline].to_vec();
                this.consumed = newline + 1;
                this.scanned = this.consumed;
                let line = trim_line(&raw);
                if line.is_empty() {
                    continue;
                }
                return Poll::Ready(Some(this.decode_line(line)));
            }
            this.scanned = this.buffer.len();

            if this.inner_done {
                let raw = this.buffer.split_off(this.consumed);
                this.buffer.clear();
                this.consumed = 0;
                this.scanned = 0;
                if trim_line(&raw).is_empty() {
                    return Poll::Ready(this.finish());
                }
                return Poll::Ready(Some(this.decode_line(trim_line(&raw))));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.drain(..this.consumed);
                    this.scanned -= this.consumed;
                    this.consumed = 0;
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(RemoteError::Network(err))));
                }
                Poll::Ready(None) => {
                    this.inner_done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use serde_json::json;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static {
        let owned: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .map(|part| Ok(Bytes::from(part.to_string())))
            .collect();
        stream::iter(owned)
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let body = chunks(&["{\"a\":", "1}\n{\"a\"", ":2}\n", "null\n"]);
        let items: Vec<_> = LineDecoderStream::new(body, EncodingScheme::Json, 3)
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &Item::Json(json!({"a": 1})));
        assert_eq!(items[1].as_ref().unwrap(), &Item::Json(json!({"a": 2})));
        assert!(items[2].as_ref().unwrap().is_null());
    }

    #[tokio::test]
    async fn test_long_line_in_many_small_chunks() {
        let text = "x".repeat(64 * 1024);
        let line = format!("\"{text}\"\n");
        let parts: Vec<&str> = line
            .as_bytes()
            .chunks(7)
            .map(|part| std::str::from_utf8(part).unwrap())
            .collect();

        let mut decoder = LineDecoderStream::new(chunks(&parts), EncodingScheme::Json, 1);
        assert_eq!(decoder.next().await.unwrap().unwrap(), Item::Json(json!(text)));
        assert!(decoder.next().await.is_none());
        assert!(decoder.buffer.is_empty());
        assert_eq!(decoder.scanned, 0);
    }

    #[tokio::test]
    async fn test_last_line_without_newline_and_crlf() {
        let body = chunks(&["1\r\n", "2"]);
        let items: Vec<_> = LineDecoderStream::new(body, EncodingScheme::Json, 2)
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(items, vec![Item::Json(json!(1)), Item::Json(json!(2))]);
    }

    #[tokio::test]
    async fn test_decode_error_ends_stream() {
        let body = chunks(&["1\n", "oops\n", "3\n"]);
        let mut decoder = LineDecoderStream::new(body, EncodingScheme::Json, 3);

        assert!(decoder.next().await.unwrap().is_ok());
        let err = decoder.next().await.unwrap().unwrap_err();
        assert!(matches!(err, RemoteError::Decode { line: 1, .. }));
        assert!(decoder.next().await.is_none());
        assert_eq!(decoder.decoded(), 1);
    }

    #[tokio::test]
    async fn test_short_stream_is_row_count_mismatch() {
        let body = chunks(&["1\n"]);
        let results: Vec<_> = LineDecoderStream::new(body, EncodingScheme::Json, 2)
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[1],
            Err(RemoteError::RowCountMismatch { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_extra_line_is_row_count_mismatch() {
        let body = chunks(&["1\n2\n"]);
        let results: Vec<_> = LineDecoderStream::new(body, EncodingScheme::Json, 1)
            .collect()
            .await;
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(RemoteError::RowCountMismatch { expected: 1, actual: 2 })
        ));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_body_for_empty_input() {
        let body = chunks(&[]);
        let results: Vec<_> = LineDecoderStream::new(body, EncodingScheme::Json, 0)
            .collect()
            .await;
        assert!(results.is_empty());
    }
}
