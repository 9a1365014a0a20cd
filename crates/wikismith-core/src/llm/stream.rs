//! Line-oriented stream framing (SSE and NDJSON)

use super::types::StreamChunk;

/// How a backend frames its streaming events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFraming {
    /// Server-Sent Events, payload on `data:` lines
    Sse,
    /// One JSON document per line
    Ndjson,
}

impl StreamFraming {
    /// Extract the event payload from one line, if it carries one
    pub fn payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        let payload = match self {
            StreamFraming::Sse => line.strip_prefix("data:")?.trim(),
            StreamFraming::Ndjson => line.trim(),
        };
        (!payload.is_empty()).then_some(payload)
    }
}

/// Decoded meaning of one stream payload
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    Chunk(StreamChunk),
    /// Backend sentinel, stop reading
    Done,
    /// Valid but carries nothing for the caller
    Skip,
}

/// Splits a byte stream into lines across arbitrary chunk boundaries
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every completed line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// Flush a trailing line with no newline
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(decode_line(&line))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_payload() {
        let sse = StreamFraming::Sse;
        assert_eq!(sse.payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(sse.payload("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse.payload("event: ping"), None);
        assert_eq!(sse.payload(": keep-alive"), None);
        assert_eq!(sse.payload("data: "), None);
        assert_eq!(sse.payload(""), None);
    }

    #[test]
    fn test_ndjson_payload() {
        let ndjson = StreamFraming::Ndjson;
        assert_eq!(ndjson.payload("{\"done\":true}"), Some("{\"done\":true}"));
        assert_eq!(ndjson.payload("   "), None);
    }

    #[test]
    fn test_line_decoder_split_boundaries() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: he").is_empty());
        assert_eq!(decoder.push(b"llo\r\ndata: wor"), vec!["data: hello"]);
        assert_eq!(decoder.push(b"ld\n\n"), vec!["data: world", ""]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_line_decoder_utf8_across_chunks() {
        let bytes = "héllo\n".as_bytes();
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&bytes[..2]).is_empty());
        assert_eq!(decoder.push(&bytes[2..]), vec!["héllo"]);
    }

    #[test]
    fn test_line_decoder_trailing_line() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"done\":true}").is_empty());
        assert_eq!(decoder.finish(), Some("{\"done\":true}".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
