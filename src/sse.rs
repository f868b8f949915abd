//! Server-Sent Events (SSE) processing for agent run streams.
//!
//! This module converts the raw byte stream of a run response into a stream of
//! [`AgentEvent`]s.  Lines may end in LF, CRLF or a lone CR.  Frames are
//! delimited by a blank line; each frame's `data:`
//! lines are joined with `\n` and decoded as one JSON event.  Comments and
//! frames without data are skipped.  Bytes are buffered until a frame is
//! complete, so multi-byte characters split across network chunks decode
//! correctly.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::{AgentEvent, Error, Result};

/// Process a stream of bytes into a stream of agent events.
///
/// Transport errors from the byte stream are surfaced as [`Error::Streaming`];
/// frames that are not valid UTF-8 as [`Error::Encoding`]; frames whose JSON
/// does not decode as [`Error::Serialization`].  Decoding errors do not end
/// the stream: later frames are still delivered.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<AgentEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = LineBuffer::default();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                while let Some(frame) = take_frame(&mut buffer.bytes) {
                    if let Some(event) = decode_frame(&frame) {
                        return Some((event, (stream, buffer)));
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend(&bytes);
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // A final frame may lack its trailing blank line.
                        if buffer.bytes.iter().any(|b| !b.is_ascii_whitespace()) {
                            let frame = std::mem::take(&mut buffer.bytes);
                            if let Some(event) = decode_frame(&frame) {
                                return Some((event, (stream, buffer)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Buffered stream bytes with CRLF and lone CR line endings folded to LF.
#[derive(Default)]
struct LineBuffer {
    bytes: Vec<u8>,
    after_cr: bool,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        for &b in chunk {
            match b {
                b'\r' => {
                    self.bytes.push(b'\n');
                    self.after_cr = true;
                }
                // The LF of a CRLF, possibly in the next chunk.
                b'\n' if self.after_cr => self.after_cr = false,
                _ => {
                    self.bytes.push(b);
                    self.after_cr = false;
                }
            }
        }
    }
}

/// Removes the first complete frame from `buffer`, without its delimiter.
fn take_frame(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut frame: Vec<u8> = buffer.drain(..pos + 2).collect();
    frame.truncate(pos);
    Some(frame)
}

/// Decodes one frame.  Returns `None` for frames that carry no data.
fn decode_frame(frame: &[u8]) -> Option<Result<AgentEvent>> {
    let text = match std::str::from_utf8(frame) {
        Ok(text) => text,
        Err(e) => {
            STREAM_ERRORS.click();
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        let Some(value) = line.strip_prefix("data:") else {
            // event:, id: and retry: carry nothing this client uses.
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    let data = data?;
    if data.trim().is_empty() || data.trim() == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<AgentEvent>(&data) {
        Ok(event) => {
            STREAM_EVENTS.click();
            Some(Ok(event))
        }
        Err(e) => {
            STREAM_ERRORS.click();
            Some(Err(Error::serialization(
                format!("Malformed agent event '{data}': {e}"),
                Some(Box::new(e)),
            )))
        }
    }
}
