// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! SSE frame handling.
//!
//! Two layers live here: [`SseDecoder`] turns a raw byte stream into the
//! `data` payloads of individual text/event-stream frames, and
//! [`parse_sse_data`] turns one payload into a validated
//! [`SessionEvent`], or `None`: a malformed frame is dropped rather than
//! treated as a connection error.

use crate::events::{is_valid_session_event, SessionEvent};
use serde_json::Value;

/// Parse one frame's data payload into a validated session event.
///
/// Returns `None` when the payload is not JSON or does not satisfy
/// [`is_valid_session_event`]. Never panics for any input, including empty
/// strings and non-JSON text.
pub fn parse_sse_data(raw: &str) -> Option<SessionEvent> {
    let value: Value = serde_json::from_str(raw).ok()?;
    if !is_valid_session_event(&value) {
        return None;
    }
    serde_json::from_value(value).ok()
}

// =============================================================================
// Incremental text/event-stream decoder
// =============================================================================

/// Incremental decoder for the text/event-stream wire format.
///
/// Feed raw body chunks with [`push`](Self::push) and drain complete frames
/// with [`next_event`](Self::next_event). Frames are delimited by a blank
/// line, where a line terminator is CRLF, LF, or CR; multiple `data:` lines
/// within one frame are joined with newlines; `event:`/`id:`/`retry:` fields
/// and `:` comment lines are ignored. Framing conventions beyond the data
/// payload are the server's concern, not interpreted here.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw bytes to the internal buffer.
    ///
    /// Chunks may split anywhere, including inside a multi-byte UTF-8
    /// sequence; text decoding only happens on complete frames.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the data payload of the next complete frame, if one is buffered.
    ///
    /// Frames without any `data:` line (comments, bare `event:` headers) are
    /// skipped.
    pub fn next_event(&mut self) -> Option<String> {
        loop {
            let (end, skip) = self.frame_boundary()?;
            let frame = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
            self.buffer.drain(..end + skip);

            let mut data = String::new();
            for line in frame.split(['\r', '\n']) {
                if let Some(rest) = line.strip_prefix("data:") {
                    if !data.is_empty() {
                        data.push('\n');
                    }
                    data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
                }
            }

            if !data.is_empty() {
                return Some(data);
            }
        }
    }

    /// Find the earliest blank-line frame delimiter: two consecutive line
    /// terminators. Returns the frame end offset and the delimiter length.
    ///
    /// A candidate delimiter whose final byte is a CR at the end of the
    /// buffer is held back; the next chunk may complete it to CRLF.
    fn frame_boundary(&self) -> Option<(usize, usize)> {
        let buf = &self.buffer;
        let mut i = 0;
        while i < buf.len() {
            let Some(first) = terminator_len(buf, i) else {
                i += 1;
                continue;
            };
            let Some(second) = terminator_len(buf, i + first) else {
                i += first;
                continue;
            };
            let end = i + first + second;
            if end == buf.len() && buf[end - 1] == b'\r' {
                return None;
            }
            return Some((i, first + second));
        }
        None
    }
}

/// Length of the line terminator starting at `i`, if any: CRLF, lone CR, or
/// LF.
fn terminator_len(buf: &[u8], i: usize) -> Option<usize> {
    match buf.get(i) {
        Some(b'\r') if buf.get(i + 1) == Some(&b'\n') => Some(2),
        Some(b'\r') | Some(b'\n') => Some(1),
        _ => None,
    }
}
