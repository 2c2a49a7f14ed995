// src/server.rs
//! Framed request/response server.
//!
//! Exposes the tool layer over a byte stream (stdin/stdout in production).
//! Framing is auto-detected from the first non-whitespace byte received:
//! `{` starts newline-delimited JSON, `C` starts Content-Length framing.
//! Responses always mirror the framing the first request used.

use crate::tools::StructureTools;
use serde_json::{json, Value};
use std::io::{self, Read, Write};

/// Read-side framing state. Only `read_message` advances it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    Undetected,
    /// One JSON object per line; the last message may omit the newline.
    Newline,
    /// `Content-Length: N\r\n\r\n` followed by exactly N body bytes.
    Framed,
}

/// Buffered reader that detects and then applies one of the two framings.
pub struct MessageReader<R: Read> {
    stream: R,
    buf: Vec<u8>,
    mode: FramingMode,
}

impl<R: Read> MessageReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            mode: FramingMode::Undetected,
        }
    }

    #[must_use]
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Next complete message body, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Propagates read failures; framed mode also rejects a missing
    /// Content-Length header as invalid data.
    pub fn read_message(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.mode == FramingMode::Undetected && !self.detect_mode()? {
            return Ok(None);
        }
        match self.mode {
            FramingMode::Newline => self.read_newline(),
            FramingMode::Framed => self.read_framed(),
            FramingMode::Undetected => Ok(None),
        }
    }

    /// Reads until at least `min` buffered bytes; false on EOF first.
    fn fill(&mut self, min: usize) -> io::Result<bool> {
        let mut chunk = [0u8; 65536];
        while self.buf.len() < min {
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Ok(false);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(true)
    }

    fn detect_mode(&mut self) -> io::Result<bool> {
        loop {
            // Skip leading whitespace; keep reading until a real byte shows.
            let start = self
                .buf
                .iter()
                .position(|b| !b.is_ascii_whitespace());
            match start {
                Some(idx) => {
                    self.buf.drain(..idx);
                    self.mode = if self.buf[0] == b'C' {
                        FramingMode::Framed
                    } else {
                        FramingMode::Newline
                    };
                    return Ok(true);
                }
                None => {
                    self.buf.clear();
                    if !self.fill(1)? {
                        return Ok(false);
                    }
                }
            }
        }
    }

    fn read_newline(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                return Ok(Some(trim_bytes(&line)));
            }
            if !self.fill(self.buf.len() + 1)? {
                // EOF: a final message may lack its trailing newline.
                let remaining = trim_bytes(&self.buf);
                self.buf.clear();
                if remaining.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(remaining));
            }
        }
    }

    fn read_framed(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = find_subsequence(&self.buf, b"\r\n\r\n") {
                let header_bytes: Vec<u8> = self.buf.drain(..pos + 4).collect();
                let headers = String::from_utf8_lossy(&header_bytes[..pos]).to_string();

                let content_length = headers
                    .split("\r\n")
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            "missing Content-Length header in framed message",
                        )
                    })?;

                if !self.fill(content_length)? {
                    return Ok(None);
                }
                let body: Vec<u8> = self.buf.drain(..content_length).collect();
                return Ok(Some(body));
            }
            if !self.fill(self.buf.len() + 1)? {
                return Ok(None);
            }
        }
    }
}

fn trim_bytes(bytes: &[u8]) -> Vec<u8> {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    bytes[start..end].to_vec()
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Writes one message in the given framing.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_message<W: Write>(
    out: &mut W,
    mode: FramingMode,
    payload: &[u8],
) -> io::Result<()> {
    match mode {
        FramingMode::Framed => {
            write!(out, "Content-Length: {}\r\n\r\n", payload.len())?;
            out.write_all(payload)?;
        }
        _ => {
            out.write_all(payload)?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()
}

/// Runs the request/response loop until the input stream closes.
///
/// # Errors
///
/// Propagates stream failures; per-request problems become error responses.
pub fn serve<R: Read, W: Write>(
    tools: &mut StructureTools,
    input: R,
    mut output: W,
) -> io::Result<()> {
    let mut reader = MessageReader::new(input);

    while let Some(raw) = reader.read_message()? {
        if raw.is_empty() {
            continue;
        }
        let response = match serde_json::from_slice::<Value>(&raw) {
            Ok(request) => handle_request(tools, &request),
            Err(e) => json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": { "code": -32700, "message": format!("parse error: {e}") },
            }),
        };
        let payload = serde_json::to_vec(&response)?;
        write_message(&mut output, reader.mode(), &payload)?;
    }
    Ok(())
}

fn handle_request(tools: &mut StructureTools, request: &Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32600, "message": "missing method" },
        });
    };
    let empty = json!({});
    let params = request.get("params").unwrap_or(&empty);

    let result = tools.call_tool(method, params);
    if result.is_error {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": result.text },
        })
    } else {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "text": result.text },
        })
    }
}
