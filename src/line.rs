use std::fmt;

/// Where a line came from. Everything ends up in the same transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Received from the controller
    Device,
    /// Synthetic, describes a failure
    Error,
    /// Produced locally (echoes, status notices)
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    pub text: String,
}

impl Line {
    /// Decode one received line. Invalid UTF-8 becomes U+FFFD, a single
    /// trailing `\r` (CRLF from the controller) is dropped.
    pub fn device(raw: &[u8]) -> Self {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        Self {
            kind: LineKind::Device,
            text: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    pub fn error(desc: impl fmt::Display) -> Self {
        Self {
            kind: LineKind::Error,
            text: format!("[ERROR] {desc}"),
        }
    }

    pub fn local(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Local,
            text: text.into(),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Accumulates raw bytes and splits complete lines off the front.
///
/// Bytes after the last `\n` stay buffered until a later chunk completes
/// them, so chunk boundaries never affect the emitted lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    /// Append a chunk and return every line it completed, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Line> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        lines
    }

    fn next_line(&mut self) -> Option<Line> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let rest = self.buf.split_off(pos + 1);
        let mut head = std::mem::replace(&mut self.buf, rest);
        head.truncate(pos);
        Some(Line::device(&head))
    }

    /// Bytes still waiting for their newline.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}
