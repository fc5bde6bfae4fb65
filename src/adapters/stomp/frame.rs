//! STOMP 1.2 frame codec.
//!
//! Wire format:
//! ```text
//! COMMAND\n
//! header1:value1\n
//! header2:value2\n
//! \n
//! body bytes … \0
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete frames.  A
//! single socket read may hold part of a frame, exactly one, or several.
//! Bare EOLs between frames are heart-beats and are skipped.  When a
//! `content-length` header is present the body is read by length (it may
//! contain NULs); otherwise it runs to the first NUL.

use core::fmt;

/// Maximum frame size, head and body together.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_owned(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First occurrence wins, as STOMP 1.2 requires for repeated headers.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> Vec<u8> {
        let escape = escapes_headers(&self.command);
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(self.command.as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            if escape {
                escape_into(name, &mut out);
                out.push(b':');
                escape_into(value, &mut out);
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    TooLarge,
    InvalidUtf8,
    MalformedHeader,
    BadContentLength,
    BadEscape,
    /// A length-delimited body was not followed by NUL.
    MissingTerminator,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FrameError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "frame exceeds maximum size",
            Self::InvalidUtf8 => "frame head is not UTF-8",
            Self::MalformedHeader => "header line without ':'",
            Self::BadContentLength => "content-length is not a number",
            Self::BadEscape => "invalid header escape sequence",
            Self::MissingTerminator => "body not terminated by NUL",
        }
    }
}

/// Streaming frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete frame, if the buffer holds one.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let skip = self
            .buf
            .iter()
            .take_while(|&&b| b == b'\n' || b == b'\r')
            .count();
        self.buf.drain(..skip);
        if self.buf.is_empty() {
            return Ok(None);
        }

        let Some(head_end) = self.find_head_end() else {
            return self.incomplete();
        };
        let head =
            core::str::from_utf8(&self.buf[..head_end]).map_err(|_| FrameError::InvalidUtf8)?;
        let mut lines = head.lines().map(|l| l.trim_end_matches('\r'));
        let command = lines.next().unwrap_or_default().to_owned();
        let escaped = escapes_headers(&command);

        let mut headers = Vec::new();
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = line.split_once(':').ok_or(FrameError::MalformedHeader)?;
            if escaped {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| v.trim().parse::<usize>().map_err(|_| FrameError::BadContentLength))
            .transpose()?;

        let body_end = match content_length {
            Some(len) => {
                let end = head_end
                    .checked_add(len)
                    .filter(|&end| end < MAX_FRAME_SIZE)
                    .ok_or(FrameError::TooLarge)?;
                if self.buf.len() < end + 1 {
                    return Ok(None);
                }
                if self.buf[end] != 0 {
                    return Err(FrameError::MissingTerminator);
                }
                end
            }
            None => match self.buf[head_end..].iter().position(|&b| b == 0) {
                Some(offset) => head_end + offset,
                None => return self.incomplete(),
            },
        };

        let body = self.buf[head_end..body_end].to_vec();
        self.buf.drain(..=body_end);
        Ok(Some(Frame {
            command,
            headers,
            body,
        }))
    }

    /// Byte offset just past the blank line that ends the frame head.
    fn find_head_end(&self) -> Option<usize> {
        let mut line_start = 0;
        for (i, &b) in self.buf.iter().enumerate() {
            if b != b'\n' {
                continue;
            }
            let line = &self.buf[line_start..i];
            if line_start > 0 && (line.is_empty() || line == b"\r") {
                return Some(i + 1);
            }
            line_start = i + 1;
        }
        None
    }

    fn incomplete(&self) -> Result<Option<Frame>, FrameError> {
        if self.buf.len() > MAX_FRAME_SIZE {
            Err(FrameError::TooLarge)
        } else {
            Ok(None)
        }
    }
}

/// CONNECT and CONNECTED frames carry raw header values.
fn escapes_headers(command: &str) -> bool {
    !matches!(command, "CONNECT" | "CONNECTED")
}

fn escape_into(s: &str, out: &mut Vec<u8>) {
    for b in s.bytes() {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b':' => out.extend_from_slice(b"\\c"),
            _ => out.push(b),
        }
    }
}

fn unescape(s: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::BadEscape),
        }
    }
    Ok(out)
}
