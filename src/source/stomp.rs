//! Minimal STOMP 1.2 framing over WebSocket text messages.
//!
//! Only the client side of the handful of commands the visualizer needs:
//! CONNECT, SUBSCRIBE and DISCONNECT out; CONNECTED, MESSAGE, RECEIPT and
//! ERROR in.

use crate::error::ChannelError;

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Add a header (builder style).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Look up the first header with this name.
    ///
    /// STOMP 1.2 says the first occurrence of a repeated header wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// The CONNECT frame sent right after the WebSocket opens.
    pub fn connect(host: &str) -> Self {
        Frame::new("CONNECT")
            .header("accept-version", "1.2,1.1")
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    /// A SUBSCRIBE frame for `destination` with subscription `id`.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// The DISCONNECT frame sent on shutdown.
    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT")
    }

    /// Serialize to wire text, including the trailing NUL.
    pub fn encode(&self) -> String {
        let escape = self.command != "CONNECT" && self.command != "CONNECTED";
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Parse every frame contained in one WebSocket text message.
///
/// Heart-beats (bare EOLs) yield no frames.
pub fn parse_frames(text: &str) -> Result<Vec<Frame>, ChannelError> {
    text.split('\0')
        .filter(|chunk| !chunk.trim_start_matches(['\r', '\n']).is_empty())
        .map(parse_frame)
        .collect()
}

fn parse_frame(raw: &str) -> Result<Frame, ChannelError> {
    let raw = raw.trim_start_matches(['\r', '\n']);

    // Headers end at the first blank line, whichever EOL style the sender used
    let blank = [("\n\n", 2), ("\n\r\n", 3)]
        .iter()
        .filter_map(|&(eol, len)| raw.find(eol).map(|idx| (idx, len)))
        .min();
    let (head, body) = match blank {
        Some((idx, len)) => (&raw[..idx], &raw[idx + len..]),
        None => (raw, ""),
    };

    let mut lines = head.lines();
    let command = lines
        .next()
        .map(|c| c.trim_end_matches('\r').to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ChannelError::Frame("missing command".to_string()))?;

    let unescape = command != "CONNECTED";
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ChannelError::Frame(format!("bad header line: {}", line)))?;
        if unescape {
            headers.push((unescape_header(name), unescape_header(value)));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    Ok(Frame {
        command,
        headers,
        body: body.to_string(),
    })
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
