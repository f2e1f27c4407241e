// src/run/format.rs

//! Turning raw output bytes into display text.

use std::fmt;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n").expect("line-break pattern is valid"));

/// Hook applied to every chunk before it is logged and delivered.
pub trait ChunkFormatter: Send + Sync + fmt::Debug {
    fn format(&self, chunk: &str) -> String;
}

/// Replace every line break (`\n` or `\r\n`) with a fixed token such as `<br>`.
#[derive(Debug, Clone)]
pub struct LineBreaks {
    token: String,
}

impl LineBreaks {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Default for LineBreaks {
    fn default() -> Self {
        Self::new("<br>")
    }
}

impl ChunkFormatter for LineBreaks {
    fn format(&self, chunk: &str) -> String {
        LINE_BREAK
            .replace_all(chunk, NoExpand(&self.token))
            .into_owned()
    }
}

/// Pass chunks through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl ChunkFormatter for Verbatim {
    fn format(&self, chunk: &str) -> String {
        chunk.to_string()
    }
}

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two reads is held back until the
/// rest arrives, as is a trailing carriage return. Invalid sequences become
/// U+FFFD.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }

        // Keep a trailing `\r` back too, so a `\r\n` split across reads is
        // still seen as one line break.
        if self.pending.is_empty() && out.ends_with('\r') {
            out.pop();
            self.pending.push(b'\r');
        }
        out
    }

    /// Flush whatever is still held back.
    pub(crate) fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}
