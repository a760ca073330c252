//! Incremental extraction of elapsed-time markers from ffmpeg stderr.
//!
//! ffmpeg reports progress with status lines such as
//!
//! ```text
//! frame=  750 fps= 98 q=28.0 size=    2048kB time=00:00:30.00 bitrate= 559.2kbits/s speed=3.9x
//! ```
//!
//! Pipes deliver that text in arbitrary pieces, so a `time=` token can be cut
//! anywhere. The parser keeps the unfinished tail of each chunk and retries
//! it once the next chunk arrives.

use regex::bytes::Regex;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::LazyLock;

static TIME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=([0-9:.]+)").expect("time marker pattern is valid"));

const MARKER_PREFIX: &[u8] = b"time=";

/// Upper bound on text carried between chunks.
const MAX_CARRY: usize = 64;

const READ_CHUNK: usize = 4096;

/// Converts `HH:MM:SS.fraction` to seconds.
///
/// Returns `None` for anything that does not have exactly three finite,
/// non-negative components.
#[must_use]
pub fn time_to_seconds(time: &str) -> Option<f64> {
    let mut parts = time.split(':');
    let (h, m, s) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let hours = h.parse::<f64>().ok()?;
    let minutes = m.parse::<f64>().ok()?;
    let seconds = s.parse::<f64>().ok()?;
    let total = hours * 3600.0 + minutes * 60.0 + seconds;

    (total.is_finite() && hours >= 0.0 && minutes >= 0.0 && seconds >= 0.0).then_some(total)
}

/// Chunk-boundary-safe marker parser.
#[derive(Debug, Default)]
pub struct ProgressParser {
    carry: Vec<u8>,
}

impl ProgressParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the elapsed seconds of every marker that
    /// is now complete, in stream order.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<f64> {
        self.carry.extend_from_slice(chunk.as_ref());

        let mut values = Vec::new();
        let mut consumed = 0;
        let mut pending = None;

        for caps in TIME_MARKER.captures_iter(&self.carry) {
            let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // A match running into the end of the buffer may still grow.
            if whole.end() == self.carry.len() {
                pending = Some(whole.start());
                break;
            }
            if let Some(secs) = marker_seconds(value.as_bytes()) {
                values.push(secs);
            }
            consumed = whole.end();
        }

        let keep_from = pending.unwrap_or_else(|| partial_prefix_start(&self.carry, consumed));
        self.carry.drain(..keep_from);

        if self.carry.len() > MAX_CARRY {
            log::trace!("Dropping {} bytes of unterminated progress text", self.carry.len());
            self.carry.clear();
        }

        values
    }

    /// Flushes a marker left at the very end of the stream.
    pub fn finish(&mut self) -> Option<f64> {
        let carry = std::mem::take(&mut self.carry);
        TIME_MARKER
            .captures(&carry)
            .and_then(|caps| caps.get(1))
            .and_then(|value| marker_seconds(value.as_bytes()))
    }
}

fn marker_seconds(value: &[u8]) -> Option<f64> {
    std::str::from_utf8(value).ok().and_then(time_to_seconds)
}

/// Start of a trailing partial `time=` prefix at or after `floor`, or the
/// buffer length when there is none.
fn partial_prefix_start(buf: &[u8], floor: usize) -> usize {
    (1..=MARKER_PREFIX.len())
        .rev()
        .find(|&len| {
            buf.len() >= len && buf.len() - len >= floor && buf.ends_with(&MARKER_PREFIX[..len])
        })
        .map_or(buf.len(), |len| buf.len() - len)
}

/// Last few diagnostic lines of a process, for failure reports.
#[derive(Debug)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    partial: Vec<u8>,
    capacity: usize,
}

impl DiagnosticTail {
    const MAX_PARTIAL: usize = 4096;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            partial: Vec::new(),
            capacity,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                self.push_partial();
            } else if self.partial.len() < Self::MAX_PARTIAL {
                self.partial.push(byte);
            }
        }
    }

    fn push_partial(&mut self) {
        let line = String::from_utf8_lossy(&self.partial).trim().to_string();
        self.partial.clear();
        if line.is_empty() || self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Retained lines joined with newlines, including an unterminated last line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out: Vec<String> = self.lines.iter().cloned().collect();
        let partial = String::from_utf8_lossy(&self.partial).trim().to_string();
        if !partial.is_empty() {
            out.push(partial);
        }
        out.join("\n")
    }
}

/// Lazily yields elapsed seconds read from a diagnostic stream.
///
/// Read errors end the sequence; they are logged, never returned.
pub struct ProgressStream<R> {
    reader: R,
    parser: ProgressParser,
    ready: VecDeque<f64>,
    tail: DiagnosticTail,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> ProgressStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_tail_capacity(reader, 20)
    }

    pub fn with_tail_capacity(reader: R, lines: usize) -> Self {
        Self {
            reader,
            parser: ProgressParser::new(),
            ready: VecDeque::new(),
            tail: DiagnosticTail::new(lines),
            buf: vec![0; READ_CHUNK],
            done: false,
        }
    }

    #[must_use]
    pub fn tail(&self) -> &DiagnosticTail {
        &self.tail
    }

    fn finish(&mut self) {
        self.done = true;
        if let Some(secs) = self.parser.finish() {
            self.ready.push_back(secs);
        }
    }
}

impl<R: Read> Iterator for ProgressStream<R> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        loop {
            if let Some(secs) = self.ready.pop_front() {
                return Some(secs);
            }
            if self.done {
                return None;
            }
            match self.reader.read(&mut self.buf) {
                Ok(0) => self.finish(),
                Ok(n) => {
                    let chunk = &self.buf[..n];
                    self.tail.feed(chunk);
                    self.ready.extend(self.parser.feed(chunk));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    log::warn!("Stopped reading diagnostic stream: {e}");
                    self.finish();
                }
            }
        }
    }
}
