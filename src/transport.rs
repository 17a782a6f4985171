// Line-delimited JSON stand-in for the message bus: events in, responses out.

use crate::errors::TransportError;
use crate::event::{Event, EventResponse};
use std::io::{self, BufRead, BufWriter, Write};

/// Reads one JSON-encoded `Event` per line, skipping blank lines.
///
/// Undecodable lines are reported and skipped. A read failure is reported
/// once and ends the stream.
pub struct NdjsonEventSource<R: BufRead> {
    reader: R,
    line_no: usize,
    buf: String,
    done: bool,
}

impl<R: BufRead> NdjsonEventSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0, buf: String::with_capacity(4 * 1024), done: false }
    }
}

impl<R: BufRead> Iterator for NdjsonEventSource<R> {
    type Item = Result<Event, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                // The line was consumed; only its bytes were rejected.
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    self.line_no += 1;
                    return Some(Err(TransportError::Encoding { line: self.line_no }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            let line_no = self.line_no;
            return Some(
                serde_json::from_str(line)
                    .map_err(|source| TransportError::Malformed { line: line_no, source }),
            );
        }
    }
}

pub trait ResponseSink {
    /// # Errors
    /// Returns an error if the response cannot be serialized or written.
    fn publish(&mut self, response: &EventResponse) -> Result<(), TransportError>;

    /// # Errors
    /// Returns an error if buffered output cannot be flushed.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

pub struct NdjsonResponseSink<W: Write> {
    w: BufWriter<W>,
}

impl<W: Write> NdjsonResponseSink<W> {
    pub fn new(inner: W) -> Self {
        Self { w: BufWriter::new(inner) }
    }
}

impl<W: Write> ResponseSink for NdjsonResponseSink<W> {
    fn publish(&mut self, response: &EventResponse) -> Result<(), TransportError> {
        let s = serde_json::to_string(response)?;
        writeln!(self.w, "{s}")?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.w.flush()
    }
}
