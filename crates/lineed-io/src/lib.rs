//! Byte-level line reader and writer.
//!
//! The engine is agnostic to where bytes come from; these two thin
//! wrappers turn a `BufRead`/`Write` pair into the "one logical line at a
//! time" contract the parser and Print dispatch expect.

use std::io::{self, BufRead, Write};
use lineed_text::{Document, Line};
use tracing::trace;

/// Reads one newline-terminated line at a time from an underlying
/// `BufRead`, stripping the terminator.
pub struct LineReader<R> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        LineReader { inner }
    }

    /// Reads the next line, or `None` at end of stream. The trailing `\n`
    /// (and a preceding `\r`, for CRLF input) is stripped; embedded bytes
    /// are passed through unmodified.
    pub fn read_line(&mut self) -> io::Result<Option<Line>> {
        let mut buf = Vec::new();
        let read = self.inner.read_until(b'\n', &mut buf)?;
        if read == 0 {
            trace!(target: "io", "read_eof");
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        trace!(target: "io", bytes = buf.len(), "line_read");
        Ok(Some(Line::new(buf)))
    }
}

/// Writes lines to an underlying `Write`, one per call, each followed by
/// `\n`. Used only by Print; every other command is silent.
pub struct LineWriter<W> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        LineWriter { inner }
    }

    pub fn write_line(&mut self, line: &Line) -> io::Result<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")
    }

    /// Writes `count` sentinel `.` lines, for addresses past the document.
    pub fn write_sentinels(&mut self, count: usize) -> io::Result<()> {
        Document::append_sentinel(count, &mut self.inner)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
