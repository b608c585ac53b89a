//! The command record, parser, and dispatch loop.
//!
//! One [`Engine`] owns a [`Document`] and a [`History`]; [`Engine::run`]
//! drains a [`LineReader`] of commands until Quit or end of input,
//! settling pending undo/redo travel lazily per spec §4.4.

mod parser;

pub use parser::Parser;

use lineed_history::{History, MutationRecord};
use lineed_io::{LineReader, LineWriter};
use lineed_text::{Document, Snapshot};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::trace;

/// The one genuinely exceptional condition the engine can hit: input that
/// stops mid-command. Everything else the spec defines (out-of-range
/// addresses, empty payloads, undo/redo depth overrun) is a no-op, never
/// an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input ended before a change command's terminating '.' line")]
    Truncated,
    #[error("command line has no recognizable type byte")]
    Malformed,
    #[error("i/o error reading or writing a command stream")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Print,
    Change,
    Delete,
    Undo,
    Redo,
    Quit,
}

/// One parsed command, as yielded by [`Parser::parse_next`]. `end` is
/// unused for Undo/Redo/Quit; `start` carries `k` for Undo/Redo.
#[derive(Debug)]
pub struct ParsedCommand {
    pub kind: CommandKind,
    pub start: i64,
    pub end: i64,
    pub payload: Snapshot,
}

pub struct Engine {
    document: Document,
    history: History,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            document: Document::new(),
            history: History::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Parses and dispatches commands from `reader`, writing Print output
    /// to `writer`, until a Quit command or end of input.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        reader: &mut LineReader<R>,
        writer: &mut LineWriter<W>,
    ) -> Result<(), EngineError> {
        while let Some(command) = Parser::parse_next(reader)? {
            if self.dispatch(command, writer)? {
                break;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Dispatches one already-parsed command. Returns `true` iff it was
    /// Quit, signaling the caller to stop the read loop.
    pub fn dispatch<W: Write>(
        &mut self,
        command: ParsedCommand,
        writer: &mut LineWriter<W>,
    ) -> Result<bool, EngineError> {
        if self.history.travel_mode()
            && !matches!(
                command.kind,
                CommandKind::Undo | CommandKind::Redo | CommandKind::Quit
            )
        {
            trace!(target: "engine", pending_travel = self.history.pending_travel(), "settling_before_dispatch");
            self.history.settle(&mut self.document);
        }

        match command.kind {
            CommandKind::Print => {
                self.dispatch_print(command.start, command.end, writer)?;
            }
            CommandKind::Change => {
                let start = coerce_start(command.start);
                let payload = command.payload;
                let prev = if payload.is_empty() {
                    Snapshot::empty()
                } else {
                    self.document.overwrite(start, command.end, payload.clone())
                };
                self.history
                    .record_mutation(MutationRecord::new_change(start, command.end, payload, prev));
            }
            CommandKind::Delete => {
                let start = coerce_start(command.start);
                let prev = self.document.delete_range(start, command.end);
                self.history
                    .record_mutation(MutationRecord::new_delete(start, command.end, prev));
            }
            CommandKind::Undo => {
                self.history.request_undo(command.start);
            }
            CommandKind::Redo => {
                self.history.request_redo(command.start);
            }
            CommandKind::Quit => {
                trace!(target: "engine", "quit");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn dispatch_print<W: Write>(
        &self,
        start: i64,
        end: i64,
        writer: &mut LineWriter<W>,
    ) -> Result<(), EngineError> {
        if end < start {
            return Ok(());
        }
        for pos in start..=end {
            if pos <= 0 || pos as usize > self.document.len() {
                writer.write_sentinels(1)?;
            } else {
                let line = self
                    .document
                    .line_at(pos)
                    .expect("pos was just checked to be in [1, len()]");
                writer.write_line(&line)?;
            }
        }
        Ok(())
    }
}

fn coerce_start(start: i64) -> i64 {
    if start <= 0 { 1 } else { start }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn run(input: &str) -> String {
        let mut engine = Engine::new();
        let mut reader = LineReader::new(Cursor::new(input.as_bytes().to_vec()));
        let mut out = Vec::new();
        {
            let mut writer = LineWriter::new(&mut out);
            engine.run(&mut reader, &mut writer).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn s1_append_then_print() {
        let out = run("1,2c\nfirst\nsecond\n.\n1,3p\nq\n");
        assert_eq!(out, "first\nsecond\n.\n");
    }

    #[test]
    fn s2_change_undo_print() {
        let out = run("1,1c\nA\n.\n1,1c\nB\n.\n1u\n1,1p\nq\n");
        assert_eq!(out, "A\n");
    }

    #[test]
    fn s3_change_undo_redo_print() {
        let out = run("1,1c\nA\n.\n1,1c\nB\n.\n1u\n1r\n1,1p\nq\n");
        assert_eq!(out, "B\n");
    }

    #[test]
    fn s4_delete_middle_undo_restores() {
        let out = run("1,3c\na\nb\nc\n.\n2,2d\n1,3p\n2u\n1,3p\nq\n");
        assert_eq!(out, "a\nc\n.\na\nb\nc\n");
    }

    #[test]
    fn s5_branch_discards_future() {
        let out = run("1,1c\nA\n.\n1,1c\nB\n.\n1u\n1,1c\nC\n.\n1r\n1,1p\nq\n");
        assert_eq!(out, "C\n");
    }

    #[test]
    fn s6_coalesced_travel_touches_document_once() {
        let out = run("1,1c\nA\n.\n1,1c\nB\n.\n1,1c\nC\n.\n2u\n1r\n1,1p\nq\n");
        assert_eq!(out, "B\n");
    }

    #[test]
    fn print_purity_removing_prints_does_not_change_state() {
        let mut with_prints = Engine::new();
        let mut reader = LineReader::new(Cursor::new(
            b"1,2c\na\nb\n.\n1,2p\n2,2d\n1,1p\nq\n".to_vec(),
        ));
        let mut sink = Vec::new();
        {
            let mut writer = LineWriter::new(&mut sink);
            with_prints.run(&mut reader, &mut writer).unwrap();
        }

        let mut without_prints = Engine::new();
        let mut reader = LineReader::new(Cursor::new(b"1,2c\na\nb\n.\n2,2d\nq\n".to_vec()));
        let mut sink = Vec::new();
        {
            let mut writer = LineWriter::new(&mut sink);
            without_prints.run(&mut reader, &mut writer).unwrap();
        }

        assert_eq!(with_prints.document().len(), without_prints.document().len());
    }

    #[test]
    fn address_clamp_emits_dot_per_out_of_range_line() {
        let out = run("5,7p\nq\n");
        assert_eq!(out, ".\n.\n.\n");
    }

    #[test]
    fn undo_beyond_depth_clamps_to_available() {
        let out = run("1,1c\na\n.\n50u\n1,1p\nq\n");
        assert_eq!(out, ".\n");
    }

    #[test]
    fn redo_outside_travel_mode_is_a_no_op() {
        let out = run("1,1c\na\n.\n1r\n1,1p\nq\n");
        assert_eq!(out, "a\n");
    }

    #[test]
    fn empty_payload_change_is_a_no_op_but_still_recorded() {
        let mut engine = Engine::new();
        let mut reader = LineReader::new(Cursor::new(b"1,1c\nx\n.\n5,3c\n.\nq\n".to_vec()));
        let mut sink = Vec::new();
        {
            let mut writer = LineWriter::new(&mut sink);
            engine.run(&mut reader, &mut writer).unwrap();
        }
        assert_eq!(engine.document().len(), 1);
        assert_eq!(engine.history().past_count(), 2);
    }
}
