//! Raw command line parsing.
//!
//! The command letter is always the final non-newline byte of the command
//! line (spec §6); this is what lets a one-pass parser avoid tokenizing.

use lineed_io::LineReader;
use lineed_text::Snapshot;
use std::io::BufRead;
use tracing::debug;

use crate::{CommandKind, EngineError, ParsedCommand};

pub struct Parser;

impl Parser {
    /// Reads and parses the next command, including any Change payload.
    /// Returns `Ok(None)` at a clean end of input (no partial command was
    /// in progress).
    pub fn parse_next<R: BufRead>(
        reader: &mut LineReader<R>,
    ) -> Result<Option<ParsedCommand>, EngineError> {
        let raw = match reader.read_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let bytes = raw.as_bytes();
        let type_byte = *bytes.last().ok_or_else(malformed)?;

        let command = match type_byte {
            b'q' if bytes.len() == 1 => ParsedCommand {
                kind: CommandKind::Quit,
                start: 0,
                end: 0,
                payload: Snapshot::empty(),
            },
            b'u' => ParsedCommand {
                kind: CommandKind::Undo,
                start: parse_int(&bytes[..bytes.len() - 1]),
                end: 0,
                payload: Snapshot::empty(),
            },
            b'r' => ParsedCommand {
                kind: CommandKind::Redo,
                start: parse_int(&bytes[..bytes.len() - 1]),
                end: 0,
                payload: Snapshot::empty(),
            },
            b'p' | b'c' | b'd' => {
                let (start, end) = parse_start_end(&bytes[..bytes.len() - 1])?;
                let kind = match type_byte {
                    b'p' => CommandKind::Print,
                    b'c' => CommandKind::Change,
                    b'd' => CommandKind::Delete,
                    _ => unreachable!(),
                };
                let payload = if kind == CommandKind::Change {
                    Self::read_payload(reader, start, end)?
                } else {
                    Snapshot::empty()
                };
                ParsedCommand {
                    kind,
                    start,
                    end,
                    payload,
                }
            }
            _ => return Err(malformed()),
        };
        Ok(Some(command))
    }

    /// Reads the `end - start + 1` payload lines (after start coercion)
    /// followed by the terminating `.` line, per spec §4.3.
    fn read_payload<R: BufRead>(
        reader: &mut LineReader<R>,
        start: i64,
        end: i64,
    ) -> Result<Snapshot, EngineError> {
        let start = if start <= 0 { 1 } else { start };
        let count = end - start + 1;
        let mut lines = Vec::new();
        if count > 0 {
            for _ in 0..count {
                let line = reader.read_line()?.ok_or_else(truncated)?;
                lines.push(line);
            }
        }
        reader.read_line()?.ok_or_else(truncated)?;
        Ok(Snapshot::from_lines(lines))
    }
}

fn malformed() -> EngineError {
    debug!(target: "engine", "malformed_command_line");
    EngineError::Malformed
}

fn truncated() -> EngineError {
    debug!(target: "engine", "truncated_input_mid_command");
    EngineError::Truncated
}

fn parse_int(bytes: &[u8]) -> i64 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
}

fn parse_start_end(bytes: &[u8]) -> Result<(i64, i64), EngineError> {
    let comma = bytes
        .iter()
        .position(|&b| b == b',')
        .ok_or_else(malformed)?;
    let start = parse_int(&bytes[..comma]);
    let end = parse_int(&bytes[comma + 1..]);
    Ok((start, end))
}
