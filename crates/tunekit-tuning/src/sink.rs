//! Abstract sink for firmware text commands
//!
//! The harness never talks to hardware directly: everything it emits goes
//! through a `CommandSink`, one firmware instruction per call. The live
//! serial transport is an external collaborator that implements this
//! trait; the sinks here cover dry runs, file capture, and tests.

use crate::error::TuningResult;
use std::io::Write;

/// Accepts firmware text commands, one instruction per call.
pub trait CommandSink {
    /// Send one instruction (without line terminator).
    fn send(&mut self, command: &str) -> TuningResult<()>;
}

/// In-memory sink that records every command, for dry runs and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    commands: Vec<String>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command sent so far, in order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// The most recently sent command
    pub fn last(&self) -> Option<&str> {
        self.commands.last().map(String::as_str)
    }
}

impl CommandSink for RecordingSink {
    fn send(&mut self, command: &str) -> TuningResult<()> {
        self.commands.push(command.to_string());
        Ok(())
    }
}

/// Sink that writes CRLF-terminated commands to any writer.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap, returning the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for WriterSink<W> {
    fn send(&mut self, command: &str) -> TuningResult<()> {
        // Firmware expects CRLF-terminated lines
        write!(self.writer, "{}\r\n", command)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.send("M104 S200").unwrap();
        sink.send("M105").unwrap();
        assert_eq!(sink.commands(), ["M104 S200", "M105"]);
        assert_eq!(sink.last(), Some("M105"));
    }

    #[test]
    fn test_writer_sink_terminates_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.send("M105").unwrap();
        sink.send("M104 S0").unwrap();
        let written = sink.into_inner();
        assert_eq!(written, b"M105\r\nM104 S0\r\n");
    }
}
