//! Character I/O boundary used by the trap handlers.
//!
//! The CPU never touches stdin/stdout directly; it talks to a [`Console`].
//! [`StdConsole`] is the process's standard streams, [`BufferConsole`] keeps
//! everything in memory.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// A blocking byte-oriented terminal.
pub trait Console {
    /// Read one byte. `Ok(None)` means end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write one byte.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Push buffered output to its destination.
    fn flush(&mut self) -> io::Result<()>;

    /// Write a run of bytes.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

/// The process's standard input and output.
pub struct StdConsole {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.stdin.lock().read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.stdout.lock().write_all(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stdout.lock().write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.lock().flush()
    }
}

/// An in-memory console: input is a fixed script, output is captured.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    /// Everything written so far.
    pub output: Vec<u8>,
    /// Number of times `flush` has been called.
    pub flushes: usize,
}

impl BufferConsole {
    /// Create a console that will yield `input` byte by byte, then EOF.
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
            flushes: 0,
        }
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Bytes of input not consumed yet.
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for BufferConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_console_reads_then_eof() {
        let mut console = BufferConsole::new(b"ab");
        assert_eq!(console.read_byte().unwrap(), Some(b'a'));
        assert_eq!(console.remaining_input(), 1);
        assert_eq!(console.read_byte().unwrap(), Some(b'b'));
        assert_eq!(console.read_byte().unwrap(), None);
    }

    #[test]
    fn test_buffer_console_captures_output() {
        let mut console = BufferConsole::new(b"");
        console.write_bytes(b"hi").unwrap();
        console.write_byte(b'!').unwrap();
        console.flush().unwrap();

        assert_eq!(console.output_str(), "hi!");
        assert_eq!(console.flushes, 1);
    }
}
