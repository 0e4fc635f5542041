//! stdio transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The transport is generic over its reader and writer so the server loop
//! can be driven from in-memory buffers in tests.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Failure to read the next message line.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The line was read in full but is not UTF-8. The stream is still usable.
    #[error("message line is not valid UTF-8")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// The underlying stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A line-delimited JSON-RPC transport, by default over stdin/stdout.
pub struct StdioTransport<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    /// Buffered message source.
    reader: R,
    /// Message sink.
    writer: W,
}

impl StdioTransport {
    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary reader and writer.
    #[must_use]
    pub const fn with_io(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the transport, returning the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the input is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Io`] if reading fails. A line that is not valid
    /// UTF-8 is consumed whole and reported as [`ReadError::InvalidUtf8`], so
    /// the next call starts at the following line.
    pub async fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        // Remove the trailing newline
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        Ok(Some(String::from_utf8(buf)?))
    }

    /// Writes one message followed by a newline, then flushes so the client
    /// sees it immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn write_message(&mut self, json: &str) -> io::Result<()> {
        // stdio framing: one message per line
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
