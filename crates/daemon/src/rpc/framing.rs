// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing for JSON-RPC messages.
//!
//! Two framings, auto-detected per connection by sniffing the first
//! non-empty line: `Content-Length: N` headers with a `\r\n\r\n`-separated
//! body (LSP style), or one JSON message per newline-delimited line.
//! Responses mirror the detected framing.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum message size (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid framing header: {0}")]
    InvalidHeader(String),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed mid-frame")]
    ConnectionClosed,
}

/// Framing detected for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    ContentLength,
    Line,
}

/// Read one message; `mode` is sniffed on the first frame and pinned for
/// the rest of the connection. Returns `None` on a clean EOF.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    mode: &mut Option<Framing>,
) -> Result<Option<String>, ProtocolError> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("Content-Length:") {
            let size: usize = rest
                .trim()
                .parse()
                .map_err(|_| ProtocolError::InvalidHeader(trimmed.to_string()))?;
            if size > MAX_MESSAGE_SIZE {
                return Err(ProtocolError::MessageTooLarge {
                    size,
                    max: MAX_MESSAGE_SIZE,
                });
            }

            // Drain remaining headers up to the blank separator line.
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).await?;
                if n == 0 {
                    return Err(ProtocolError::ConnectionClosed);
                }
                if header.trim_end_matches(['\r', '\n']).is_empty() {
                    break;
                }
            }

            let mut body = vec![0u8; size];
            reader
                .read_exact(&mut body)
                .await
                .map_err(|_| ProtocolError::ConnectionClosed)?;
            *mode = Some(Framing::ContentLength);
            return Ok(Some(String::from_utf8_lossy(&body).into_owned()));
        }

        if trimmed.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: trimmed.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        mode.get_or_insert(Framing::Line);
        return Ok(Some(trimmed.to_string()));
    }
}

/// Write one message in the connection's framing (line mode when still
/// undetected).
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    mode: Option<Framing>,
    payload: &str,
) -> Result<(), ProtocolError> {
    match mode {
        Some(Framing::ContentLength) => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(payload.as_bytes()).await?;
        }
        _ => {
            writer.write_all(payload.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
