//! One-shot WeeChat relay transport client.
//!
//! Each call opens a fresh connection, authenticates, injects one command
//! into a named buffer, and disconnects. The client keeps no state between
//! calls and is safe to reconstruct per call.
//!
//! Wire format: every relay reply is one frame of a 4-byte big-endian total
//! length (including the prefix itself), one compression-flag byte (only 0
//! is supported), and the payload.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::RelayConfig;
use crate::error::RelayError;

pub struct RelayClient {
    host: String,
    port: u16,
    password: String,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            password: config.password.clone(),
        }
    }

    /// Inject `command` into `buffer` without waiting for a reply. The
    /// relay's `input` command never answers.
    pub async fn send_command(&self, buffer: &str, command: &str) -> Result<(), RelayError> {
        let mut stream = self.login().await?;
        let result = write_line(&mut stream, &format!("input {buffer} {command}")).await;
        quit(&mut stream).await;
        result
    }

    /// Inject `command` into `buffer` and return the payload of exactly one
    /// reply frame.
    pub async fn send_command_with_response(
        &self,
        buffer: &str,
        command: &str,
    ) -> Result<String, RelayError> {
        let mut stream = self.login().await?;
        let result = async {
            write_line(&mut stream, &format!("input {buffer} {command}")).await?;
            read_frame(&mut stream).await
        }
        .await;
        quit(&mut stream).await;
        result
    }

    /// Connect and authenticate: `handshake`, discard the reply frame, then
    /// `init` with the credential (which gets no reply).
    async fn login(&self) -> Result<TcpStream, RelayError> {
        if self.password.is_empty() {
            return Err(RelayError::MissingPassword);
        }
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        write_line(&mut stream, "handshake").await?;
        read_frame(&mut stream).await?;
        write_line(&mut stream, &format!("init password={}", self.password)).await?;
        Ok(stream)
    }
}

/// Polite disconnect. Errors are swallowed; tearing down a dead socket must
/// never fail the command that already ran.
async fn quit(stream: &mut TcpStream) {
    let _ = stream.write_all(b"quit\n").await;
    let _ = stream.shutdown().await;
}

async fn write_line(stream: &mut TcpStream, line: &str) -> Result<(), RelayError> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    Ok(())
}

async fn read_frame(stream: &mut TcpStream) -> Result<String, RelayError> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let total = u32::from_be_bytes(header);
    // The total includes the prefix and must cover the compression flag.
    let Some(body_len @ 1..) = (total as usize).checked_sub(4) else {
        return Err(RelayError::MalformedFrame(total));
    };
    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).await?;
    if body[0] != 0 {
        return Err(RelayError::UnsupportedCompression(body[0]));
    }
    Ok(String::from_utf8_lossy(&body[1..]).trim().to_string())
}
