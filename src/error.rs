use std::io;

use thiserror::Error;

/// Errors raised while accepting or servicing an inbound session command.
///
/// These never escape to the remote caller directly; the engine converts
/// them into exactly one webhook notification per terminal condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed inbound command. No session is created, nothing is notified.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// The global lock is held by another session.
    #[error("Another search is already in progress. Please try again.")]
    Busy,

    /// The configured server identity is not present or not connected.
    #[error("Error: IRC server '{0}' not found or connected.")]
    ServerNotFound(String),

    /// The configured channel is not joined on the server.
    #[error("Error: IRC channel '{0}' not found or joined.")]
    ChannelNotFound(String),

    /// A download referenced a session that no longer exists or never
    /// produced choices.
    #[error("Download failed: Session expired or is not a valid search session. Please search again.")]
    SessionNotFound(String),

    /// A download referenced a choice id outside the curated list.
    #[error("Download failed: Invalid choice ID '{choice_id}' for session {session_id}. Please select from available options.")]
    InvalidChoice {
        session_id: String,
        choice_id: String,
    },
}

/// Errors from the one-shot relay transport client.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Raised before any I/O when no relay password is configured.
    #[error("WeeChat relay password is not set")]
    MissingPassword,

    /// The peer sent a frame with a compression flag we do not implement.
    #[error("unsupported relay compression type 0x{0:02x}")]
    UnsupportedCompression(u8),

    /// The peer sent a length prefix too small to hold a compression flag.
    #[error("malformed relay frame: total length {0}")]
    MalformedFrame(u32),

    /// Connection, read, or truncated-frame failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
