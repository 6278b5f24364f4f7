//! Crate-wide error taxonomy (spec §7).

use std::io;

/// Errors that can surface out of the transport layer.
///
/// Engine-level rejections (a failed `Place` or `Cancel`) are never
/// represented here — they are carried as the `success` field of the
/// corresponding response frame, per the engine's error-handling design.
#[derive(thiserror::Error, Debug)]
pub enum ExchangeError {
    /// `getaddrinfo` (or the equivalent) failed to resolve a host/port pair.
    #[error("address resolution failed for {host}:{port}: {reason}")]
    AddressResolution {
        host: String,
        port: String,
        reason: String,
    },

    /// A socket syscall (`socket`, `bind`, `listen`, `connect`, `setsockopt`)
    /// failed at setup time.
    #[error("socket setup failed: {0}")]
    Socket(#[source] io::Error),

    /// The peer closed the connection, or a read/write returned 0/`EOF`
    /// mid-session. Fatal for the session.
    #[error("connection lost")]
    ConnectionLost,

    /// The peer sent a frame whose discriminant byte does not match any
    /// known request/response type.
    #[error("unknown frame type byte {0:#x}")]
    UnknownFrameType(u8),
}

impl From<io::Error> for ExchangeError {
    fn from(err: io::Error) -> Self {
        ExchangeError::Socket(err)
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
