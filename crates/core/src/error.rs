//! Error codes surfaced by the RTSP parser.

/// Closed set of parser error codes.
///
/// Variants fall into three groups:
///
/// - **Control**: [`Ok`](Self::Ok), plus the two recoverable sentinels
///   [`Paused`](Self::Paused) and [`PausedUpgrade`](Self::PausedUpgrade).
/// - **Protocol**: malformed start lines, header tokens, lengths and chunk
///   framing. These latch on the parser until it is re-initialized.
/// - **Callback**: [`User`](Self::User), the conventional code for a callback
///   that wants to abort parsing. Callbacks may also return any other code;
///   it is propagated verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(u8)]
pub enum Errno {
    /// No error; parsing may continue.
    #[error("ok")]
    Ok = 0,

    /// The parser reached a state it should never be in.
    #[error("internal parser error")]
    Internal = 1,

    /// A CR was not followed by LF.
    #[error("expected LF after CR")]
    LfExpected = 2,

    /// `Content-Length` was repeated or combined with `Transfer-Encoding`.
    #[error("unexpected Content-Length header")]
    UnexpectedContentLength = 3,

    /// Bytes arrived after a message that closed the connection.
    #[error("data after connection close")]
    ClosedConnection = 4,

    #[error("invalid method")]
    InvalidMethod = 5,

    #[error("invalid request URL")]
    InvalidUrl = 6,

    /// The protocol name in the start line was not `RTSP`.
    #[error("invalid protocol constant")]
    InvalidConstant = 7,

    #[error("invalid protocol version")]
    InvalidVersion = 8,

    /// A header name or value contained a byte outside the allowed set.
    #[error("invalid header token")]
    InvalidHeaderToken = 9,

    #[error("invalid Content-Length value")]
    InvalidContentLength = 10,

    #[error("invalid chunk size")]
    InvalidChunkSize = 11,

    #[error("invalid status code")]
    InvalidStatus = 12,

    /// [`finish`](crate::Parser::finish) was called in the middle of a
    /// message whose end cannot be inferred from EOF.
    #[error("invalid EOF state")]
    InvalidEofState = 13,

    /// A request used `Transfer-Encoding` without a final `chunked` coding.
    #[error("invalid Transfer-Encoding for request")]
    InvalidTransferEncoding = 14,

    /// Parsing was suspended by a callback or by [`pause`](crate::Parser::pause).
    #[error("paused")]
    Paused = 15,

    /// Parsing stopped after a message that hands the stream to another protocol.
    #[error("paused on upgrade")]
    PausedUpgrade = 16,

    /// Generic callback-originated error.
    #[error("user callback error")]
    User = 17,
}

impl Errno {
    /// Diagnostic name of the code, e.g. `"INVALID_CHUNK_SIZE"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Internal => "INTERNAL",
            Self::LfExpected => "LF_EXPECTED",
            Self::UnexpectedContentLength => "UNEXPECTED_CONTENT_LENGTH",
            Self::ClosedConnection => "CLOSED_CONNECTION",
            Self::InvalidMethod => "INVALID_METHOD",
            Self::InvalidUrl => "INVALID_URL",
            Self::InvalidConstant => "INVALID_CONSTANT",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidHeaderToken => "INVALID_HEADER_TOKEN",
            Self::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            Self::InvalidChunkSize => "INVALID_CHUNK_SIZE",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidEofState => "INVALID_EOF_STATE",
            Self::InvalidTransferEncoding => "INVALID_TRANSFER_ENCODING",
            Self::Paused => "PAUSED",
            Self::PausedUpgrade => "PAUSED_UPGRADE",
            Self::User => "USER",
        }
    }

    /// `true` for the two sentinels that a resume call can clear.
    pub const fn is_pause(self) -> bool {
        matches!(self, Self::Paused | Self::PausedUpgrade)
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Convenience alias for `Result<T, Errno>`.
pub type Result<T> = std::result::Result<T, Errno>;
