use bitflags::bitflags;

bitflags! {
    /// Per-message framing and connection flags.
    ///
    /// Everything except [`LENIENT`](Self::LENIENT) is cleared at each message
    /// boundary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u16 {
        const CONNECTION_KEEP_ALIVE = 1 << 0;
        const CONNECTION_CLOSE = 1 << 1;
        const CONNECTION_UPGRADE = 1 << 2;
        const CHUNKED = 1 << 3;
        const UPGRADE = 1 << 4;
        const CONTENT_LENGTH = 1 << 5;
        const SKIP_BODY = 1 << 6;
        /// Inside the trailer section of a chunked body.
        const TRAILING = 1 << 7;
        const LENIENT = 1 << 8;
        const TRANSFER_ENCODING = 1 << 9;
    }
}
