//! Body framing and connection reuse policy (RFC 7230 §3.3.3, RFC 2326 §12.10).

use crate::error::Errno;

use super::{Flags, Handle, Kind};

/// How the body of the current message is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// No body; the message is complete after the headers.
    None,
    /// The rest of the stream belongs to another protocol.
    Upgrade,
    Chunked,
    /// Exactly this many bytes follow.
    Identity(u64),
    /// Everything up to EOF is body.
    IdentityEof,
}

impl Handle {
    /// `true` if the message in progress can only be terminated by EOF.
    pub fn message_needs_eof(&self) -> bool {
        if self.message_kind == Kind::Request {
            return false;
        }

        if self.status_code / 100 == 1
            || self.status_code == 204
            || self.status_code == 304
            || self.flags.contains(Flags::SKIP_BODY)
        {
            return false;
        }

        // A coding other than chunked leaves the length undetermined.
        if self.flags.contains(Flags::TRANSFER_ENCODING) && !self.flags.contains(Flags::CHUNKED) {
            return true;
        }

        !self.flags.intersects(Flags::CHUNKED | Flags::CONTENT_LENGTH)
    }

    /// `true` if another message may follow the current one on this stream.
    pub fn should_keep_alive(&self) -> bool {
        if (self.rtsp_major, self.rtsp_minor) >= (1, 1) {
            if self.flags.contains(Flags::CONNECTION_CLOSE) {
                return false;
            }
        } else if !self.flags.contains(Flags::CONNECTION_KEEP_ALIVE) {
            return false;
        }

        !self.message_needs_eof()
    }

    /// Decide the upgrade bit before `on_headers_complete` so the callback
    /// can observe it.
    pub(super) fn detect_upgrade(&mut self) {
        // For responses the pair is only binding on 101 Switching Protocols;
        // otherwise it merely advertises support.
        if self.flags.contains(Flags::UPGRADE | Flags::CONNECTION_UPGRADE) {
            self.upgrade = self.message_kind == Kind::Request || self.status_code == 101;
        }
    }

    /// Pick the body framing once the header section has been accepted.
    ///
    /// The order of these checks is what keeps ambiguous framing from being
    /// interpreted two different ways by two peers.
    pub(super) fn resolve_body_mode(&self) -> Result<BodyMode, (Errno, &'static str)> {
        let flags = self.flags;
        let has_body = flags.contains(Flags::CHUNKED) || self.content_length > 0;

        if self.upgrade && (flags.contains(Flags::SKIP_BODY) || !has_body) {
            return Ok(BodyMode::Upgrade);
        }

        if flags.contains(Flags::SKIP_BODY) {
            Ok(BodyMode::None)
        } else if flags.contains(Flags::CHUNKED) {
            // Content-Length, if any, is ignored.
            Ok(BodyMode::Chunked)
        } else if flags.contains(Flags::TRANSFER_ENCODING) {
            if self.message_kind == Kind::Request && !flags.contains(Flags::LENIENT) {
                Err((
                    Errno::InvalidTransferEncoding,
                    "Request has invalid `Transfer-Encoding`",
                ))
            } else {
                Ok(BodyMode::IdentityEof)
            }
        } else if !flags.contains(Flags::CONTENT_LENGTH) {
            if self.message_needs_eof() {
                Ok(BodyMode::IdentityEof)
            } else {
                Ok(BodyMode::None)
            }
        } else if self.content_length == 0 {
            Ok(BodyMode::None)
        } else {
            Ok(BodyMode::Identity(self.content_length))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, flags: Flags) -> Handle {
        let mut handle = Handle::new(Kind::Response);
        handle.status_code = status;
        handle.flags = flags;
        handle.rtsp_major = 1;
        handle
    }

    fn request(flags: Flags) -> Handle {
        let mut handle = Handle::new(Kind::Request);
        handle.flags = flags;
        handle.rtsp_major = 1;
        handle
    }

    #[test]
    fn requests_never_need_eof() {
        assert!(!request(Flags::empty()).message_needs_eof());
        assert!(!request(Flags::TRANSFER_ENCODING).message_needs_eof());
    }

    #[test]
    fn bodyless_statuses_never_need_eof() {
        for status in [100, 101, 204, 304] {
            assert!(!response(status, Flags::TRANSFER_ENCODING).message_needs_eof());
        }
        assert!(!response(200, Flags::SKIP_BODY).message_needs_eof());
    }

    #[test]
    fn unframed_response_needs_eof() {
        assert!(response(200, Flags::empty()).message_needs_eof());
        assert!(!response(200, Flags::CONTENT_LENGTH).message_needs_eof());
        let chunked = Flags::CHUNKED | Flags::TRANSFER_ENCODING;
        assert!(!response(200, chunked).message_needs_eof());
        let dangling = Flags::TRANSFER_ENCODING | Flags::CONTENT_LENGTH;
        assert!(response(200, dangling).message_needs_eof());
    }

    #[test]
    fn rtsp_10_keeps_alive_only_when_asked() {
        let mut handle = response(200, Flags::CONTENT_LENGTH);
        assert!(!handle.should_keep_alive());
        handle.flags.insert(Flags::CONNECTION_KEEP_ALIVE);
        assert!(handle.should_keep_alive());
    }

    #[test]
    fn rtsp_11_keeps_alive_unless_closed() {
        let mut handle = response(200, Flags::CONTENT_LENGTH);
        handle.rtsp_minor = 1;
        assert!(handle.should_keep_alive());
        handle.flags.insert(Flags::CONNECTION_CLOSE);
        assert!(!handle.should_keep_alive());
    }

    #[test]
    fn rtsp_20_uses_persistent_default() {
        let mut handle = response(200, Flags::CONTENT_LENGTH);
        handle.rtsp_major = 2;
        assert!(handle.should_keep_alive());
    }

    #[test]
    fn eof_framing_defeats_keep_alive() {
        let mut handle = response(200, Flags::CONNECTION_KEEP_ALIVE);
        assert!(!handle.should_keep_alive());
        handle.rtsp_minor = 1;
        assert!(!handle.should_keep_alive());
    }

    #[test]
    fn chunked_wins_over_content_length() {
        let flags = Flags::CHUNKED | Flags::TRANSFER_ENCODING | Flags::CONTENT_LENGTH;
        let mut handle = response(200, flags);
        handle.content_length = 40;
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::Chunked));
    }

    #[test]
    fn non_chunked_transfer_encoding() {
        let handle = response(200, Flags::TRANSFER_ENCODING);
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::IdentityEof));

        let handle = request(Flags::TRANSFER_ENCODING);
        assert_eq!(
            handle.resolve_body_mode().map_err(|(errno, _)| errno),
            Err(Errno::InvalidTransferEncoding)
        );

        let handle = request(Flags::TRANSFER_ENCODING | Flags::LENIENT);
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::IdentityEof));
    }

    #[test]
    fn content_length_modes() {
        let mut handle = response(200, Flags::CONTENT_LENGTH);
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::None));
        handle.content_length = 40;
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::Identity(40)));

        assert_eq!(request(Flags::empty()).resolve_body_mode(), Ok(BodyMode::None));
        assert_eq!(
            response(200, Flags::empty()).resolve_body_mode(),
            Ok(BodyMode::IdentityEof)
        );
    }

    #[test]
    fn skip_body_beats_framing() {
        let mut handle = response(200, Flags::SKIP_BODY | Flags::CONTENT_LENGTH);
        handle.content_length = 10;
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::None));
    }

    #[test]
    fn upgrade_without_body_bypasses() {
        let mut handle = request(Flags::UPGRADE | Flags::CONNECTION_UPGRADE);
        handle.detect_upgrade();
        assert!(handle.upgrade());
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::Upgrade));

        // An upgrade request with a body reads the body first.
        handle.flags.insert(Flags::CONTENT_LENGTH);
        handle.content_length = 3;
        assert_eq!(handle.resolve_body_mode(), Ok(BodyMode::Identity(3)));
    }

    #[test]
    fn response_upgrade_needs_101() {
        let mut handle = response(200, Flags::UPGRADE | Flags::CONNECTION_UPGRADE);
        handle.detect_upgrade();
        assert!(!handle.upgrade());

        let mut handle = response(101, Flags::UPGRADE | Flags::CONNECTION_UPGRADE);
        handle.detect_upgrade();
        assert!(handle.upgrade());
    }
}
