//! Incremental RTSP message parser.
//!
//! A [`Parser`] owns a [`Handle`] (the per-stream parse state) and a
//! [`Callbacks`] implementation. Bytes are fed with [`Parser::execute`] in
//! fragments of any size; events are delivered to the callbacks as soon as
//! the tokens are recognized.
//!
//! ```
//! use rtsp_parser::{Callbacks, CallbackResult, Handle, Kind, Parser};
//!
//! /// Collects the `CSeq` value; tokens may arrive in several pieces.
//! #[derive(Default)]
//! struct Cseq {
//!     field: Vec<u8>,
//!     value: Vec<u8>,
//!     in_value: bool,
//! }
//!
//! impl Callbacks for Cseq {
//!     fn on_header_field(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
//!         if self.in_value {
//!             self.field.clear();
//!             self.in_value = false;
//!         }
//!         self.field.extend_from_slice(at);
//!         Ok(())
//!     }
//!     fn on_header_value(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
//!         self.in_value = true;
//!         if self.field.eq_ignore_ascii_case(b"cseq") {
//!             self.value.extend_from_slice(at);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut parser = Parser::new(Kind::Request, Cseq::default());
//! parser.execute(b"OPTIONS rtsp://cam/live RTSP/1.0\r\nCS").unwrap();
//! parser.execute(b"eq: 1\r\n\r\n").unwrap();
//! assert_eq!(parser.callbacks().value, b"1");
//! ```

mod callbacks;
mod engine;
mod flags;
mod framing;

use std::borrow::Cow;

use crate::error::{Errno, Result};
use crate::protocol::Method;

pub use callbacks::{CallbackResult, Callbacks, HeadersAction};
pub use flags::Flags;
pub use framing::BodyMode;

use engine::{Scratch, State};

/// Which start-line grammar the parser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Request,
    Response,
    /// Decide per message from the first token: `RTSP/` starts a response,
    /// anything else must be a method.
    Both,
}

/// Whether the stream can be cleanly terminated by EOF right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishState {
    /// Between messages; EOF is a clean close.
    Safe,
    /// Inside a body delimited by EOF; [`Parser::finish`] completes it.
    SafeWithCallback,
    /// In the middle of a message; EOF truncates it.
    Unsafe,
}

/// Parse state of one RTSP stream.
///
/// Callbacks receive `&mut Handle` to inspect the message being parsed and
/// to attach an error reason. Control operations that must not run inside a
/// callback (pause, resume, finish) live on [`Parser`].
#[derive(Debug)]
pub struct Handle {
    kind: Kind,
    /// Kind of the message in progress; differs from `kind` only for `Both`.
    message_kind: Kind,
    state: State,
    flags: Flags,
    content_length: u64,
    method: Option<Method>,
    status_code: u16,
    rtsp_major: u8,
    rtsp_minor: u8,
    upgrade: bool,
    error: Errno,
    reason: Cow<'static, str>,
    error_pos: usize,
    finish: FinishState,
    scratch: Scratch,
}

impl Handle {
    pub fn new(kind: Kind) -> Self {
        Handle {
            kind,
            message_kind: kind,
            state: State::Start,
            flags: Flags::empty(),
            content_length: 0,
            method: None,
            status_code: 0,
            rtsp_major: 0,
            rtsp_minor: 0,
            upgrade: false,
            error: Errno::Ok,
            reason: Cow::Borrowed(""),
            error_pos: 0,
            finish: FinishState::Safe,
            scratch: Scratch::default(),
        }
    }

    /// Kind the parser was initialized with.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Kind of the current message once its start line has been recognized.
    pub fn message_kind(&self) -> Kind {
        self.message_kind
    }

    /// Request method, once the request line has been parsed.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// Response status code, `0` until the status line has been parsed.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn rtsp_major(&self) -> u8 {
        self.rtsp_major
    }

    pub fn rtsp_minor(&self) -> u8 {
        self.rtsp_minor
    }

    /// Bytes remaining in the current framing unit: the declared
    /// `Content-Length` before the body, the remaining identity body while
    /// it is consumed, or the current chunk size inside `on_chunk_header`.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// `true` once the headers request a protocol upgrade.
    pub fn upgrade(&self) -> bool {
        self.upgrade
    }

    pub fn finish_state(&self) -> FinishState {
        self.finish
    }

    pub fn errno(&self) -> Errno {
        self.error
    }

    pub fn error_reason(&self) -> &str {
        &self.reason
    }

    /// Attach a reason to the error a callback is about to return.
    pub fn set_error_reason(&mut self, reason: impl Into<Cow<'static, str>>) {
        self.reason = reason.into();
    }

    /// Offset in the last fragment at which parsing stopped on an error or
    /// pause. After a resume, continue with `data[error_pos..]`.
    pub fn error_pos(&self) -> usize {
        self.error_pos
    }

    pub fn is_lenient(&self) -> bool {
        self.flags.contains(Flags::LENIENT)
    }

    /// Toggle lenient header validation for bytes parsed from now on.
    pub fn set_lenient(&mut self, enabled: bool) {
        self.flags.set(Flags::LENIENT, enabled);
    }

    fn latch(&mut self, errno: Errno, reason: &'static str, pos: usize) -> Errno {
        self.error = errno;
        self.reason = Cow::Borrowed(reason);
        self.error_pos = pos;
        tracing::debug!(errno = errno.name(), reason, pos, "parser stopped");
        errno
    }
}

/// A [`Handle`] bound to its callbacks.
///
/// The parser never allocates; it retains only the state needed to resume on
/// the next fragment.
#[derive(Debug)]
pub struct Parser<C> {
    handle: Handle,
    callbacks: C,
}

impl<C: Callbacks> Parser<C> {
    pub fn new(kind: Kind, callbacks: C) -> Self {
        Parser {
            handle: Handle::new(kind),
            callbacks,
        }
    }

    /// Reset all parse state, including the lenient flag and any latched
    /// error. The callbacks are kept.
    pub fn init(&mut self, kind: Kind) {
        self.handle = Handle::new(kind);
    }

    /// Parse the next fragment of the stream.
    ///
    /// Returns the latched error without consuming anything if the parser is
    /// already stopped; `error_pos` is then `0`, so `data` is resumed from its
    /// start. Once a non-pause error is returned, every later call returns it
    /// again until [`init`](Self::init).
    pub fn execute(&mut self, data: &[u8]) -> Result<()> {
        if !self.handle.error.is_ok() {
            self.handle.error_pos = 0;
            return Err(self.handle.error);
        }
        self.handle.run(&mut self.callbacks, data)
    }

    /// Signal that the transport has no more bytes.
    ///
    /// Completes an EOF-delimited body by calling `on_message_complete`, and
    /// reports [`Errno::InvalidEofState`] if the stream ended mid-message.
    /// A parser that already stopped on an error returns `Ok(())`.
    pub fn finish(&mut self) -> Result<()> {
        if !self.handle.error.is_ok() {
            return Ok(());
        }

        match self.handle.finish {
            FinishState::SafeWithCallback => {
                self.handle.finish = FinishState::Safe;
                tracing::trace!("message complete on EOF");
                self.callbacks.on_message_complete(&mut self.handle)
            }
            FinishState::Safe => Ok(()),
            FinishState::Unsafe => {
                let pos = self.handle.error_pos;
                Err(self
                    .handle
                    .latch(Errno::InvalidEofState, "Invalid EOF state", pos))
            }
        }
    }

    /// Make the next `execute` return [`Errno::Paused`]. No-op if an error is
    /// already latched.
    pub fn pause(&mut self) {
        if !self.handle.error.is_ok() {
            return;
        }
        self.handle.error = Errno::Paused;
        self.handle.reason = Cow::Borrowed("Paused");
    }

    /// Clear a [`Errno::Paused`] sentinel; any other state is left alone.
    pub fn resume(&mut self) {
        if self.handle.error == Errno::Paused {
            self.handle.error = Errno::Ok;
            self.handle.reason = Cow::Borrowed("");
        }
    }

    /// Clear a [`Errno::PausedUpgrade`] sentinel to keep parsing RTSP after an
    /// upgrade; any other state is left alone.
    pub fn resume_after_upgrade(&mut self) {
        if self.handle.error == Errno::PausedUpgrade {
            self.handle.error = Errno::Ok;
            self.handle.reason = Cow::Borrowed("");
        }
    }

    pub fn errno(&self) -> Errno {
        self.handle.errno()
    }

    pub fn error_reason(&self) -> &str {
        self.handle.error_reason()
    }

    pub fn set_error_reason(&mut self, reason: impl Into<Cow<'static, str>>) {
        self.handle.set_error_reason(reason);
    }

    pub fn error_pos(&self) -> usize {
        self.handle.error_pos()
    }

    pub fn set_lenient(&mut self, enabled: bool) {
        self.handle.set_lenient(enabled);
    }

    pub fn should_keep_alive(&self) -> bool {
        self.handle.should_keep_alive()
    }

    pub fn message_needs_eof(&self) -> bool {
        self.handle.message_needs_eof()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut Handle {
        &mut self.handle
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn into_callbacks(self) -> C {
        self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Completions(usize);

    impl Callbacks for Completions {
        fn on_message_complete(&mut self, _: &mut Handle) -> CallbackResult {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn new_parser_is_idle_and_safe() {
        let parser = Parser::new(Kind::Both, ());
        assert_eq!(parser.errno(), Errno::Ok);
        assert_eq!(parser.handle().finish_state(), FinishState::Safe);
        assert_eq!(parser.handle().flags(), Flags::empty());
    }

    #[test]
    fn pause_and_resume_toggle_the_sentinel() {
        let mut parser = Parser::new(Kind::Request, ());
        parser.pause();
        assert_eq!(parser.errno(), Errno::Paused);
        assert_eq!(parser.error_reason(), "Paused");
        assert_eq!(parser.execute(b"OPTIONS"), Err(Errno::Paused));

        parser.resume_after_upgrade();
        assert_eq!(parser.errno(), Errno::Paused);

        parser.resume();
        assert_eq!(parser.errno(), Errno::Ok);
        assert_eq!(parser.execute(b"OPTIONS * RTSP/1.0\r\n\r\n"), Ok(()));
    }

    #[test]
    fn pause_does_not_overwrite_a_latched_error() {
        let mut parser = Parser::new(Kind::Request, ());
        assert_eq!(parser.execute(b"FOO "), Err(Errno::InvalidMethod));
        parser.pause();
        parser.resume();
        assert_eq!(parser.errno(), Errno::InvalidMethod);
    }

    #[test]
    fn finish_mid_message_is_invalid_eof() {
        let mut parser = Parser::new(Kind::Request, ());
        parser.execute(b"PLAY rtsp://a RTSP/1.0\r\nCSeq").unwrap();
        assert_eq!(parser.finish(), Err(Errno::InvalidEofState));
        assert_eq!(parser.error_reason(), "Invalid EOF state");
        // Already latched: finishing again is a no-op.
        assert_eq!(parser.finish(), Ok(()));
    }

    #[test]
    fn finish_completes_eof_delimited_body_once() {
        let mut parser = Parser::new(Kind::Response, Completions::default());
        parser.execute(b"RTSP/1.0 200 OK\r\n\r\nv=0\r\n").unwrap();
        assert_eq!(parser.handle().finish_state(), FinishState::SafeWithCallback);
        assert_eq!(parser.finish(), Ok(()));
        assert_eq!(parser.finish(), Ok(()));
        assert_eq!(parser.callbacks().0, 1);
    }

    #[test]
    fn init_clears_error_and_lenient() {
        let mut parser = Parser::new(Kind::Request, ());
        parser.set_lenient(true);
        let _ = parser.execute(b"\x01");
        assert_ne!(parser.errno(), Errno::Ok);

        parser.init(Kind::Response);
        assert_eq!(parser.errno(), Errno::Ok);
        assert!(!parser.handle().is_lenient());
        assert_eq!(parser.handle().kind(), Kind::Response);
    }

    #[test]
    fn callback_supplied_reason_survives() {
        struct Reject;

        impl Callbacks for Reject {
            fn on_url(&mut self, parser: &mut Handle, _: &[u8]) -> CallbackResult {
                parser.set_error_reason(format!("mount {} not allowed", "/private"));
                Err(Errno::User)
            }
        }

        let mut parser = Parser::new(Kind::Request, Reject);
        assert_eq!(
            parser.execute(b"DESCRIBE rtsp://cam/private RTSP/1.0\r\n"),
            Err(Errno::User)
        );
        assert_eq!(parser.error_reason(), "mount /private not allowed");
    }
}
