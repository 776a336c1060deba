//! Byte-level state machine behind [`Parser::execute`](super::Parser::execute).
//!
//! Every state either consumes input or is zero-width (invokes a callback or
//! makes a framing decision). The next state is always stored before a
//! callback runs, so a pause resumes exactly after the event that paused.

use std::borrow::Cow;

use crate::error::{Errno, Result};
use crate::protocol::token::{self, Matcher};
use crate::protocol::{MAX_METHOD_LEN, Method};

use super::{BodyMode, CallbackResult, Callbacks, FinishState, Flags, Handle, HeadersAction, Kind};

const PROTOCOL: &[u8] = b"RTSP/";

const HEADERS: &[&[u8]] = &[
    b"connection",
    b"content-length",
    b"proxy-connection",
    b"transfer-encoding",
    b"upgrade",
];

const CONNECTION_TOKENS: &[&[u8]] = &[b"close", b"keep-alive", b"upgrade"];

const CODINGS: &[&[u8]] = &[b"chunked"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Start,
    /// Method, or the `RTSP/` prefix of a status line.
    StartToken,
    UrlStart,
    Url,
    ReqProtocol,
    VersionMajor,
    VersionDot,
    VersionMinor,
    ReqLineEnd,
    ResAfterVersion,
    StatusCode,
    StatusStart,
    Status,
    LineAlmostDone,
    HeaderFieldStart,
    HeaderField,
    HeaderValueDiscardWs,
    HeaderValue,
    HeaderValueAlmostDone,
    HeadersAlmostDone,
    HeadersComplete,
    AfterHeadersComplete,
    BodyIdentity,
    BodyIdentityEof,
    ChunkSizeStart,
    ChunkSize,
    ChunkSizeOws,
    ChunkExtensions,
    ChunkSizeAlmostDone,
    ChunkHeader,
    ChunkData,
    ChunkDataAlmostDone,
    ChunkDataDone,
    ChunkComplete,
    MessageComplete,
    AfterMessageComplete,
    /// The previous message closed the connection.
    Closed,
}

impl State {
    /// Data token that continues across fragment boundaries in this state.
    fn span(self) -> Option<Event> {
        match self {
            State::Url => Some(Event::Url),
            State::Status => Some(Event::Status),
            State::HeaderField => Some(Event::HeaderField),
            State::HeaderValue => Some(Event::HeaderValue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    MessageBegin,
    Url,
    Status,
    HeaderField,
    HeaderValue,
    HeadersComplete,
    Body,
    MessageComplete,
    ChunkHeader,
    ChunkComplete,
}

impl Event {
    fn error_reason(self) -> &'static str {
        match self {
            Event::MessageBegin => "`on_message_begin` callback error",
            Event::Url => "`on_url` callback error",
            Event::Status => "`on_status` callback error",
            Event::HeaderField => "`on_header_field` callback error",
            Event::HeaderValue => "`on_header_value` callback error",
            Event::HeadersComplete => "`on_headers_complete` callback error",
            Event::Body => "`on_body` callback error",
            Event::MessageComplete => "`on_message_complete` callback error",
            Event::ChunkHeader => "`on_chunk_header` callback error",
            Event::ChunkComplete => "`on_chunk_complete` callback error",
        }
    }

    fn pause_reason(self) -> &'static str {
        match self {
            Event::MessageBegin => "`on_message_begin` pause",
            Event::Url => "`on_url` pause",
            Event::Status => "`on_status` pause",
            Event::HeaderField => "`on_header_field` pause",
            Event::HeaderValue => "`on_header_value` pause",
            Event::HeadersComplete => "`on_headers_complete` pause",
            Event::Body => "`on_body` pause",
            Event::MessageComplete => "`on_message_complete` pause",
            Event::ChunkHeader => "`on_chunk_header` pause",
            Event::ChunkComplete => "`on_chunk_complete` pause",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Header {
    #[default]
    General,
    ContentLength,
    TransferEncoding,
    Connection,
    Upgrade,
}

impl Header {
    fn from_name(index: Option<usize>) -> Header {
        match index.and_then(|i| HEADERS.get(i)).copied() {
            Some(b"connection") | Some(b"proxy-connection") => Header::Connection,
            Some(b"content-length") => Header::ContentLength,
            Some(b"transfer-encoding") => Header::TransferEncoding,
            Some(b"upgrade") => Header::Upgrade,
            _ => Header::General,
        }
    }

    fn list_table(self) -> &'static [&'static [u8]] {
        match self {
            Header::Connection => CONNECTION_TOKENS,
            Header::TransferEncoding => CODINGS,
            _ => &[],
        }
    }
}

/// One element of a comma-separated header value.
#[derive(Debug, Clone, Copy, Default)]
struct ListItem {
    matcher: Matcher,
    trailing_ws: bool,
}

impl ListItem {
    fn new(table: &[&[u8]]) -> Self {
        ListItem {
            matcher: Matcher::new(table),
            trailing_ws: false,
        }
    }

    fn feed(&mut self, table: &[&[u8]], b: u8) {
        if token::is_ows(b) {
            if !self.matcher.is_empty() {
                self.trailing_ws = true;
            }
            return;
        }
        if self.trailing_ws {
            self.matcher.kill();
        }
        self.matcher.feed(table, b);
    }
}

/// Partial-token state that must survive fragment boundaries.
#[derive(Debug, Default)]
pub(super) struct Scratch {
    token: [u8; MAX_METHOD_LEN],
    token_len: usize,
    constant: usize,
    status_digits: u8,
    field: Matcher,
    field_ws: bool,
    header: Header,
    item: ListItem,
    seen_digit: bool,
    digits_done: bool,
    chunked_last: bool,
}

impl Handle {
    pub(super) fn run<C: Callbacks>(&mut self, callbacks: &mut C, data: &[u8]) -> Result<()> {
        let mut p = 0;
        // Start of the data token in progress, if any.
        let mut mark = self.state.span().map(|_| 0);

        loop {
            let byte = data.get(p).copied();
            match self.state {
                State::Start => {
                    let Some(b) = byte else { break };
                    if b == b'\r' || b == b'\n' {
                        p += 1;
                        continue;
                    }
                    self.begin_message();
                    self.state = State::StartToken;
                    tracing::trace!(kind = ?self.kind, "message begin");
                    let r = callbacks.on_message_begin(self);
                    self.check(r, Event::MessageBegin, p)?;
                }

                State::StartToken => {
                    let Some(b) = byte else { break };
                    self.start_token(b, p)?;
                    p += 1;
                }

                State::UrlStart => {
                    let Some(b) = byte else { break };
                    if b == b' ' {
                        p += 1;
                    } else if token::is_url(b) {
                        mark = Some(p);
                        self.state = State::Url;
                    } else {
                        return Err(self.latch(
                            Errno::InvalidUrl,
                            "Unexpected start char in url",
                            p,
                        ));
                    }
                }

                State::Url => {
                    let Some(b) = byte else { break };
                    if token::is_url(b) {
                        p += 1;
                    } else if b == b' ' {
                        self.state = State::ReqProtocol;
                        self.scratch.constant = 0;
                        let start = mark.take().unwrap_or(p);
                        let r = callbacks.on_url(self, &data[start..p]);
                        p += 1;
                        self.check(r, Event::Url, p)?;
                    } else if b == b'\r' || b == b'\n' {
                        return Err(self.latch(Errno::InvalidVersion, "Missing RTSP version", p));
                    } else {
                        return Err(self.latch(Errno::InvalidUrl, "Invalid characters in url", p));
                    }
                }

                State::ReqProtocol => {
                    let Some(b) = byte else { break };
                    let at = self.scratch.constant;
                    if at == 0 && b == b' ' {
                        p += 1;
                    } else if PROTOCOL.get(at) == Some(&b) {
                        self.scratch.constant += 1;
                        if self.scratch.constant == PROTOCOL.len() {
                            self.state = State::VersionMajor;
                        }
                        p += 1;
                    } else {
                        return Err(self.latch(Errno::InvalidConstant, "Expected RTSP/", p));
                    }
                }

                State::VersionMajor => {
                    let Some(b) = byte else { break };
                    if !b.is_ascii_digit() {
                        return Err(self.latch(Errno::InvalidVersion, "Invalid major version", p));
                    }
                    self.rtsp_major = b - b'0';
                    self.state = State::VersionDot;
                    p += 1;
                }

                State::VersionDot => {
                    let Some(b) = byte else { break };
                    if b != b'.' {
                        return Err(self.latch(Errno::InvalidVersion, "Expected dot", p));
                    }
                    self.state = State::VersionMinor;
                    p += 1;
                }

                State::VersionMinor => {
                    let Some(b) = byte else { break };
                    if !b.is_ascii_digit() {
                        return Err(self.latch(Errno::InvalidVersion, "Invalid minor version", p));
                    }
                    self.rtsp_minor = b - b'0';
                    self.state = if self.message_kind == Kind::Request {
                        State::ReqLineEnd
                    } else {
                        State::ResAfterVersion
                    };
                    p += 1;
                }

                State::ReqLineEnd => {
                    let Some(b) = byte else { break };
                    self.state = match b {
                        b'\r' => State::LineAlmostDone,
                        b'\n' => State::HeaderFieldStart,
                        _ => {
                            return Err(self.latch(
                                Errno::InvalidVersion,
                                "Expected CRLF after version",
                                p,
                            ));
                        }
                    };
                    p += 1;
                }

                State::ResAfterVersion => {
                    let Some(b) = byte else { break };
                    if b != b' ' {
                        return Err(self.latch(
                            Errno::InvalidVersion,
                            "Expected space after version",
                            p,
                        ));
                    }
                    self.scratch.status_digits = 0;
                    self.state = State::StatusCode;
                    p += 1;
                }

                State::StatusCode => {
                    let Some(b) = byte else { break };
                    if b.is_ascii_digit() && self.scratch.status_digits < 3 {
                        self.status_code = self.status_code * 10 + u16::from(b - b'0');
                        self.scratch.status_digits += 1;
                        p += 1;
                        continue;
                    }
                    let complete = self.scratch.status_digits == 3;
                    self.state = match b {
                        b' ' if complete => State::StatusStart,
                        b'\r' if complete => State::LineAlmostDone,
                        b'\n' if complete => State::HeaderFieldStart,
                        _ => return Err(self.latch(Errno::InvalidStatus, "Invalid status code", p)),
                    };
                    p += 1;
                }

                State::StatusStart => {
                    let Some(b) = byte else { break };
                    match b {
                        b'\r' => {
                            self.state = State::LineAlmostDone;
                            p += 1;
                        }
                        b'\n' => {
                            self.state = State::HeaderFieldStart;
                            p += 1;
                        }
                        _ => {
                            mark = Some(p);
                            self.state = State::Status;
                        }
                    }
                }

                State::Status => {
                    let Some(b) = byte else { break };
                    if b != b'\r' && b != b'\n' {
                        p += 1;
                        continue;
                    }
                    self.state = if b == b'\r' {
                        State::LineAlmostDone
                    } else {
                        State::HeaderFieldStart
                    };
                    let start = mark.take().unwrap_or(p);
                    let r = callbacks.on_status(self, &data[start..p]);
                    p += 1;
                    self.check(r, Event::Status, p)?;
                }

                State::LineAlmostDone => {
                    let Some(b) = byte else { break };
                    if b != b'\n' {
                        return Err(self.latch(
                            Errno::LfExpected,
                            "Expected LF after start line",
                            p,
                        ));
                    }
                    self.state = State::HeaderFieldStart;
                    p += 1;
                }

                State::HeaderFieldStart => {
                    let Some(b) = byte else { break };
                    match b {
                        b'\r' => {
                            self.state = State::HeadersAlmostDone;
                            p += 1;
                        }
                        b'\n' => {
                            self.state = self.after_header_section();
                            p += 1;
                        }
                        b' ' | b'\t' => {
                            return Err(self.latch(
                                Errno::InvalidHeaderToken,
                                "Unexpected whitespace before header name",
                                p,
                            ));
                        }
                        b':' => {
                            return Err(self.latch(
                                Errno::InvalidHeaderToken,
                                "Empty header name",
                                p,
                            ));
                        }
                        _ => {
                            // Trailer fields never affect framing.
                            self.scratch.field = if self.flags.contains(Flags::TRAILING) {
                                Matcher::dead()
                            } else {
                                Matcher::new(HEADERS)
                            };
                            self.scratch.field_ws = false;
                            mark = Some(p);
                            self.state = State::HeaderField;
                        }
                    }
                }

                State::HeaderField => {
                    let Some(b) = byte else { break };
                    let lenient = self.is_lenient();
                    if b == b':' {
                        let header = Header::from_name(self.scratch.field.matched(HEADERS));
                        self.state = State::HeaderValueDiscardWs;
                        self.begin_value(header, p)?;
                        let start = mark.take().unwrap_or(p);
                        let r = callbacks.on_header_field(self, &data[start..p]);
                        p += 1;
                        self.check(r, Event::HeaderField, p)?;
                    } else if token::is_ows(b) {
                        if !lenient {
                            return Err(self.latch(
                                Errno::InvalidHeaderToken,
                                "Whitespace in header name",
                                p,
                            ));
                        }
                        self.scratch.field_ws = true;
                        p += 1;
                    } else if b == b'\r' || b == b'\n' {
                        return Err(self.latch(
                            Errno::InvalidHeaderToken,
                            "Header name without colon",
                            p,
                        ));
                    } else if lenient || token::is_token(b) {
                        if self.scratch.field_ws {
                            self.scratch.field.kill();
                        }
                        self.scratch.field.feed(HEADERS, b);
                        p += 1;
                    } else {
                        return Err(self.latch(
                            Errno::InvalidHeaderToken,
                            "Invalid header field char",
                            p,
                        ));
                    }
                }

                State::HeaderValueDiscardWs => {
                    let Some(b) = byte else { break };
                    match b {
                        b' ' | b'\t' => p += 1,
                        b'\r' | b'\n' => {
                            self.state = if b == b'\r' {
                                State::HeaderValueAlmostDone
                            } else {
                                State::HeaderFieldStart
                            };
                            self.end_value(p)?;
                            let r = callbacks.on_header_value(self, &[]);
                            p += 1;
                            self.check(r, Event::HeaderValue, p)?;
                        }
                        _ => {
                            mark = Some(p);
                            self.state = State::HeaderValue;
                        }
                    }
                }

                State::HeaderValue => {
                    let Some(b) = byte else { break };
                    if b == b'\r' || b == b'\n' {
                        self.state = if b == b'\r' {
                            State::HeaderValueAlmostDone
                        } else {
                            State::HeaderFieldStart
                        };
                        self.end_value(p)?;
                        let start = mark.take().unwrap_or(p);
                        let r = callbacks.on_header_value(self, &data[start..p]);
                        p += 1;
                        self.check(r, Event::HeaderValue, p)?;
                    } else {
                        if !self.is_lenient() && !token::is_header_value(b) {
                            return Err(self.latch(
                                Errno::InvalidHeaderToken,
                                "Invalid header value char",
                                p,
                            ));
                        }
                        self.feed_value(b, p)?;
                        p += 1;
                    }
                }

                State::HeaderValueAlmostDone => {
                    let Some(b) = byte else { break };
                    if b != b'\n' {
                        return Err(self.latch(
                            Errno::LfExpected,
                            "Missing expected LF after header value",
                            p,
                        ));
                    }
                    self.state = State::HeaderFieldStart;
                    p += 1;
                }

                State::HeadersAlmostDone => {
                    let Some(b) = byte else { break };
                    if b != b'\n' {
                        return Err(self.latch(
                            Errno::LfExpected,
                            "Missing expected LF after headers",
                            p,
                        ));
                    }
                    self.state = self.after_header_section();
                    p += 1;
                }

                State::HeadersComplete => {
                    self.detect_upgrade();
                    self.state = State::AfterHeadersComplete;
                    match callbacks.on_headers_complete(self) {
                        Ok(HeadersAction::Proceed) => {}
                        Ok(HeadersAction::SkipBody) => self.flags.insert(Flags::SKIP_BODY),
                        Ok(HeadersAction::Upgrade) => {
                            self.upgrade = true;
                            self.flags.insert(Flags::SKIP_BODY);
                        }
                        Err(errno) => self.check(Err(errno), Event::HeadersComplete, p)?,
                    }
                }

                State::AfterHeadersComplete => {
                    let mode = match self.resolve_body_mode() {
                        Ok(mode) => mode,
                        Err((errno, reason)) => return Err(self.latch(errno, reason, p)),
                    };
                    tracing::trace!(?mode, upgrade = self.upgrade, "headers complete");
                    self.state = match mode {
                        BodyMode::None | BodyMode::Upgrade => State::MessageComplete,
                        BodyMode::Chunked => State::ChunkSizeStart,
                        BodyMode::Identity(_) => State::BodyIdentity,
                        BodyMode::IdentityEof => {
                            self.finish = FinishState::SafeWithCallback;
                            State::BodyIdentityEof
                        }
                    };
                }

                State::BodyIdentity | State::ChunkData => {
                    if byte.is_none() {
                        break;
                    }
                    let available = data.len() - p;
                    let n = usize::try_from(self.content_length)
                        .map_or(available, |remaining| remaining.min(available));
                    self.content_length -= n as u64;
                    if self.content_length == 0 {
                        self.state = if self.state == State::BodyIdentity {
                            State::MessageComplete
                        } else {
                            State::ChunkDataAlmostDone
                        };
                    }
                    let r = callbacks.on_body(self, &data[p..p + n]);
                    p += n;
                    self.check(r, Event::Body, p)?;
                }

                State::BodyIdentityEof => {
                    if byte.is_none() {
                        break;
                    }
                    let r = callbacks.on_body(self, &data[p..]);
                    p = data.len();
                    self.check(r, Event::Body, p)?;
                }

                State::ChunkSizeStart => {
                    let Some(b) = byte else { break };
                    let Some(digit) = token::hex_value(b) else {
                        return Err(self.latch(
                            Errno::InvalidChunkSize,
                            "Invalid character in chunk size",
                            p,
                        ));
                    };
                    self.content_length = u64::from(digit);
                    self.state = State::ChunkSize;
                    p += 1;
                }

                State::ChunkSize => {
                    let Some(b) = byte else { break };
                    if let Some(digit) = token::hex_value(b) {
                        let Some(size) = self
                            .content_length
                            .checked_mul(16)
                            .and_then(|size| size.checked_add(u64::from(digit)))
                        else {
                            return Err(self.latch(
                                Errno::InvalidChunkSize,
                                "Chunk size overflow",
                                p,
                            ));
                        };
                        self.content_length = size;
                        p += 1;
                    } else if token::is_ows(b) {
                        self.state = State::ChunkSizeOws;
                        p += 1;
                    } else {
                        self.state = self.after_chunk_size(b, p)?;
                        p += 1;
                    }
                }

                State::ChunkSizeOws => {
                    let Some(b) = byte else { break };
                    if !token::is_ows(b) {
                        self.state = self.after_chunk_size(b, p)?;
                    }
                    p += 1;
                }

                State::ChunkExtensions => {
                    let Some(b) = byte else { break };
                    match b {
                        b'\r' => self.state = State::ChunkSizeAlmostDone,
                        b'\n' => self.state = State::ChunkHeader,
                        _ => {}
                    }
                    p += 1;
                }

                State::ChunkSizeAlmostDone => {
                    let Some(b) = byte else { break };
                    if b != b'\n' {
                        return Err(self.latch(
                            Errno::LfExpected,
                            "Expected LF after chunk size",
                            p,
                        ));
                    }
                    self.state = State::ChunkHeader;
                    p += 1;
                }

                State::ChunkHeader => {
                    self.state = if self.content_length == 0 {
                        self.flags.insert(Flags::TRAILING);
                        State::HeaderFieldStart
                    } else {
                        State::ChunkData
                    };
                    let r = callbacks.on_chunk_header(self);
                    self.check(r, Event::ChunkHeader, p)?;
                }

                State::ChunkDataAlmostDone => {
                    let Some(b) = byte else { break };
                    self.state = match b {
                        b'\r' => State::ChunkDataDone,
                        b'\n' => State::ChunkComplete,
                        _ => {
                            return Err(self.latch(
                                Errno::LfExpected,
                                "Expected CRLF after chunk data",
                                p,
                            ));
                        }
                    };
                    p += 1;
                }

                State::ChunkDataDone => {
                    let Some(b) = byte else { break };
                    if b != b'\n' {
                        return Err(self.latch(
                            Errno::LfExpected,
                            "Expected LF after chunk data",
                            p,
                        ));
                    }
                    self.state = State::ChunkComplete;
                    p += 1;
                }

                State::ChunkComplete => {
                    self.state = if self.flags.contains(Flags::TRAILING) {
                        State::MessageComplete
                    } else {
                        State::ChunkSizeStart
                    };
                    let r = callbacks.on_chunk_complete(self);
                    self.check(r, Event::ChunkComplete, p)?;
                }

                State::MessageComplete => {
                    self.state = State::AfterMessageComplete;
                    tracing::trace!(
                        method = ?self.method,
                        status = self.status_code,
                        "message complete"
                    );
                    let r = callbacks.on_message_complete(self);
                    self.check(r, Event::MessageComplete, p)?;
                }

                State::AfterMessageComplete => {
                    let keep_alive = self.should_keep_alive();
                    self.finish = FinishState::Safe;
                    self.flags = self.flags & Flags::LENIENT;

                    if self.upgrade {
                        self.state = State::Start;
                        self.error = Errno::PausedUpgrade;
                        self.reason = Cow::Borrowed("Pause on Upgrade");
                        self.error_pos = p;
                        tracing::debug!(pos = p, "stream upgraded");
                        return Err(Errno::PausedUpgrade);
                    }

                    self.state = if keep_alive { State::Start } else { State::Closed };
                }

                State::Closed => {
                    let Some(b) = byte else { break };
                    if b == b'\r' || b == b'\n' {
                        p += 1;
                    } else if self.is_lenient() {
                        self.state = State::Start;
                    } else {
                        return Err(self.latch(
                            Errno::ClosedConnection,
                            "Data after `Connection: close`",
                            p,
                        ));
                    }
                }
            }
        }

        // Hand over the part of a data token that reached the end of input.
        if let (Some(start), Some(event)) = (mark, self.state.span())
            && start < data.len()
        {
            self.flush_span(callbacks, event, &data[start..], data.len())?;
        }

        Ok(())
    }

    fn flush_span<C: Callbacks>(
        &mut self,
        callbacks: &mut C,
        event: Event,
        at: &[u8],
        pos: usize,
    ) -> Result<()> {
        let r = match event {
            Event::Url => callbacks.on_url(self, at),
            Event::Status => callbacks.on_status(self, at),
            Event::HeaderField => callbacks.on_header_field(self, at),
            Event::HeaderValue => callbacks.on_header_value(self, at),
            _ => {
                return Err(self.latch(
                    Errno::Internal,
                    "Data span open in a non-data state",
                    pos,
                ));
            }
        };
        self.check(r, event, pos)
    }

    /// Translate a callback result into engine control flow.
    fn check(&mut self, result: CallbackResult, event: Event, pos: usize) -> Result<()> {
        let errno = match result {
            Ok(()) | Err(Errno::Ok) => return Ok(()),
            Err(errno) => errno,
        };

        // Keep a reason the callback attached itself.
        if self.reason.is_empty() {
            self.reason = Cow::Borrowed(if errno == Errno::Paused {
                event.pause_reason()
            } else {
                event.error_reason()
            });
        }
        self.error = errno;
        self.error_pos = pos;
        tracing::debug!(
            errno = errno.name(),
            reason = %self.reason,
            pos,
            "callback stopped parser"
        );
        Err(errno)
    }

    fn begin_message(&mut self) {
        self.flags = self.flags & Flags::LENIENT;
        self.message_kind = self.kind;
        self.content_length = 0;
        self.method = None;
        self.status_code = 0;
        self.rtsp_major = 0;
        self.rtsp_minor = 0;
        self.upgrade = false;
        self.finish = FinishState::Unsafe;
        self.scratch = Scratch::default();
    }

    /// Accumulate the first token of a start line and decide between a
    /// request method and the `RTSP/` prefix of a status line.
    fn start_token(&mut self, b: u8, p: usize) -> Result<()> {
        let len = self.scratch.token_len;

        if b == b' ' && self.kind != Kind::Response {
            let Some(method) = Method::from_token(&self.scratch.token[..len]) else {
                return Err(self.latch(Errno::InvalidMethod, "Invalid method", p));
            };
            self.method = Some(method);
            self.message_kind = Kind::Request;
            self.state = State::UrlStart;
            return Ok(());
        }

        let response_ok = self.kind != Kind::Request
            && PROTOCOL.get(len) == Some(&b)
            && PROTOCOL.starts_with(&self.scratch.token[..len]);
        let method_ok = self.kind != Kind::Response
            && len < MAX_METHOD_LEN
            && (b.is_ascii_uppercase() || b == b'_');

        if !response_ok && !method_ok {
            return Err(if self.kind == Kind::Response {
                self.latch(Errno::InvalidConstant, "Expected RTSP/", p)
            } else {
                self.latch(Errno::InvalidMethod, "Invalid method", p)
            });
        }

        self.scratch.token[len] = b;
        self.scratch.token_len = len + 1;

        if response_ok && self.scratch.token_len == PROTOCOL.len() {
            self.message_kind = Kind::Response;
            self.state = State::VersionMajor;
        }
        Ok(())
    }

    fn after_header_section(&self) -> State {
        if self.flags.contains(Flags::TRAILING) {
            State::ChunkComplete
        } else {
            State::HeadersComplete
        }
    }

    fn begin_value(&mut self, header: Header, p: usize) -> Result<()> {
        self.scratch.header = header;
        self.scratch.item = ListItem::new(header.list_table());
        self.scratch.seen_digit = false;
        self.scratch.digits_done = false;

        match header {
            Header::ContentLength => {
                if self.flags.contains(Flags::CONTENT_LENGTH) {
                    return Err(self.latch(
                        Errno::UnexpectedContentLength,
                        "Duplicate Content-Length",
                        p,
                    ));
                }
                self.content_length = 0;
            }
            Header::TransferEncoding => {
                // Only the final coding of the last header decides.
                self.flags.insert(Flags::TRANSFER_ENCODING);
                self.flags.remove(Flags::CHUNKED);
                self.scratch.chunked_last = false;
            }
            Header::Upgrade => self.flags.insert(Flags::UPGRADE),
            Header::Connection | Header::General => {}
        }
        Ok(())
    }

    fn feed_value(&mut self, b: u8, p: usize) -> Result<()> {
        match self.scratch.header {
            Header::ContentLength => {
                if b.is_ascii_digit() && !self.scratch.digits_done {
                    let Some(length) = self
                        .content_length
                        .checked_mul(10)
                        .and_then(|length| length.checked_add(u64::from(b - b'0')))
                    else {
                        return Err(self.latch(
                            Errno::InvalidContentLength,
                            "Content-Length overflow",
                            p,
                        ));
                    };
                    self.content_length = length;
                    self.scratch.seen_digit = true;
                } else if token::is_ows(b) {
                    self.scratch.digits_done = true;
                } else {
                    return Err(self.latch(
                        Errno::InvalidContentLength,
                        "Invalid character in Content-Length",
                        p,
                    ));
                }
            }
            Header::TransferEncoding | Header::Connection => {
                if b == b',' {
                    self.complete_item();
                } else {
                    let table = self.scratch.header.list_table();
                    self.scratch.item.feed(table, b);
                }
            }
            Header::Upgrade | Header::General => {}
        }
        Ok(())
    }

    fn complete_item(&mut self) {
        let header = self.scratch.header;
        let table = header.list_table();
        let item = std::mem::replace(&mut self.scratch.item, ListItem::new(table));
        if item.matcher.is_empty() {
            return;
        }

        let token = item.matcher.matched(table).and_then(|i| table.get(i)).copied();
        match header {
            Header::TransferEncoding => self.scratch.chunked_last = token.is_some(),
            Header::Connection => match token {
                Some(b"close") => self.flags.insert(Flags::CONNECTION_CLOSE),
                Some(b"keep-alive") => self.flags.insert(Flags::CONNECTION_KEEP_ALIVE),
                Some(b"upgrade") => self.flags.insert(Flags::CONNECTION_UPGRADE),
                _ => {}
            },
            _ => {}
        }
    }

    fn end_value(&mut self, p: usize) -> Result<()> {
        match self.scratch.header {
            Header::ContentLength => {
                if !self.scratch.seen_digit {
                    return Err(self.latch(
                        Errno::InvalidContentLength,
                        "Empty Content-Length",
                        p,
                    ));
                }
                self.flags.insert(Flags::CONTENT_LENGTH);
                self.check_length_conflict(p)
            }
            Header::TransferEncoding => {
                self.complete_item();
                if self.scratch.chunked_last {
                    self.flags.insert(Flags::CHUNKED);
                }
                self.check_length_conflict(p)
            }
            Header::Connection => {
                self.complete_item();
                Ok(())
            }
            Header::Upgrade | Header::General => Ok(()),
        }
    }

    /// A request framed both ways is a smuggling vector; responses resolve
    /// it in favour of the transfer coding.
    fn check_length_conflict(&mut self, p: usize) -> Result<()> {
        if self.message_kind == Kind::Request
            && !self.is_lenient()
            && self
                .flags
                .contains(Flags::CONTENT_LENGTH | Flags::TRANSFER_ENCODING)
        {
            return Err(self.latch(
                Errno::UnexpectedContentLength,
                "Content-Length can't be present with Transfer-Encoding",
                p,
            ));
        }
        Ok(())
    }

    fn after_chunk_size(&mut self, b: u8, p: usize) -> Result<State> {
        match b {
            b';' => Ok(State::ChunkExtensions),
            b'\r' => Ok(State::ChunkSizeAlmostDone),
            b'\n' => Ok(State::ChunkHeader),
            _ => Err(self.latch(
                Errno::InvalidChunkSize,
                "Invalid character in chunk size",
                p,
            )),
        }
    }
}
