//! Recording callbacks shared by the integration suites.

#![allow(dead_code)]

use rtsp_parser::{CallbackResult, Callbacks, Errno, Handle, HeadersAction, Kind, Parser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MessageBegin,
    Url(Vec<u8>),
    Status(Vec<u8>),
    HeaderField(Vec<u8>),
    HeaderValue(Vec<u8>),
    HeadersComplete,
    Body(Vec<u8>),
    MessageComplete,
    ChunkHeader(u64),
    ChunkComplete,
}

/// Records every event, merging the pieces of a data token split across
/// fragments so that recordings compare equal however the input was cut.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub headers_action: HeadersAction,
    /// Return `Paused` from the next `on_headers_complete`.
    pub pause_on_headers: bool,
    /// Return `Paused` from the next `on_url`.
    pub pause_on_url: bool,
    /// Return `Paused` from the next `on_header_value`.
    pub pause_on_value: bool,
    /// Return `Paused` from the next `on_body`.
    pub pause_on_body: bool,
    /// Fail `on_body` with this code.
    pub fail_body: Option<Errno>,
    /// `should_keep_alive` as observed inside each `on_message_complete`.
    pub keep_alive: Vec<bool>,
}

impl Recorder {
    fn data(&mut self, event: fn(Vec<u8>) -> Event, at: &[u8]) {
        let merged = match (self.events.last_mut(), event(Vec::new())) {
            (Some(Event::Url(buf)), Event::Url(_))
            | (Some(Event::Status(buf)), Event::Status(_))
            | (Some(Event::HeaderField(buf)), Event::HeaderField(_))
            | (Some(Event::HeaderValue(buf)), Event::HeaderValue(_))
            | (Some(Event::Body(buf)), Event::Body(_)) => {
                buf.extend_from_slice(at);
                true
            }
            _ => false,
        };
        if !merged {
            self.events.push(event(at.to_vec()));
        }
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events.iter().filter(|event| *event == wanted).count()
    }

    pub fn body(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Body(data) => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }
}

impl Callbacks for Recorder {
    fn on_message_begin(&mut self, _: &mut Handle) -> CallbackResult {
        self.events.push(Event::MessageBegin);
        Ok(())
    }

    fn on_url(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        self.data(Event::Url, at);
        pause_once(&mut self.pause_on_url)
    }

    fn on_status(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        self.data(Event::Status, at);
        Ok(())
    }

    fn on_header_field(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        self.data(Event::HeaderField, at);
        Ok(())
    }

    fn on_header_value(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        self.data(Event::HeaderValue, at);
        pause_once(&mut self.pause_on_value)
    }

    fn on_headers_complete(&mut self, _: &mut Handle) -> Result<HeadersAction, Errno> {
        self.events.push(Event::HeadersComplete);
        if std::mem::take(&mut self.pause_on_headers) {
            return Err(Errno::Paused);
        }
        Ok(self.headers_action)
    }

    fn on_body(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        if let Some(errno) = self.fail_body {
            return Err(errno);
        }
        self.data(Event::Body, at);
        pause_once(&mut self.pause_on_body)
    }

    fn on_message_complete(&mut self, parser: &mut Handle) -> CallbackResult {
        self.events.push(Event::MessageComplete);
        self.keep_alive.push(parser.should_keep_alive());
        Ok(())
    }

    fn on_chunk_header(&mut self, parser: &mut Handle) -> CallbackResult {
        self.events.push(Event::ChunkHeader(parser.content_length()));
        Ok(())
    }

    fn on_chunk_complete(&mut self, _: &mut Handle) -> CallbackResult {
        self.events.push(Event::ChunkComplete);
        Ok(())
    }
}

fn pause_once(armed: &mut bool) -> CallbackResult {
    if std::mem::take(armed) {
        Err(Errno::Paused)
    } else {
        Ok(())
    }
}

pub fn parser(kind: Kind) -> Parser<Recorder> {
    Parser::new(kind, Recorder::default())
}

pub fn field(name: &str) -> Event {
    Event::HeaderField(name.as_bytes().to_vec())
}

pub fn value(value: &str) -> Event {
    Event::HeaderValue(value.as_bytes().to_vec())
}
