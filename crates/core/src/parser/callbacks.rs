use crate::error::Errno;

use super::Handle;

/// Result returned by every callback except [`Callbacks::on_headers_complete`].
///
/// `Ok(())` continues, `Err(Errno::Paused)` suspends parsing until
/// [`Parser::resume`](super::Parser::resume), and any other error aborts
/// parsing and is returned from `execute` unchanged.
pub type CallbackResult = Result<(), Errno>;

/// How parsing continues once the header section has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadersAction {
    /// Pick the body framing from the headers.
    #[default]
    Proceed,
    /// Treat the message as bodyless (e.g. a response to a request that
    /// never carries a body) and continue with the next message.
    SkipBody,
    /// Treat the message as bodyless and make `execute` return
    /// [`Errno::PausedUpgrade`] once it completes.
    Upgrade,
}

/// Parser event sink.
///
/// Every method defaults to a no-op that continues parsing. Data callbacks
/// receive a slice of the fragment passed to `execute`; it is only valid for
/// the duration of the call, and a single token (URL, header value, body...)
/// may be delivered in several pieces when it straddles fragment boundaries.
///
/// Callbacks get the parser [`Handle`] so they can inspect the message
/// (method, status, `content_length` during `on_chunk_header`...) and attach
/// a reason with [`Handle::set_error_reason`] before returning an error.
#[allow(unused_variables)]
pub trait Callbacks {
    fn on_message_begin(&mut self, parser: &mut Handle) -> CallbackResult {
        Ok(())
    }

    /// Request target, possibly in several pieces.
    fn on_url(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        Ok(())
    }

    /// Response reason phrase, possibly in several pieces.
    fn on_status(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        Ok(())
    }

    fn on_header_field(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        Ok(())
    }

    fn on_header_value(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        Ok(())
    }

    /// Called once the blank line ending the header section is seen.
    ///
    /// The upgrade decision is already visible via [`Handle::upgrade`].
    fn on_headers_complete(&mut self, parser: &mut Handle) -> Result<HeadersAction, Errno> {
        Ok(HeadersAction::Proceed)
    }

    fn on_body(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        Ok(())
    }

    fn on_message_complete(&mut self, parser: &mut Handle) -> CallbackResult {
        Ok(())
    }

    /// Start of a chunk; [`Handle::content_length`] holds its size.
    fn on_chunk_header(&mut self, parser: &mut Handle) -> CallbackResult {
        Ok(())
    }

    fn on_chunk_complete(&mut self, parser: &mut Handle) -> CallbackResult {
        Ok(())
    }
}

/// Parse without observing any events.
impl Callbacks for () {}

impl<C: Callbacks + ?Sized> Callbacks for &mut C {
    fn on_message_begin(&mut self, parser: &mut Handle) -> CallbackResult {
        (**self).on_message_begin(parser)
    }

    fn on_url(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        (**self).on_url(parser, at)
    }

    fn on_status(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        (**self).on_status(parser, at)
    }

    fn on_header_field(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        (**self).on_header_field(parser, at)
    }

    fn on_header_value(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        (**self).on_header_value(parser, at)
    }

    fn on_headers_complete(&mut self, parser: &mut Handle) -> Result<HeadersAction, Errno> {
        (**self).on_headers_complete(parser)
    }

    fn on_body(&mut self, parser: &mut Handle, at: &[u8]) -> CallbackResult {
        (**self).on_body(parser, at)
    }

    fn on_message_complete(&mut self, parser: &mut Handle) -> CallbackResult {
        (**self).on_message_complete(parser)
    }

    fn on_chunk_header(&mut self, parser: &mut Handle) -> CallbackResult {
        (**self).on_chunk_header(parser)
    }

    fn on_chunk_complete(&mut self, parser: &mut Handle) -> CallbackResult {
        (**self).on_chunk_complete(parser)
    }
}
