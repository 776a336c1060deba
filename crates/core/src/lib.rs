//! Incremental, callback-driven RTSP message parser.
//!
//! Feed bytes in fragments of any size with [`Parser::execute`]; the parser
//! reports start lines, headers, body data and message boundaries through a
//! [`Callbacks`] implementation without buffering the message.

pub mod error;
pub mod parser;
pub mod protocol;

pub use error::{Errno, Result};
pub use parser::{
    BodyMode, CallbackResult, Callbacks, FinishState, Flags, Handle, HeadersAction, Kind, Parser,
};
pub use protocol::Method;
