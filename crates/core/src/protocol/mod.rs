//! RTSP wire vocabulary (RFC 2326, RFC 7826).
//!
//! RTSP messages follow HTTP/1.1 syntax with their own method set and
//! protocol name:
//!
//! ```text
//! DESCRIBE rtsp://server/stream RTSP/1.0\r\n
//! CSeq: 2\r\n
//! Accept: application/sdp\r\n
//! \r\n
//! ```
//!
//! ```text
//! RTSP/1.0 200 OK\r\n
//! CSeq: 2\r\n
//! Content-Type: application/sdp\r\n
//! Content-Length: 142\r\n
//! \r\n
//! v=0\r\n...
//! ```

pub mod method;
pub mod token;

pub use method::{MAX_METHOD_LEN, Method};
