/// RTSP request method (RFC 2326 §10, RFC 7826 §13).
///
/// `GET` and `POST` are included for RTSP-over-HTTP tunnelling, where the
/// control channel is carried inside a pair of HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Describe = 0,
    Announce = 1,
    GetParameter = 2,
    Options = 3,
    Pause = 4,
    Play = 5,
    /// RTSP/2.0 server-to-client notification (RFC 7826 §13.5).
    PlayNotify = 6,
    Record = 7,
    Redirect = 8,
    Setup = 9,
    SetParameter = 10,
    Teardown = 11,
    Get = 12,
    Post = 13,
}

/// Longest method token, used to size the start-line scratch buffer.
pub const MAX_METHOD_LEN: usize = 13;

impl Method {
    pub const ALL: [Method; 14] = [
        Method::Describe,
        Method::Announce,
        Method::GetParameter,
        Method::Options,
        Method::Pause,
        Method::Play,
        Method::PlayNotify,
        Method::Record,
        Method::Redirect,
        Method::Setup,
        Method::SetParameter,
        Method::Teardown,
        Method::Get,
        Method::Post,
    ];

    /// Wire spelling of the method.
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Describe => "DESCRIBE",
            Method::Announce => "ANNOUNCE",
            Method::GetParameter => "GET_PARAMETER",
            Method::Options => "OPTIONS",
            Method::Pause => "PAUSE",
            Method::Play => "PLAY",
            Method::PlayNotify => "PLAY_NOTIFY",
            Method::Record => "RECORD",
            Method::Redirect => "REDIRECT",
            Method::Setup => "SETUP",
            Method::SetParameter => "SET_PARAMETER",
            Method::Teardown => "TEARDOWN",
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    /// Look up a method by its exact (case-sensitive) token, per RFC 2326 §6.1.
    pub fn from_token(token: &[u8]) -> Option<Method> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str().as_bytes() == token)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
