//! Log tokens and their resolution against a finished (or in-flight) request.

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use http::Version;

use super::LogOptions;
use super::printf::TokenValue;
use crate::middleware::status::StatusWriter;
use crate::request::Request;
use crate::writer::{ResponseWriter, find_layer};

/// What an unresolvable token renders as.
pub const UNKNOWN: &str = "?";

/// A named placeholder in a log format.
///
/// Built-in names map to fixed variants. `req[Name]` and `res[Name]` select a
/// request or response header. Anything else is looked up among the custom
/// tokens of [`LogOptions`] when the line is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `http-version`: `major.minor` of the request protocol.
    HttpVersion,
    /// `response-time`: seconds since the request entered the logger.
    ResponseTime,
    /// `remote-addr`: the peer IP, without the port. Register a custom token
    /// reading [`Request::remote_addr`] to log `ip:port`.
    RemoteAddr,
    /// `date`: the current time in the configured [`DateFormat`](super::DateFormat).
    Date,
    Method,
    /// `url`: path and query of the request target. Scheme and authority of
    /// an absolute-form target (as HTTP/2 requests carry) are left out.
    Url,
    /// `referrer` or `referer`.
    Referrer,
    UserAgent,
    /// `status`: the captured status code, `0` if none yet.
    Status,
    RequestHeader(Cow<'static, str>),
    /// Only headers present in the writer chain's header map are visible;
    /// anything the transport adds after the handler returns is not.
    ResponseHeader(Cow<'static, str>),
    Custom(String),
}

impl Token {
    /// Parses a token name. Never fails: unknown names become [`Token::Custom`].
    pub fn parse(name: &str) -> Self {
        match name {
            "http-version" => Self::HttpVersion,
            "response-time" => Self::ResponseTime,
            "remote-addr" => Self::RemoteAddr,
            "date" => Self::Date,
            "method" => Self::Method,
            "url" => Self::Url,
            "referrer" | "referer" => Self::Referrer,
            "user-agent" => Self::UserAgent,
            "status" => Self::Status,
            _ => header_token(name).unwrap_or_else(|| Self::Custom(name.to_owned())),
        }
    }

    pub(crate) fn resolve(&self, ctx: &RequestContext<'_>) -> TokenValue {
        let req = ctx.request;
        match self {
            Self::HttpVersion => http_version(req.version()).into(),
            Self::ResponseTime => TokenValue::Float(ctx.elapsed.as_secs_f64()),
            Self::RemoteAddr => req.remote_addr().ip().to_string().into(),
            Self::Date => ctx.options.date_format.render(&ctx.now).into(),
            Self::Method => req.method().as_str().into(),
            Self::Url => match req.uri().path_and_query() {
                Some(target) => target.as_str().into(),
                None => req.uri().to_string().into(),
            },
            Self::Referrer => req.referrer().into(),
            Self::UserAgent => req.user_agent().into(),
            Self::Status => {
                let status = find_layer::<StatusWriter>(ctx.writer).and_then(StatusWriter::status);
                TokenValue::Int(status.map_or(0, |s| i64::from(s.as_u16())))
            }
            Self::RequestHeader(name) => req.header(name).unwrap_or("").into(),
            Self::ResponseHeader(name) => ctx.writer.headers()
                .get(&**name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .into(),
            Self::Custom(name) => match ctx.options.custom.get(name) {
                Some(f) => f(ctx.writer, req).into(),
                None => UNKNOWN.into(),
            },
        }
    }
}

/// Matches `req[Name]` / `res[Name]`; the name is non-empty and has no `]`.
fn header_token(name: &str) -> Option<Token> {
    let (side, rest) = name.split_at_checked(3)?;
    let header = rest.strip_prefix('[')?.strip_suffix(']')?;
    if header.is_empty() || header.contains(']') {
        return None;
    }
    let header = Cow::Owned(header.to_owned());
    match side {
        "req" => Some(Token::RequestHeader(header)),
        "res" => Some(Token::ResponseHeader(header)),
        _ => None,
    }
}

fn http_version(version: Version) -> &'static str {
    const VERSIONS: [(Version, &str); 5] = [
        (Version::HTTP_09, "0.9"),
        (Version::HTTP_10, "1.0"),
        (Version::HTTP_11, "1.1"),
        (Version::HTTP_2, "2.0"),
        (Version::HTTP_3, "3.0"),
    ];
    VERSIONS.iter()
        .find(|(v, _)| *v == version)
        .map_or(UNKNOWN, |(_, s)| *s)
}

impl FromStr for Token {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpVersion => f.write_str("http-version"),
            Self::ResponseTime => f.write_str("response-time"),
            Self::RemoteAddr => f.write_str("remote-addr"),
            Self::Date => f.write_str("date"),
            Self::Method => f.write_str("method"),
            Self::Url => f.write_str("url"),
            Self::Referrer => f.write_str("referrer"),
            Self::UserAgent => f.write_str("user-agent"),
            Self::Status => f.write_str("status"),
            Self::RequestHeader(name) => write!(f, "req[{name}]"),
            Self::ResponseHeader(name) => write!(f, "res[{name}]"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Everything a token may read: the request, the writer chain head, and the
/// timing captured when the line is emitted.
pub(crate) struct RequestContext<'a> {
    pub(crate) writer: &'a dyn ResponseWriter,
    pub(crate) request: &'a Request,
    pub(crate) options: &'a LogOptions,
    pub(crate) elapsed: Duration,
    pub(crate) now: DateTime<FixedOffset>,
}
