//! Log line formats and timestamp rendering.

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, SecondsFormat};

use super::printf::{FormatError, TokenValue, sprintf};
use super::token::{RequestContext, Token, UNKNOWN};
use crate::error::Error;

const CONTENT_LENGTH: Token = Token::ResponseHeader(Cow::Borrowed("Content-Length"));

static DEFAULT_TOKENS: [Token; 9] = [
    Token::RemoteAddr,
    Token::Date,
    Token::Method,
    Token::Url,
    Token::HttpVersion,
    Token::Status,
    CONTENT_LENGTH,
    Token::Referrer,
    Token::UserAgent,
];

static SHORT_TOKENS: [Token; 7] = [
    Token::RemoteAddr,
    Token::Method,
    Token::Url,
    Token::HttpVersion,
    Token::Status,
    CONTENT_LENGTH,
    Token::ResponseTime,
];

static TINY_TOKENS: [Token; 5] = [
    Token::Method,
    Token::Url,
    Token::Status,
    CONTENT_LENGTH,
    Token::ResponseTime,
];

/// Which log line to write.
///
/// The three predefined formats carry their own token order. A literal format
/// is a printf-style string rendered with the tokens configured through
/// [`LogOptions::tokens`](super::LogOptions::tokens).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Apache combined:
    /// `remote-addr - - [date] "method url HTTP/http-version" status res[Content-Length] "referrer" "user-agent"`
    #[default]
    Default,
    /// `remote-addr - method url HTTP/http-version status res[Content-Length] - response-time s`
    Short,
    /// `method url status res[Content-Length] - response-time s`
    Tiny,
    Literal(String),
}

impl Format {
    pub const DEFAULT_NAME: &'static str = "_default_";
    pub const SHORT_NAME: &'static str = "_short_";
    pub const TINY_NAME: &'static str = "_tiny_";

    /// Selects a predefined format by name; any other string is literal.
    pub fn parse(s: &str) -> Self {
        match s {
            Self::DEFAULT_NAME => Self::Default,
            Self::SHORT_NAME => Self::Short,
            Self::TINY_NAME => Self::Tiny,
            _ => Self::Literal(s.to_owned()),
        }
    }

    /// The format string and token order to render with. Literal formats use
    /// the caller's `tokens`; predefined ones carry their own.
    fn template<'a>(&'a self, tokens: &'a [Token]) -> (&'a str, &'a [Token]) {
        match self {
            Self::Default => (r#"%s - - [%s] "%s %s HTTP/%s" %d %s "%s" "%s""#, &DEFAULT_TOKENS[..]),
            Self::Short => ("%s - %s %s HTTP/%s %d %s - %.3f s", &SHORT_TOKENS[..]),
            Self::Tiny => ("%s %s %d %s - %.3f s", &TINY_TOKENS[..]),
            Self::Literal(format) => (format.as_str(), tokens),
        }
    }
}

impl From<&str> for Format {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// How the `date` token renders the current time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DateFormat {
    /// RFC 3339 with whole seconds, `Z` for UTC: `2024-01-01T00:00:00Z`.
    #[default]
    Rfc3339,
    /// A chrono `strftime` pattern, validated by [`DateFormat::pattern`].
    Pattern(String),
}

impl DateFormat {
    /// A `strftime` pattern such as `"%d/%b/%Y:%H:%M:%S %z"`.
    pub fn pattern(pattern: impl Into<String>) -> Result<Self, Error> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(Error::DateFormat(pattern));
        }
        Ok(Self::Pattern(pattern))
    }

    pub(crate) fn render(&self, now: &DateTime<FixedOffset>) -> String {
        match self {
            Self::Rfc3339 => now.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::Pattern(pattern) => {
                let mut out = String::new();
                match write!(out, "{}", now.format(pattern)) {
                    Ok(()) => out,
                    Err(_) => UNKNOWN.to_owned(),
                }
            }
        }
    }
}

/// Resolves every token of the active format, in order, and substitutes them.
pub(crate) fn render(ctx: &RequestContext<'_>) -> Result<String, FormatError> {
    let (format, tokens) = ctx.options.format.template(&ctx.options.tokens);
    let args: Vec<TokenValue> = tokens.iter().map(|token| token.resolve(ctx)).collect();
    sprintf(format, &args)
}
