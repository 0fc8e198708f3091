//! Positional `%`-verb substitution for log format strings.
//!
//! Log formats are configuration, not Rust source, so `format!` cannot be
//! used. This is a small printf: `%s`, `%d`, `%v`, `%f` and `%%`, with an
//! optional `-` or `0` flag, a width, and a `.precision`.
//!
//! Verbs are lenient about their argument's type: `%d` of a string prints the
//! string, so an unresolved token (`"?"`) never costs the whole line. What
//! does fail is arity: a verb with no argument left, arguments no verb
//! consumed, an unknown verb, or a trailing `%`. So does a width or
//! precision above one million.

use std::fmt;

/// Largest accepted width or precision.
const MAX_WIDTH: usize = 1_000_000;

/// A resolved token, ready to be substituted into a format string.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for TokenValue {
    fn from(s: &str) -> Self { Self::Str(s.to_owned()) }
}

impl From<String> for TokenValue {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// A log format that does not fit its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The verb at byte `offset` has no argument left to consume.
    Missing { offset: usize },
    /// `given` arguments were supplied but the format consumes only `used`.
    Extra { used: usize, given: usize },
    /// `%` at byte `offset` is followed by an unsupported verb.
    UnknownVerb { offset: usize, verb: char },
    /// The format ends in the middle of a `%` directive.
    Truncated,
    /// The directive at byte `offset` asks for a width or precision above
    /// one million.
    TooWide { offset: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { offset } => write!(f, "missing argument for verb at byte {offset}"),
            Self::Extra { used, given } => {
                write!(f, "{given} arguments given but the format uses {used}")
            }
            Self::UnknownVerb { offset, verb } => {
                write!(f, "unknown verb `%{verb}` at byte {offset}")
            }
            Self::Truncated => f.write_str("format ends inside a `%` directive"),
            Self::TooWide { offset } => {
                write!(f, "width or precision at byte {offset} exceeds {MAX_WIDTH}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

#[derive(Default)]
struct Spec {
    left: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
}

/// Substitutes `args` into `format`, in order.
pub fn sprintf(format: &str, args: &[TokenValue]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(format.len() + args.len() * 8);
    let mut args = args.iter();
    let mut used = 0;
    let mut chars = format.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&(_, flag @ ('-' | '0'))) = chars.peek() {
            if flag == '-' { spec.left = true } else { spec.zero = true }
            chars.next();
        }
        spec.width = digits(&mut chars, offset)?.unwrap_or(0);
        if chars.next_if(|&(_, c)| c == '.').is_some() {
            spec.precision = Some(digits(&mut chars, offset)?.unwrap_or(0));
        }

        let verb = match chars.next() {
            Some((_, verb)) => verb,
            None => return Err(FormatError::Truncated),
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        if !matches!(verb, 's' | 'v' | 'd' | 'f') {
            return Err(FormatError::UnknownVerb { offset, verb });
        }

        let arg = args.next().ok_or(FormatError::Missing { offset })?;
        used += 1;
        pad(&mut out, &render(verb, &spec, arg), &spec, !matches!(arg, TokenValue::Str(_)));
    }

    match args.len() {
        0 => Ok(out),
        rest => Err(FormatError::Extra { used, given: used + rest }),
    }
}

fn digits<I>(chars: &mut std::iter::Peekable<I>, offset: usize) -> Result<Option<usize>, FormatError>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut n = None;
    while let Some((_, d)) = chars.next_if(|(_, c)| c.is_ascii_digit()) {
        let d = d.to_digit(10).unwrap_or(0) as usize;
        let next = n.unwrap_or(0usize)
            .checked_mul(10)
            .and_then(|n| n.checked_add(d))
            .filter(|&n| n <= MAX_WIDTH)
            .ok_or(FormatError::TooWide { offset })?;
        n = Some(next);
    }
    Ok(n)
}

fn render(verb: char, spec: &Spec, arg: &TokenValue) -> String {
    match (verb, arg) {
        ('f', TokenValue::Float(x)) => format!("{:.*}", spec.precision.unwrap_or(6), x),
        ('f', TokenValue::Int(n)) => format!("{:.*}", spec.precision.unwrap_or(6), *n as f64),
        ('d', TokenValue::Float(x)) => (x.trunc() as i64).to_string(),
        ('s' | 'v', TokenValue::Str(v)) => match spec.precision {
            Some(p) => v.chars().take(p).collect(),
            None => v.clone(),
        },
        (_, arg) => arg.to_string(),
    }
}

fn pad(out: &mut String, body: &str, spec: &Spec, numeric: bool) {
    let fill = spec.width.saturating_sub(body.chars().count());
    if fill == 0 {
        out.push_str(body);
    } else if spec.left {
        out.push_str(body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if spec.zero && numeric {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", body),
        };
        out.push_str(sign);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(body);
    }
}
