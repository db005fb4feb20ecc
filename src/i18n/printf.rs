//! printf-style substitution for translated strings.
//!
//! Translation values carry their own placeholders (`"Welcome %s"`,
//! `"%d items"`, `"%.1f%% done"`). [`sprintf`] fills them from a list of
//! [`FormatArg`]s.
//!
//! ## Supported syntax
//!
//! `%[flags][width][.precision]verb` with flags `-`, `+`, `0`, space and `#`.
//!
//! | Verb | Meaning |
//! |------|---------|
//! | `%s` `%v` | natural form of any argument |
//! | `%d` | base-10 integer |
//! | `%b` `%o` `%x` `%X` | base 2, 8, 16 integers (`%x` on strings hex-encodes bytes) |
//! | `%c` | character for a code point |
//! | `%f` `%e` `%g` | floats (`%g` picks the shortest form) |
//! | `%t` | boolean |
//! | `%q` | double-quoted, escaped string |
//! | `%%` | literal percent, consumes no argument |
//!
//! Mismatches never fail; they are rendered inline so a broken translation
//! shows up in the page instead of aborting the build:
//!
//! ```text
//! sprintf("%s and %s", ["a"])   →  "a and %!s(MISSING)"
//! sprintf("%d", ["abc"])        →  "%!d(string=abc)"
//! sprintf("hi", ["x"])          →  "hi%!(EXTRA string=x)"
//! ```

use std::fmt::{self, Write};

/// One substitution argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FormatArg {
    fn type_name(&self) -> &'static str {
        match self {
            FormatArg::Str(_) => "string",
            FormatArg::Int(_) => "int",
            FormatArg::Float(_) => "float64",
            FormatArg::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for FormatArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatArg::Str(s) => f.write_str(s),
            FormatArg::Int(n) => write!(f, "{n}"),
            FormatArg::Float(x) => f.write_str(&format_general(*x, None, false)),
            FormatArg::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FormatArg {
    fn from(s: &str) -> Self {
        FormatArg::Str(s.to_string())
    }
}

impl From<String> for FormatArg {
    fn from(s: String) -> Self {
        FormatArg::Str(s)
    }
}

impl From<&String> for FormatArg {
    fn from(s: &String) -> Self {
        FormatArg::Str(s.clone())
    }
}

impl From<bool> for FormatArg {
    fn from(b: bool) -> Self {
        FormatArg::Bool(b)
    }
}

impl From<f64> for FormatArg {
    fn from(x: f64) -> Self {
        FormatArg::Float(x)
    }
}

impl From<f32> for FormatArg {
    fn from(x: f32) -> Self {
        FormatArg::Float(f64::from(x))
    }
}

macro_rules! int_args {
    ($($t:ty),*) => {
        $(impl From<$t> for FormatArg {
            fn from(n: $t) -> Self {
                FormatArg::Int(i64::from(n))
            }
        })*
    };
}

int_args!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for FormatArg {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or_else(|_| FormatArg::Float(n as f64), FormatArg::Int)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    minus: bool,
    plus: bool,
    zero: bool,
    space: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Substitute `args` into `pattern`.
///
/// With no arguments the pattern is returned untouched: percent signs are
/// not interpreted at all.
pub fn sprintf(pattern: &str, args: &[FormatArg]) -> String {
    if args.is_empty() {
        return pattern.to_string();
    }

    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                ' ' => spec.space = true,
                '#' => spec.sharp = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = read_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_number(&mut chars).unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        let bad = if spec.width.is_some_and(too_large) {
            Some("%!(BADWIDTH)")
        } else if spec.precision.is_some_and(too_large) {
            Some("%!(BADPREC)")
        } else {
            None
        };
        if let Some(marker) = bad {
            out.push_str(marker);
            next_arg = (next_arg + 1).min(args.len());
            continue;
        }

        match args.get(next_arg) {
            Some(arg) => {
                next_arg += 1;
                format_one(&mut out, verb, spec, arg);
            }
            None => {
                let _ = write!(out, "%!{verb}(MISSING)");
            }
        }
    }

    if next_arg < args.len() {
        out.push_str("%!(EXTRA ");
        for (i, arg) in args[next_arg..].iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={arg}", arg.type_name());
        }
        out.push(')');
    }
    out
}

/// Widths and precisions above this are rejected instead of padded out.
const MAX_WIDTH: usize = 1_000_000;

fn too_large(n: usize) -> bool {
    n > MAX_WIDTH
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    value
}

fn format_one(out: &mut String, verb: char, spec: Spec, arg: &FormatArg) {
    let body = match (verb, arg) {
        ('s' | 'v', FormatArg::Str(s)) => truncate(s, spec.precision),
        ('s' | 'v', FormatArg::Float(x)) => format_general(*x, spec.precision, spec.sharp),
        ('s' | 'v', other) => other.to_string(),
        ('q', FormatArg::Str(s)) => format!("{s:?}"),
        ('d', FormatArg::Int(n)) => signed(n.to_string(), *n < 0, spec),
        ('b', FormatArg::Int(n)) => radix(*n, 2, "0b", spec),
        ('o', FormatArg::Int(n)) => radix(*n, 8, "0", spec),
        ('x', FormatArg::Int(n)) => radix(*n, 16, "0x", spec),
        ('X', FormatArg::Int(n)) => radix(*n, 16, "0X", spec).to_uppercase(),
        ('x', FormatArg::Str(s)) => s.bytes().map(|b| format!("{b:02x}")).collect(),
        ('X', FormatArg::Str(s)) => s.bytes().map(|b| format!("{b:02X}")).collect(),
        ('c', FormatArg::Int(n)) => u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string(),
        ('f' | 'F', FormatArg::Float(x)) => {
            let digits = format!("{:.*}", spec.precision.unwrap_or(6), x.abs());
            signed(digits, x.is_sign_negative(), spec)
        }
        ('e' | 'E', FormatArg::Float(x)) => {
            let digits = format_exp(x.abs(), spec.precision.unwrap_or(6));
            let digits = if verb == 'E' { digits.to_uppercase() } else { digits };
            signed(digits, x.is_sign_negative(), spec)
        }
        ('g' | 'G', FormatArg::Float(x)) => {
            let digits = format_general(x.abs(), spec.precision, spec.sharp);
            let digits = if verb == 'G' { digits.to_uppercase() } else { digits };
            signed(digits, x.is_sign_negative(), spec)
        }
        ('t', FormatArg::Bool(b)) => b.to_string(),
        (verb, arg) => {
            let _ = write!(out, "%!{verb}({}={arg})", arg.type_name());
            return;
        }
    };
    pad(out, &body, spec, matches!(arg, FormatArg::Int(_) | FormatArg::Float(_)));
}

fn truncate(s: &str, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    }
}

/// Attach a sign to an unsigned digit string according to the flags.
fn signed(digits: String, negative: bool, spec: Spec) -> String {
    let digits = digits.trim_start_matches('-');
    if negative {
        format!("-{digits}")
    } else if spec.plus {
        format!("+{digits}")
    } else if spec.space {
        format!(" {digits}")
    } else {
        digits.to_string()
    }
}

fn radix(n: i64, base: u32, prefix: &str, spec: Spec) -> String {
    let magnitude = n.unsigned_abs();
    let digits = match base {
        2 => format!("{magnitude:b}"),
        8 => format!("{magnitude:o}"),
        _ => format!("{magnitude:x}"),
    };
    let digits = if spec.sharp {
        format!("{prefix}{digits}")
    } else {
        digits
    };
    signed(digits, n < 0, spec)
}

fn format_exp(x: f64, precision: usize) -> String {
    // Rust renders `1.5e3`; printf wants `1.500000e+03`.
    let raw = format!("{:.*e}", precision, x);
    let Some((mantissa, exp)) = raw.split_once('e') else {
        return raw;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
}

/// `%g`: shortest representation, exponent form for very large or small values.
fn format_general(x: f64, precision: Option<usize>, keep_zeros: bool) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let exp = x.abs().log10().floor() as i32;
    match precision {
        None if (-4..21).contains(&exp) => format!("{x}"),
        None => format_exp(x, 15)
            .split_once('e')
            .map(|(m, e)| format!("{}e{e}", strip_zeros(m)))
            .unwrap_or_default(),
        Some(p) => {
            let p = p.max(1);
            let formatted = if exp < -4 || exp >= p as i32 {
                format_exp(x, p - 1)
            } else {
                let decimals = usize::try_from(p as i32 - 1 - exp).unwrap_or(0);
                format!("{x:.decimals$}")
            };
            if keep_zeros {
                formatted
            } else if let Some((m, e)) = formatted.split_once('e') {
                format!("{}e{e}", strip_zeros(m))
            } else {
                strip_zeros(&formatted).to_string()
            }
        }
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn pad(out: &mut String, body: &str, spec: Spec, numeric: bool) {
    let len = body.chars().count();
    let fill = spec.width.map_or(0, |w| w.saturating_sub(len));
    if fill == 0 {
        out.push_str(body);
    } else if spec.minus {
        out.push_str(body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if spec.zero && numeric {
        // Zeros go between the sign and the digits.
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (Some(c), &body[1..]),
            _ => (None, body),
        };
        out.extend(sign);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(body);
    }
}
