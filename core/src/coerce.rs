//! String-to-primitive coercion.
//!
//! Query strings and form posts deliver every scalar as a string. When a
//! schema declares a number or boolean, the raw string is converted before
//! the type check runs. Strings that do not parse stay strings and fail the
//! type check afterwards.

use serde_json::{Number, Value};

use crate::{Kind, flag_is_set};

/// Converts `raw` to the primitive its declared `type_name` asks for.
///
/// A type enum that admits strings is left alone; otherwise numbers take
/// precedence over booleans. Returns `None` when no conversion applies.
pub(crate) fn coerce(raw: &str, type_name: &str) -> Option<Value> {
    if Kind::String.is_member_of(type_name) {
        return None;
    }
    if Kind::Number.is_member_of(type_name) {
        return coerce_number(raw);
    }
    if Kind::Boolean.is_member_of(type_name) {
        return Some(Value::Bool(flag_is_set(raw)));
    }
    None
}

/// Parses `raw` both as a float and as an integer prefix. The float wins
/// only when its magnitude is strictly greater, so `"12.5"` stays `12.5`,
/// `"12"` is the integer `12`, and `"1e2"` is `100`.
fn coerce_number(raw: &str) -> Option<Value> {
    let float = parse_float_prefix(raw);
    let int = parse_int_prefix(raw);

    let parsed = if float.abs() > int.abs() { float } else { int };
    if parsed == 0.0 || parsed.is_nan() {
        // A zero parse is indistinguishable from a failed one unless the
        // literal is exactly "0".
        return (raw == "0").then(|| Value::from(0));
    }
    number_value(parsed)
}

/// JSON number for `n`, as an integer when it is integral.
fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Longest leading decimal float literal, after leading whitespace.
/// `NaN` when there is none.
fn parse_float_prefix(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Longest leading integer, after leading whitespace and an optional sign.
/// A `0x`/`0X` prefix switches to base 16. `NaN` when there is none.
fn parse_int_prefix(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let sign = match bytes.first() {
        Some(b'-') => -1.0,
        _ => 1.0,
    };
    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let rest = &s[start..];

    let (digits, radix) = match rest.get(..2) {
        Some("0x" | "0X") => (&rest[2..], 16),
        _ => (rest, 10),
    };
    let len = digits.chars().take_while(|c| c.is_digit(radix)).count();
    if len == 0 {
        return f64::NAN;
    }
    let magnitude = digits[..len]
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    sign * magnitude
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
