//! String operators.

use crate::result::Computed;
use crate::value::Value;

use Computed::{Complete, Incomplete};

/// `Length`: character count of a string, or member count of a collection.
pub(crate) fn length(v: &Value) -> Computed<Value> {
    let len = match v {
        Value::Str(s) => s.chars().count(),
        Value::Collection(c) => c.len(),
        _ => return Incomplete,
    };
    i32::try_from(len).map_or(Incomplete, |n| Complete(Value::Int(n)))
}

/// `Paste`: canonical renderings of the parts, joined by `separator`.
pub(crate) fn paste(parts: &[&Value], separator: &str) -> Computed<Value> {
    let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
    Complete(Value::Str(rendered.join(separator)))
}

/// `AsString`: the canonical rendering.
pub(crate) fn as_string(v: &Value) -> Computed<Value> {
    Complete(Value::Str(v.to_string()))
}

/// `AsDecimalString`: dollars rendered with a decimal point, e.g. `550.00`.
pub(crate) fn as_decimal_string(v: &Value) -> Computed<Value> {
    match v {
        Value::Dollar(d) => Complete(Value::Str(d.to_string())),
        _ => Incomplete,
    }
}

/// `Trim`: strips surrounding whitespace.
pub(crate) fn trim(v: &Value) -> Computed<Value> {
    match v {
        Value::Str(s) => Complete(Value::Str(s.trim().to_string())),
        _ => Incomplete,
    }
}

/// `ToUpper`: uppercases.
pub(crate) fn to_upper(v: &Value) -> Computed<Value> {
    match v {
        Value::Str(s) => Complete(Value::Str(s.to_uppercase())),
        _ => Incomplete,
    }
}

/// `StripChars`: removes every character of `chars` from `value`.
pub(crate) fn strip_chars(value: &Value, chars: &Value) -> Computed<Value> {
    match (value, chars) {
        (Value::Str(s), Value::Str(drop)) => Complete(Value::Str(
            s.chars().filter(|c| !drop.contains(*c)).collect(),
        )),
        _ => Incomplete,
    }
}

/// Name-control length accepted on an electronically filed return.
const MEF_NAME_LIMIT: usize = 35;

/// `TruncateNameForMeF`: uppercases, keeps only the characters the MeF
/// name-line schema accepts (`A–Z`, digits, space, hyphen, ampersand),
/// collapses runs of spaces, and truncates to 35 characters.
pub(crate) fn truncate_name_for_mef(v: &Value) -> Computed<Value> {
    let Value::Str(s) = v else {
        return Incomplete;
    };
    let upper = s.to_uppercase();
    let mut cleaned = String::with_capacity(upper.len());
    let mut last_space = true;
    for c in upper.chars() {
        let keep = c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '&');
        if keep {
            cleaned.push(c);
            last_space = false;
        } else if c.is_whitespace() && !last_space {
            cleaned.push(' ');
            last_space = true;
        }
    }
    let trimmed = cleaned.trim_end();
    Complete(Value::Str(trimmed.chars().take(MEF_NAME_LIMIT).collect()))
}
