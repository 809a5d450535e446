//! String and regex functions.
//!
//! Indices are byte offsets into the UTF-8 encoding and not-found is -1,
//! matching the semantics streaming scripts already rely on.

use ecow::EcoString;

use crate::functions::{FuncError, Funcs, Stateless, expect_len, int_arg, regex_arg, string_arg};
use crate::values::Value;

fn str_contains(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let substr = string_arg(name, args, 1)?;
    Ok(Value::Bool(s.contains(substr.as_str())))
}

fn str_contains_any(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let chars = string_arg(name, args, 1)?;
    Ok(Value::Bool(chars.chars().any(|c| s.contains(c))))
}

fn str_count(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let sep = string_arg(name, args, 1)?;
    // An empty separator counts the gaps around every character.
    let count = if sep.is_empty() {
        s.chars().count() + 1
    } else {
        s.matches(sep.as_str()).count()
    };
    Ok(Value::Int(count as i64))
}

fn str_has_prefix(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let prefix = string_arg(name, args, 1)?;
    Ok(Value::Bool(s.starts_with(prefix.as_str())))
}

fn str_has_suffix(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let suffix = string_arg(name, args, 1)?;
    Ok(Value::Bool(s.ends_with(suffix.as_str())))
}

fn str_index(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let substr = string_arg(name, args, 1)?;
    Ok(Value::Int(
        s.find(substr.as_str()).map_or(-1, |i| i as i64),
    ))
}

fn str_index_any(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let chars = string_arg(name, args, 1)?;
    let index = s
        .char_indices()
        .find(|(_, c)| chars.contains(*c))
        .map_or(-1, |(i, _)| i as i64);
    Ok(Value::Int(index))
}

fn str_last_index(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let substr = string_arg(name, args, 1)?;
    Ok(Value::Int(
        s.rfind(substr.as_str()).map_or(-1, |i| i as i64),
    ))
}

fn str_last_index_any(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let chars = string_arg(name, args, 1)?;
    let index = s
        .char_indices()
        .rev()
        .find(|(_, c)| chars.contains(*c))
        .map_or(-1, |(i, _)| i as i64);
    Ok(Value::Int(index))
}

fn str_length(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let s = string_arg(name, args, 0)?;
    Ok(Value::Int(s.len() as i64))
}

fn str_replace(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 4)?;
    let s = string_arg(name, args, 0)?;
    let old = string_arg(name, args, 1)?;
    let new = string_arg(name, args, 2)?;
    let n = int_arg(name, args, 3)?;
    // Negative n replaces every occurrence.
    let replaced = if n < 0 {
        s.replace(old.as_str(), new.as_str())
    } else {
        s.replacen(old.as_str(), new.as_str(), n as usize)
    };
    Ok(Value::String(EcoString::from(replaced)))
}

fn str_substring(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 3)?;
    let s = string_arg(name, args, 0)?;
    let start = int_arg(name, args, 1)?;
    let stop = int_arg(name, args, 2)?;
    if start < 0 || stop < start || stop as usize > s.len() {
        return Err(FuncError::Message(format!(
            "invalid substring range {start}:{stop} for string of length {}",
            s.len(),
        )));
    }
    let slice = s.get(start as usize..stop as usize).ok_or_else(|| {
        FuncError::Message(format!(
            "substring range {start}:{stop} splits a multi-byte character",
        ))
    })?;
    Ok(Value::String(EcoString::from(slice)))
}

fn str_to_lower(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let s = string_arg(name, args, 0)?;
    Ok(Value::String(EcoString::from(s.to_lowercase())))
}

fn str_to_upper(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let s = string_arg(name, args, 0)?;
    Ok(Value::String(EcoString::from(s.to_uppercase())))
}

fn str_trim(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let cutset = string_arg(name, args, 1)?;
    Ok(Value::String(EcoString::from(
        s.trim_matches(|c| cutset.contains(c)),
    )))
}

fn str_trim_left(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let cutset = string_arg(name, args, 1)?;
    Ok(Value::String(EcoString::from(
        s.trim_start_matches(|c| cutset.contains(c)),
    )))
}

fn str_trim_right(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let cutset = string_arg(name, args, 1)?;
    Ok(Value::String(EcoString::from(
        s.trim_end_matches(|c| cutset.contains(c)),
    )))
}

fn str_trim_prefix(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let prefix = string_arg(name, args, 1)?;
    Ok(Value::String(EcoString::from(
        s.strip_prefix(prefix.as_str()).unwrap_or(s.as_str()),
    )))
}

fn str_trim_suffix(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 2)?;
    let s = string_arg(name, args, 0)?;
    let suffix = string_arg(name, args, 1)?;
    Ok(Value::String(EcoString::from(
        s.strip_suffix(suffix.as_str()).unwrap_or(s.as_str()),
    )))
}

fn str_trim_space(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let s = string_arg(name, args, 0)?;
    Ok(Value::String(EcoString::from(s.trim())))
}

/// `regexReplace(regex, src, replacement)` with `$1`/`$name` group expansion
/// in the replacement.
fn regex_replace(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 3)?;
    let pattern = regex_arg(name, args, 0)?;
    let src = string_arg(name, args, 1)?;
    let replacement = string_arg(name, args, 2)?;
    Ok(Value::String(EcoString::from(
        pattern
            .replace_all(src.as_str(), replacement.as_str())
            .as_ref(),
    )))
}

pub(super) fn register(funcs: &mut Funcs) {
    let functions: [(&'static str, super::StatelessFn); 21] = [
        ("strContains", str_contains),
        ("strContainsAny", str_contains_any),
        ("strCount", str_count),
        ("strHasPrefix", str_has_prefix),
        ("strHasSuffix", str_has_suffix),
        ("strIndex", str_index),
        ("strIndexAny", str_index_any),
        ("strLastIndex", str_last_index),
        ("strLastIndexAny", str_last_index_any),
        ("strLength", str_length),
        ("strReplace", str_replace),
        ("strSubstring", str_substring),
        ("strToLower", str_to_lower),
        ("strToUpper", str_to_upper),
        ("strTrim", str_trim),
        ("strTrimLeft", str_trim_left),
        ("strTrimPrefix", str_trim_prefix),
        ("strTrimRight", str_trim_right),
        ("strTrimSpace", str_trim_space),
        ("strTrimSuffix", str_trim_suffix),
        ("regexReplace", regex_replace),
    ];
    for (name, f) in functions {
        funcs.insert(name, Box::new(Stateless { name, f }));
    }
}
