//! `str.*` builtins
//!
//! Indices count characters, not bytes. Null inputs yield null (or false /
//! -1 for predicates and searches) instead of failing.

use super::{arg, int_arg, str_arg, BuiltinInfo, NativeModule};
use crate::arrays::ArrayDef;
use crate::interp::{InterpResult, RuntimeError, Value};
use crate::types::DataType;
use crate::types::DataType::{Bool, Int, Json, String as Str};

pub(super) fn module() -> NativeModule {
    let s = |name: &str, ret: DataType| BuiltinInfo::new(name, Some(ret)).param("str", Str);
    NativeModule::new("str")
        .function(s("str.toString", Str), to_string)
        .function(s("str.toUpper", Str), to_upper)
        .function(s("str.toLower", Str), to_lower)
        .function(s("str.trim", Str), trim)
        .function(
            s("str.replace", Str).param("target", Str).param("replacement", Str),
            replace,
        )
        .function(
            BuiltinInfo::new("str.split", Some(DataType::Array))
                .param("text", Str)
                .param("separator", Str)
                .optional("limit", Int),
            split,
        )
        .function(
            BuiltinInfo::new("str.join", Some(Str))
                .param("items", Json)
                .param("delimiter", Str),
            join,
        )
        .function(s("str.contains", Bool).param("sub", Str), contains)
        .function(s("str.startsWith", Bool).param("prefix", Str), starts_with)
        .function(s("str.endsWith", Bool).param("suffix", Str), ends_with)
        .function(s("str.equalsIgnoreCase", Bool).param("other", Str), equals_ignore_case)
        .function(s("str.equals", Bool).param("other", Str), equals)
        .function(s("str.isEmpty", Bool), is_empty)
        .function(s("str.isBlank", Bool), is_blank)
        .function(
            s("str.substring", Str).param("beginIndex", Int).optional("endIndex", Int),
            substring,
        )
        .function(
            s("str.indexOf", Int).param("search", Str).optional("fromIndex", Int),
            index_of,
        )
        .function(
            s("str.lastIndexOf", Int).param("search", Str).optional("fromIndex", Int),
            last_index_of,
        )
        .function(s("str.charAt", Str).param("index", Int), char_at)
        .function(s("str.lpad", Str).param("length", Int).param("padChar", Str), lpad)
        .function(s("str.rpad", Str).param("length", Int).param("padChar", Str), rpad)
        .function(s("str.charArray", DataType::Array), char_array)
}

fn map_str(args: &[Value], f: impl FnOnce(&str) -> String) -> InterpResult<Value> {
    Ok(str_arg(args, 0).map_or(Value::Null, |s| Value::Str(f(s))))
}

fn to_string(args: &[Value]) -> InterpResult<Value> {
    Ok(match arg(args, 0) {
        Value::Null => Value::Null,
        other => Value::Str(other.to_string()),
    })
}

fn to_upper(args: &[Value]) -> InterpResult<Value> {
    map_str(args, str::to_uppercase)
}

fn to_lower(args: &[Value]) -> InterpResult<Value> {
    map_str(args, str::to_lowercase)
}

fn trim(args: &[Value]) -> InterpResult<Value> {
    map_str(args, |s| s.trim().to_string())
}

fn replace(args: &[Value]) -> InterpResult<Value> {
    match (str_arg(args, 0), str_arg(args, 1), str_arg(args, 2)) {
        (Some(s), Some(target), Some(rep)) => Ok(Value::Str(s.replace(target, rep))),
        _ => Ok(arg(args, 0).clone()),
    }
}

/// Literal separator. A positive limit caps the number of parts; zero drops
/// trailing empty parts; negative (the default) keeps everything.
fn split(args: &[Value]) -> InterpResult<Value> {
    let (Some(s), Some(sep)) = (str_arg(args, 0), str_arg(args, 1)) else {
        return Ok(Value::Null);
    };
    let limit = int_arg(args, 2).unwrap_or(-1);
    let mut parts: Vec<&str> = if sep.is_empty() {
        s.char_indices()
            .map(|(i, c)| &s[i..i + c.len_utf8()])
            .collect()
    } else if limit > 0 {
        s.splitn(limit as usize, sep).collect()
    } else {
        s.split(sep).collect()
    };
    if limit == 0 {
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
    }
    let items: Vec<Value> = parts.into_iter().map(Value::from).collect();
    let mut array = ArrayDef::fixed(Str, items.len());
    for (i, v) in items.into_iter().enumerate() {
        array.set(i, v)?;
    }
    Ok(Value::array(array))
}

fn join(args: &[Value]) -> InterpResult<Value> {
    let items = match arg(args, 0) {
        Value::Null => return Ok(Value::Null),
        Value::Array(a) => a.read().to_vec(),
        Value::Queue(q) => q.read().to_vec(),
        _ => {
            return Err(RuntimeError::type_mismatch(
                "str.join: first argument must be an array/list of strings",
            ))
        }
    };
    let Some(delim) = str_arg(args, 1) else {
        return Err(RuntimeError::null_access("str.join: delimiter cannot be null"));
    };
    let parts: Vec<String> = items
        .iter()
        .map(|v| if v.is_null() { String::new() } else { v.to_string() })
        .collect();
    Ok(Value::Str(parts.join(delim)))
}

fn test_pair(args: &[Value], f: impl FnOnce(&str, &str) -> bool) -> InterpResult<Value> {
    Ok(Value::Bool(match (str_arg(args, 0), str_arg(args, 1)) {
        (Some(a), Some(b)) => f(a, b),
        _ => false,
    }))
}

fn contains(args: &[Value]) -> InterpResult<Value> {
    test_pair(args, |s, sub| s.contains(sub))
}

fn starts_with(args: &[Value]) -> InterpResult<Value> {
    test_pair(args, |s, p| s.starts_with(p))
}

fn ends_with(args: &[Value]) -> InterpResult<Value> {
    test_pair(args, |s, p| s.ends_with(p))
}

/// Two nulls are equal
fn equals_ignore_case(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Bool(match (str_arg(args, 0), str_arg(args, 1)) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        (None, None) => true,
        _ => false,
    }))
}

fn equals(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Bool(str_arg(args, 0) == str_arg(args, 1)))
}

fn is_empty(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Bool(str_arg(args, 0).is_some_and(str::is_empty)))
}

fn is_blank(args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Bool(str_arg(args, 0).is_none_or(|s| s.trim().is_empty())))
}

fn substring(args: &[Value]) -> InterpResult<Value> {
    let Some(s) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let begin = int_arg(args, 1)
        .ok_or_else(|| RuntimeError::null_access("str.substring: beginIndex cannot be null"))?;
    let end = int_arg(args, 2).unwrap_or(len);
    if begin < 0 || end > len || begin > end {
        return Err(RuntimeError::index_out_of_bounds(format!(
            "str.substring: begin {begin}, end {end}, length {len}"
        )));
    }
    Ok(Value::Str(chars[begin as usize..end as usize].iter().collect()))
}

/// Character offset of a byte offset
fn char_pos(s: &str, byte: usize) -> i64 {
    s[..byte].chars().count() as i64
}

/// Byte offset of a character offset, clamped to the string
fn byte_pos(s: &str, chars: i64) -> usize {
    if chars <= 0 {
        return 0;
    }
    s.char_indices()
        .nth(chars as usize)
        .map_or(s.len(), |(i, _)| i)
}

fn index_of(args: &[Value]) -> InterpResult<Value> {
    let (Some(s), Some(search)) = (str_arg(args, 0), str_arg(args, 1)) else {
        return Ok(Value::Int(-1));
    };
    let from = byte_pos(s, int_arg(args, 2).unwrap_or(0));
    let found = s[from..].find(search).map_or(-1, |i| char_pos(s, from + i));
    Ok(Value::Int(found as i32))
}

/// Last match starting at or before `fromIndex`
fn last_index_of(args: &[Value]) -> InterpResult<Value> {
    let (Some(s), Some(search)) = (str_arg(args, 0), str_arg(args, 1)) else {
        return Ok(Value::Int(-1));
    };
    let found = match int_arg(args, 2) {
        None => s.rfind(search),
        Some(from) if from < 0 => None,
        Some(from) => {
            let limit = (byte_pos(s, from) + search.len()).min(s.len());
            let limit = (0..=limit).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
            s[..limit].rfind(search)
        }
    };
    Ok(Value::Int(found.map_or(-1, |i| char_pos(s, i)) as i32))
}

fn char_at(args: &[Value]) -> InterpResult<Value> {
    let Some(s) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let index = int_arg(args, 1)
        .ok_or_else(|| RuntimeError::null_access("str.charAt: index cannot be null"))?;
    let len = s.chars().count();
    usize::try_from(index)
        .ok()
        .and_then(|i| s.chars().nth(i))
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| {
            RuntimeError::index_out_of_bounds(format!(
                "str.charAt: index {index} out of bounds for length {len}"
            ))
        })
}

fn pad(args: &[Value], func: &str, left: bool) -> InterpResult<Value> {
    let Some(s) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let length = int_arg(args, 1)
        .ok_or_else(|| RuntimeError::null_access(format!("{func}: length cannot be null")))?;
    let pad_char = match str_arg(args, 2) {
        None | Some("") => {
            return Err(RuntimeError::null_access(format!(
                "{func}: padChar cannot be null or empty"
            )))
        }
        Some(p) => {
            let mut chars = p.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(RuntimeError::invalid(format!(
                        "{func}: padChar must be a single character"
                    )))
                }
            }
        }
    };
    let current = s.chars().count() as i64;
    if current >= length {
        return Ok(Value::Str(s.to_string()));
    }
    let padding: String = std::iter::repeat_n(pad_char, (length - current) as usize).collect();
    Ok(Value::Str(if left {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }))
}

fn lpad(args: &[Value]) -> InterpResult<Value> {
    pad(args, "str.lpad", true)
}

fn rpad(args: &[Value]) -> InterpResult<Value> {
    pad(args, "str.rpad", false)
}

/// Fixed int array of code points
fn char_array(args: &[Value]) -> InterpResult<Value> {
    let Some(s) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let codes: Vec<Value> = s.chars().map(|c| Value::Int(c as i32)).collect();
    let mut array = ArrayDef::fixed(Int, codes.len());
    for (i, v) in codes.into_iter().enumerate() {
        array.set(i, v)?;
    }
    Ok(Value::array(array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(to_upper(&[s("abc")]).unwrap(), s("ABC"));
        assert_eq!(to_lower(&[s("AbC")]).unwrap(), s("abc"));
        assert_eq!(trim(&[s("  x ")]).unwrap(), s("x"));
        assert_eq!(trim(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_split_and_join() {
        let parts = split(&[s("a,b,,"), s(","), Value::Null]).unwrap();
        assert_eq!(parts.to_string(), r#"["a", "b", "", ""]"#);
        let parts = split(&[s("a,b,,"), s(","), Value::Int(0)]).unwrap();
        assert_eq!(parts.to_string(), r#"["a", "b"]"#);
        let parts = split(&[s("a,b,c"), s(","), Value::Int(2)]).unwrap();
        assert_eq!(parts.to_string(), r#"["a", "b,c"]"#);

        let joined = join(&[parts, s("|")]).unwrap();
        assert_eq!(joined, s("a|b,c"));
        let err = join(&[Value::Int(1), s("|")]).unwrap_err();
        assert_eq!(err.message, "str.join: first argument must be an array/list of strings");
    }

    #[test]
    fn test_predicates_tolerate_null() {
        assert_eq!(contains(&[s("hello"), s("ell")]).unwrap(), Value::Bool(true));
        assert_eq!(contains(&[Value::Null, s("x")]).unwrap(), Value::Bool(false));
        assert_eq!(starts_with(&[s("hello"), s("he")]).unwrap(), Value::Bool(true));
        assert_eq!(ends_with(&[s("hello"), s("lo")]).unwrap(), Value::Bool(true));
        assert_eq!(equals(&[Value::Null, Value::Null]).unwrap(), Value::Bool(true));
        assert_eq!(equals_ignore_case(&[s("ABC"), s("abc")]).unwrap(), Value::Bool(true));
        assert_eq!(is_empty(&[Value::Null]).unwrap(), Value::Bool(false));
        assert_eq!(is_blank(&[s("  ")]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_substring_and_search() {
        assert_eq!(substring(&[s("héllo"), Value::Int(1), Value::Int(3)]).unwrap(), s("él"));
        assert_eq!(substring(&[s("hello"), Value::Int(2), Value::Null]).unwrap(), s("llo"));
        let err = substring(&[s("abc"), Value::Int(2), Value::Int(5)]).unwrap_err();
        assert_eq!(err.message, "str.substring: begin 2, end 5, length 3");

        assert_eq!(index_of(&[s("abcabc"), s("c"), Value::Null]).unwrap(), Value::Int(2));
        assert_eq!(index_of(&[s("abcabc"), s("c"), Value::Int(3)]).unwrap(), Value::Int(5));
        assert_eq!(last_index_of(&[s("abcabc"), s("a"), Value::Null]).unwrap(), Value::Int(3));
        assert_eq!(last_index_of(&[s("abcabc"), s("a"), Value::Int(2)]).unwrap(), Value::Int(0));
        assert_eq!(index_of(&[Value::Null, s("a"), Value::Null]).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_char_at() {
        assert_eq!(char_at(&[s("abc"), Value::Int(1)]).unwrap(), s("b"));
        let err = char_at(&[s("abc"), Value::Int(3)]).unwrap_err();
        assert_eq!(err.message, "str.charAt: index 3 out of bounds for length 3");
    }

    #[test]
    fn test_padding() {
        assert_eq!(lpad(&[s("7"), Value::Int(3), s("0")]).unwrap(), s("007"));
        assert_eq!(rpad(&[s("ab"), Value::Int(4), s(".")]).unwrap(), s("ab.."));
        assert_eq!(lpad(&[s("long"), Value::Int(2), s("0")]).unwrap(), s("long"));
        let err = lpad(&[s("x"), Value::Int(3), s("ab")]).unwrap_err();
        assert_eq!(err.message, "str.lpad: padChar must be a single character");
    }

    #[test]
    fn test_char_array() {
        let codes = char_array(&[s("AB")]).unwrap();
        assert_eq!(codes.to_string(), "[65, 66]");
    }
}
