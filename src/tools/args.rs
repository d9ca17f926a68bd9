//! Typed accessors over loosely typed model arguments.
//!
//! Small models are sloppy with JSON types, so numbers and booleans are
//! also accepted in their string spellings (`"120"`, `"true"`).

use super::traits::ToolError;
use crate::types::Arguments;
use serde_json::Value;

pub fn required_str<'a>(args: &'a Arguments, name: &'static str) -> Result<&'a str, ToolError> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(Value::Null) | None => Err(ToolError::MissingArgument(name)),
        Some(_) => Err(ToolError::InvalidArgument {
            name,
            expected: "a string",
        }),
    }
}

/// Like [`required_str`] but an empty string counts as missing.
pub fn required_non_empty<'a>(
    args: &'a Arguments,
    name: &'static str,
) -> Result<&'a str, ToolError> {
    let value = required_str(args, name)?;
    if value.trim().is_empty() {
        Err(ToolError::MissingArgument(name))
    } else {
        Ok(value)
    }
}

pub fn optional_str<'a>(args: &'a Arguments, name: &'static str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub fn optional_u64(
    args: &Arguments,
    name: &'static str,
    default: u64,
) -> Result<u64, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or(ToolError::InvalidArgument {
                name,
                expected: "a non-negative integer",
            }),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| ToolError::InvalidArgument {
            name,
            expected: "a non-negative integer",
        }),
        Some(_) => Err(ToolError::InvalidArgument {
            name,
            expected: "a non-negative integer",
        }),
    }
}

pub fn optional_bool(args: &Arguments, name: &'static str) -> Result<bool, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            _ => Err(ToolError::InvalidArgument {
                name,
                expected: "a boolean",
            }),
        },
        Some(_) => Err(ToolError::InvalidArgument {
            name,
            expected: "a boolean",
        }),
    }
}
