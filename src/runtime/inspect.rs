//! REPL-style rendering of values: `{ foo: 1, bar: 'x' }`.

use std::fmt::Write;

use crate::runtime::value::{Value, format_number};

/// Nested objects deeper than this print as `[Object]`.
const MAX_DEPTH: usize = 2;

pub fn inspect(value: &Value) -> String {
    let mut out = String::new();
    let mut stack = Vec::new();
    write_value(&mut out, value, 0, &mut stack);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize, stack: &mut Vec<usize>) {
    match value {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) if *n == 0.0 && n.is_sign_negative() => out.push_str("-0"),
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Function(function) => match function.name() {
            Some(name) => {
                let _ = write!(out, "[Function: {name}]");
            }
            None => out.push_str("[Function (anonymous)]"),
        },
        Value::Object(object) => {
            let id = object.id();
            if stack.contains(&id) {
                out.push_str("[Circular]");
                return;
            }
            if depth > MAX_DEPTH {
                out.push_str("[Object]");
                return;
            }
            let entries = object.own_entries();
            if entries.is_empty() {
                out.push_str("{}");
                return;
            }
            stack.push(id);
            out.push_str("{ ");
            for (index, (key, field)) in entries.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_key(out, key);
                out.push_str(": ");
                write_value(out, field, depth + 1, stack);
            }
            out.push_str(" }");
            stack.pop();
        }
    }
}

fn write_key(out: &mut String, key: &str) {
    if is_identifier(key) {
        out.push_str(key);
    } else {
        out.push_str(&quote(key));
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for ch in text.chars() {
        match ch {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}
