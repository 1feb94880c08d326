//! Template rendering for registry entries.
//!
//! Placeholders:
//!
//! | placeholder  | value                                           |
//! |--------------|-------------------------------------------------|
//! | `{0}`, `{1}` | positional argument                             |
//! | `{args}`     | every argument, space separated                 |
//! | `{key}`      | value of an argument written `key=value`        |
//! | `{input}`    | output text of the piped input (`>`)            |
//! | `{previous}` | output text of the previous result (`→`)        |
//!
//! Values are single-quoted for `sh`. A placeholder with no value renders as
//! nothing. Text in braces that is not a placeholder name stays as written.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::interpreter::Context;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_-]*|[0-9]+)\}").expect("placeholder regex is valid")
});

/// Render `template` against the command's arguments and context.
pub fn render(template: &str, args: &[String], ctx: &Context) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match lookup(name, args, ctx) {
                Some(Value::One(value)) => shell_quote(&value),
                Some(Value::Many(values)) => values
                    .iter()
                    .map(|v| shell_quote(v))
                    .collect::<Vec<_>>()
                    .join(" "),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

enum Value {
    One(String),
    Many(Vec<String>),
}

/// `None` means "not a placeholder"; a known placeholder without a value is
/// an empty string.
fn lookup(name: &str, args: &[String], ctx: &Context) -> Option<Value> {
    if let Ok(index) = name.parse::<usize>() {
        return Some(Value::One(args.get(index).cloned().unwrap_or_default()));
    }
    match name {
        "args" => Some(Value::Many(args.to_vec())),
        "input" => Some(Value::One(
            ctx.input().map(|o| o.output_text()).unwrap_or_default(),
        )),
        "previous" => Some(Value::One(
            ctx.previous_result()
                .map(|o| o.output_text())
                .unwrap_or_default(),
        )),
        key => keyword(key, args).map(Value::One),
    }
}

fn keyword(key: &str, args: &[String]) -> Option<String> {
    args.iter().find_map(|arg| {
        arg.split_once('=')
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
}

/// Quote `value` for POSIX `sh`.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
