//! Substitution of `{}` placeholders in message templates.
//!
//! Formatting never fails: surplus arguments are ignored and placeholders without an
//! argument are kept verbatim. `\{}` renders a literal `{}`, and `\\{}` renders a
//! single backslash followed by the substituted argument.

use std::fmt::Write as _;

use crate::Value;

const DELIMITER: &str = "{}";

/// Substitutes `arguments` into the placeholders of `template`.
#[must_use]
pub fn format_message(template: &str, arguments: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut arguments = arguments.iter();

    while let Some(pos) = rest.find(DELIMITER) {
        let (head, tail) = rest.split_at(pos);
        let escaped = head.ends_with('\\');
        let double_escaped = escaped && head[..head.len() - 1].ends_with('\\');

        if escaped && !double_escaped {
            out.push_str(&head[..head.len() - 1]);
            out.push_str(DELIMITER);
            rest = &tail[DELIMITER.len()..];
            continue;
        }

        let Some(argument) = arguments.next() else {
            break;
        };
        if double_escaped {
            out.push_str(&head[..head.len() - 1]);
        } else {
            out.push_str(head);
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{argument}");
        rest = &tail[DELIMITER.len()..];
    }

    out.push_str(rest);
    out
}
