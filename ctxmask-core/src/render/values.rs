//! SQL literal formatting and row layout.

use crate::config::RenderConfig;
use crate::snapshot::stringify;
use serde_json::Value;

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Formats one value as an SQL literal.
///
/// Lists become quoted array literals (`'{"a", "b"}'`), objects become
/// quoted JSON, and strings are single-quoted with embedded quotes doubled.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| format!("\"{}\"", stringify(Some(item)).replace('\'', "''")))
                .collect();
            format!("'{{{}}}'", items.join(", "))
        }
        Value::Object(_) => quote(&value.to_string()),
    }
}

/// Single-line tuple.
pub(crate) fn format_row(values: &[String]) -> String {
    format!("({})", values.join(", "))
}

/// Multi-line tuple for wide rows.
///
/// Values pack onto one line until the line budget is hit. From the
/// vertical-start column on, every value gets its own line, and any value
/// with an embedded newline always does.
pub(crate) fn format_row_pretty(values: &[String], config: &RenderConfig) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::from("  ");
    let last = values.len().saturating_sub(1);

    let flush = |lines: &mut Vec<String>, current: &str| {
        if !current.trim().is_empty() {
            lines.push(current.trim_end().to_string());
        }
    };

    for (i, value) in values.iter().enumerate() {
        let suffix = if i == last { "" } else { ", " };

        if value.contains('\n') {
            flush(&mut lines, &current);
            current = String::from("  ");
            lines.push(format!("  {}{}", value.replace("    ", "  "), suffix.trim_end()));
            continue;
        }

        if i >= config.vertical_start {
            flush(&mut lines, &current);
            current = String::new();
            lines.push(format!("  {}{}", value, suffix.trim_end()));
            continue;
        }

        let width = current
            .chars()
            .count()
            .saturating_add(value.chars().count());
        if width > config.line_budget {
            flush(&mut lines, &current);
            current = format!("  {}{}", value, suffix);
        } else {
            current.push_str(value);
            current.push_str(suffix);
        }
    }
    flush(&mut lines, &current);

    format!("(\n{}\n)", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_scalars() {
        assert_eq!(format_value(&Value::Null), "null");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(1.5)), "1.5");
        assert_eq!(format_value(&json!("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn test_format_list_and_object() {
        assert_eq!(
            format_value(&json!(["PARAM_1", null, "it's"])),
            r#"'{"PARAM_1", "it''s"}'"#
        );
        assert_eq!(format_value(&json!([])), "'{}'");
        assert_eq!(
            format_value(&json!({"note": "it's"})),
            r#"'{"note":"it''s"}'"#
        );
    }

    #[test]
    fn test_format_row_compact() {
        let values = vec!["'a'".to_string(), "null".to_string(), "3".to_string()];
        assert_eq!(format_row(&values), "('a', null, 3)");
    }

    #[test]
    fn test_pretty_row_vertical_after_start_column() {
        let values: Vec<String> = (0..7).map(|i| format!("'v{}'", i)).collect();
        let rendered = format_row_pretty(&values, &RenderConfig::default());
        assert_eq!(
            rendered,
            "(\n  'v0', 'v1', 'v2', 'v3', 'v4',\n  'v5',\n  'v6'\n)"
        );
    }

    #[test]
    fn test_pretty_row_multiline_value_on_own_line() {
        let values = vec![
            "'a'".to_string(),
            "'line1\n    line2'".to_string(),
            "'b'".to_string(),
        ];
        let rendered = format_row_pretty(&values, &RenderConfig::default());
        assert_eq!(rendered, "(\n  'a',\n  'line1\n  line2',\n  'b'\n)");
    }

    #[test]
    fn test_pretty_row_line_budget() {
        let config = RenderConfig::default().with_line_budget(12);
        let values = vec!["'aaaa'".to_string(), "'bbbb'".to_string(), "'cccc'".to_string()];
        let rendered = format_row_pretty(&values, &config);
        assert_eq!(rendered, "(\n  'aaaa',\n  'bbbb',\n  'cccc'\n)");
    }
}
