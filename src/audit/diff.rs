//! Field diffs for audit entries

use serde_json::Value;

/// Summarize top-level field changes between two JSON snapshots
///
/// Returns None when nothing changed. Timestamps are ignored since every
/// write bumps them.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    const IGNORED: [&str; 2] = ["updated_at", "created_at"];

    let changes: Vec<String> = match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            let mut changes = Vec::new();
            for (key, old_val) in old.iter().filter(|(k, _)| !IGNORED.contains(&k.as_str())) {
                match new.get(key) {
                    Some(new_val) if new_val != old_val => changes.push(format!(
                        "{}: {} -> {}",
                        key,
                        format_value(old_val),
                        format_value(new_val)
                    )),
                    Some(_) => {}
                    None => changes.push(format!("{}: {} -> (removed)", key, format_value(old_val))),
                }
            }
            for (key, new_val) in new.iter().filter(|(k, _)| !IGNORED.contains(&k.as_str())) {
                if !old.contains_key(key) {
                    changes.push(format!("{}: (added) -> {}", key, format_value(new_val)));
                }
            }
            changes
        }
        _ if before != after => vec![format!("{} -> {}", format_value(before), format_value(after))],
        _ => Vec::new(),
    };

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.chars().count() > 50 => {
            let head: String = s.chars().take(47).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_field_only() {
        let before = json!({"name": "מזון", "monthly_budget": 150000});
        let after = json!({"name": "מזון", "monthly_budget": 180000});
        assert_eq!(
            generate_diff(&before, &after).as_deref(),
            Some("monthly_budget: 150000 -> 180000")
        );
    }

    #[test]
    fn test_timestamps_ignored() {
        let before = json!({"name": "a", "updated_at": "2025-01-01T00:00:00Z"});
        let after = json!({"name": "a", "updated_at": "2025-02-01T00:00:00Z"});
        assert!(generate_diff(&before, &after).is_none());
    }

    #[test]
    fn test_added_and_removed() {
        let before = json!({"reference": "123"});
        let after = json!({"tags": ["חופשה"]});
        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("reference: \"123\" -> (removed)"));
        assert!(diff.contains("tags: (added) -> [1 items]"));
    }

    #[test]
    fn test_long_hebrew_string_truncated_on_char_boundary() {
        let before = json!({"notes": "ש".repeat(80)});
        let after = json!({"notes": "קצר"});
        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("...\""));
    }

    #[test]
    fn test_scalar_values() {
        assert_eq!(generate_diff(&json!(1), &json!(2)).as_deref(), Some("1 -> 2"));
        assert!(generate_diff(&json!(1), &json!(1)).is_none());
    }
}
