use serde_json::Value;

/// Returns the first value at the end of the path as a non-empty string.
///
/// Strings are returned as-is and numbers are rendered in decimal. Empty
/// strings, zero, `false`, `null`, objects and arrays count as absent.
pub fn json_path_str(json: &Value, path: &[&str]) -> Option<String> {
    navigate_json_path(json, path)
        .into_iter()
        .next()
        .and_then(truthy_scalar)
}

fn truthy_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Navigates through a JSON structure using a path array
/// Returns all matching values at the end of the path
/// Supports "[*]" for array iteration and "0", "1", ... for array indexing
pub fn navigate_json_path<'a>(current: &'a Value, path: &[&str]) -> Vec<&'a Value> {
    let Some((segment, remaining_path)) = path.split_first() else {
        return vec![current];
    };

    match (*segment, current) {
        ("[*]", Value::Array(items)) => items
            .iter()
            .flat_map(|item| navigate_json_path(item, remaining_path))
            .collect(),
        ("[*]", _) => vec![],
        (index, Value::Array(items)) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map(|item| navigate_json_path(item, remaining_path))
            .unwrap_or_default(),
        (field_name, _) => current
            .get(field_name)
            .map(|field_value| navigate_json_path(field_value, remaining_path))
            .unwrap_or_default(),
    }
}
