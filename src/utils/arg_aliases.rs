use serde_json::{Map, Value};

#[derive(Default)]
struct NormalizationState {
    renamed: Vec<Value>,
    converted: Vec<Value>,
    ignored: Vec<Value>,
}

/// `(alias, canonical)` pairs applied to top-level tool arguments.
const TOP_LEVEL_ALIASES: &[(&str, &str)] = &[
    ("timeoutSeconds", "timeout"),
    ("timeout_seconds", "timeout"),
    ("timeout_s", "timeout"),
    ("includeHeaders", "include_headers"),
    ("with_headers", "include_headers"),
];

/// `(alias, canonical)` pairs for the fields of one request.
const REQUEST_ALIASES: &[(&str, &str)] = &[
    ("query", "params"),
    ("queryParams", "params"),
    ("data", "body"),
    ("json", "body"),
    ("uri", "url"),
];

const MS_ALIASES: &[&str] = &["timeout_ms", "timeoutMs"];

fn rename_key(
    map: &mut Map<String, Value>,
    from_key: &str,
    to_key: &str,
    path: &str,
    state: &mut NormalizationState,
) {
    if !map.contains_key(from_key) {
        return;
    }
    if map.contains_key(to_key) {
        map.remove(from_key);
        state.ignored.push(serde_json::json!({
            "from": format!("{}{}", path, from_key),
            "to": format!("{}{}", path, to_key),
            "reason": "canonical_already_set",
        }));
        return;
    }
    if let Some(value) = map.remove(from_key) {
        map.insert(to_key.to_string(), value);
        state.renamed.push(serde_json::json!({
            "from": format!("{}{}", path, from_key),
            "to": format!("{}{}", path, to_key),
        }));
    }
}

fn convert_ms_to_seconds(
    map: &mut Map<String, Value>,
    from_key: &str,
    state: &mut NormalizationState,
) {
    if !map.contains_key(from_key) {
        return;
    }
    if map.contains_key("timeout") {
        map.remove(from_key);
        state.ignored.push(serde_json::json!({
            "from": from_key,
            "to": "timeout",
            "reason": "canonical_already_set",
        }));
        return;
    }
    let raw = map.remove(from_key).unwrap_or(Value::Null);
    let millis = match &raw {
        Value::Number(num) => num.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite());
    let converted = millis
        .and_then(|ms| serde_json::Number::from_f64(ms / 1000.0))
        .map(Value::Number)
        .unwrap_or(raw);
    map.insert("timeout".to_string(), converted);
    state.converted.push(serde_json::json!({
        "from": from_key,
        "to": "timeout",
        "op": "ms_to_seconds",
        "factor": 0.001,
    }));
}

fn normalize_method(map: &mut Map<String, Value>, path: &str, state: &mut NormalizationState) {
    let Some(Value::String(raw)) = map.get("method") else {
        return;
    };
    let normalized = raw.trim().to_uppercase();
    if &normalized == raw {
        return;
    }
    state.converted.push(serde_json::json!({
        "from": format!("{}method", path),
        "op": "uppercase",
        "value": normalized,
    }));
    map.insert("method".to_string(), Value::String(normalized));
}

fn normalize_request_fields(
    map: &mut Map<String, Value>,
    path: &str,
    state: &mut NormalizationState,
) {
    for (alias, canonical) in REQUEST_ALIASES {
        rename_key(map, alias, canonical, path, state);
    }
    normalize_method(map, path, state);
}

fn compact_state(state: NormalizationState) -> Option<Value> {
    let mut out = Map::new();
    if !state.renamed.is_empty() {
        out.insert("renamed".to_string(), Value::Array(state.renamed));
    }
    if !state.converted.is_empty() {
        out.insert("converted".to_string(), Value::Array(state.converted));
    }
    if !state.ignored.is_empty() {
        out.insert("ignored".to_string(), Value::Array(state.ignored));
    }
    if out.is_empty() {
        None
    } else {
        Some(Value::Object(out))
    }
}

/// Rewrites alternate argument spellings to their canonical names.
///
/// Returns the normalized arguments and, when anything changed, a report of
/// what was renamed, converted, or dropped.
pub fn normalize_args_aliases(args: &Value, tool: &str) -> (Value, Option<Value>) {
    let Value::Object(obj) = args else {
        return (args.clone(), None);
    };
    let mut out = obj.clone();
    let mut state = NormalizationState::default();

    for (alias, canonical) in TOP_LEVEL_ALIASES {
        rename_key(&mut out, alias, canonical, "", &mut state);
    }
    for alias in MS_ALIASES {
        convert_ms_to_seconds(&mut out, alias, &mut state);
    }

    match tool {
        "http_request" => normalize_request_fields(&mut out, "", &mut state),
        "http_batch_request" => {
            rename_key(&mut out, "batch", "requests", "", &mut state);
            if let Some(Value::Array(items)) = out.get_mut("requests") {
                for (index, item) in items.iter_mut().enumerate() {
                    if let Value::Object(item_map) = item {
                        let path = format!("requests[{}].", index);
                        normalize_request_fields(item_map, &path, &mut state);
                    }
                }
            }
        }
        _ => {}
    }

    (Value::Object(out), compact_state(state))
}
