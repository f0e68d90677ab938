use crate::errors::McpError;
use crate::mcp::aliases::builtin_tool_aliases;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_MAP: Lazy<HashMap<String, ToolDef>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .cloned()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .filter_map(|tool| {
            JSONSchema::compile(&tool.input_schema)
                .ok()
                .map(|schema| (tool.name.clone(), schema))
        })
        .collect()
});

/// Call-level fields accepted by every tool but hidden from `tools/list`.
const TOOL_SEMANTIC_FIELDS: &[&str] = &["trace_id", "span_id", "parent_span_id"];

const MAX_REPORTED_ERRORS: usize = 10;

pub fn tool_catalog() -> &'static Vec<ToolDef> {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_MAP.get(name)
}

/// Schema-checks `args` for `tool_name`. Unknown tools pass; dispatch rejects them.
pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    let (Some(tool), Some(schema)) = (tool_by_name(tool_name), TOOL_VALIDATORS.get(tool_name))
    else {
        return Ok(());
    };
    if let Err(errors) = schema.validate(args) {
        let message = format_schema_errors(tool_name, args, errors, &tool.input_schema);
        return Err(McpError::invalid_params(message));
    }
    Ok(())
}

fn format_schema_errors(
    tool_name: &str,
    args: &Value,
    errors: jsonschema::ErrorIterator,
    schema: &Value,
) -> String {
    let mut rendered = Vec::new();
    for err in errors.take(MAX_REPORTED_ERRORS) {
        let pointer = err.instance_path.to_string();
        let instance_path = if pointer.is_empty() {
            "(root)".to_string()
        } else {
            pointer.clone()
        };
        match &err.kind {
            jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => {
                let known = known_properties(schema, &pointer);
                for unknown in unexpected {
                    if known.is_empty() {
                        rendered.push(format!("{}: unknown field '{}'", instance_path, unknown));
                    } else {
                        rendered.push(format!(
                            "{}: unknown field '{}' (known: {})",
                            instance_path,
                            unknown,
                            known.join(", ")
                        ));
                    }
                }
            }
            jsonschema::error::ValidationErrorKind::Enum { options } => {
                let allowed: Vec<String> = options
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                let received = value_at(args, &pointer);
                rendered.push(format!(
                    "{}: expected one of {}, got {}",
                    instance_path,
                    allowed.join(", "),
                    received
                ));
            }
            jsonschema::error::ValidationErrorKind::Required { property } => {
                let prop = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                rendered.push(format!(
                    "{}: missing required field '{}'",
                    instance_path, prop
                ));
            }
            jsonschema::error::ValidationErrorKind::Type { kind } => {
                rendered.push(format!(
                    "{}: expected {}",
                    instance_path,
                    format_type_kind(kind)
                ));
            }
            _ => {
                rendered.push(format!("{}: {}", instance_path, err));
            }
        }
    }

    let mut lines = vec![format!("Invalid arguments for {}", tool_name)];
    lines.extend(rendered.iter().map(|line| format!("- {}", line)));
    lines.join("\n")
}

fn format_type_kind(kind: &jsonschema::error::TypeKind) -> String {
    match kind {
        jsonschema::error::TypeKind::Single(primitive) => primitive.to_string(),
        jsonschema::error::TypeKind::Multiple(types) => (*types)
            .into_iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" or "),
    }
}

/// Property names declared by the schema node matching an instance pointer.
fn known_properties(schema: &Value, instance_pointer: &str) -> Vec<String> {
    let mut current = schema;
    for segment in instance_pointer.trim_start_matches('/').split('/') {
        if segment.is_empty() {
            continue;
        }
        let next = if segment.parse::<usize>().is_ok() {
            current.get("items")
        } else {
            current.get("properties").and_then(|props| props.get(segment))
        };
        match next {
            Some(node) => current = node,
            None => return Vec::new(),
        }
    }
    let mut names: Vec<String> = current
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .keys()
                .filter(|key| !TOOL_SEMANTIC_FIELDS.contains(&key.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn value_at(root: &Value, instance_pointer: &str) -> Value {
    if instance_pointer.is_empty() {
        return root.clone();
    }
    root.pointer(instance_pointer).cloned().unwrap_or(Value::Null)
}

/// Rewrites `"type": [..]` unions into `anyOf` so stricter clients accept the schema.
pub fn normalize_json_schema(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut out = map.clone();
    if let Some(props) = out.get("properties").and_then(Value::as_object) {
        let normalized = props
            .iter()
            .map(|(key, value)| (key.clone(), normalize_json_schema(value)))
            .collect();
        out.insert("properties".to_string(), Value::Object(normalized));
    }
    if let Some(items) = out.get("items") {
        out.insert("items".to_string(), normalize_json_schema(items));
    }
    if let Some(additional) = out.get("additionalProperties").filter(|v| v.is_object()) {
        out.insert(
            "additionalProperties".to_string(),
            normalize_json_schema(additional),
        );
    }
    if let Some(types) = out.get("type").and_then(Value::as_array).cloned() {
        let mut shared = out.clone();
        shared.remove("type");
        let items = shared.remove("items");
        let additional = shared.remove("additionalProperties");
        let any_of = types
            .iter()
            .filter_map(Value::as_str)
            .map(|t| match t {
                "array" => serde_json::json!({
                    "type": "array",
                    "items": items.clone().unwrap_or(Value::Object(Default::default())),
                }),
                "object" => match &additional {
                    Some(additional) => {
                        serde_json::json!({"type": "object", "additionalProperties": additional})
                    }
                    None => serde_json::json!({"type": "object"}),
                },
                other => serde_json::json!({ "type": other }),
            })
            .collect();
        shared.insert("anyOf".to_string(), Value::Array(any_of));
        return Value::Object(shared);
    }
    if out.get("type").and_then(Value::as_str) == Some("array") && !out.contains_key("items") {
        out.insert("items".to_string(), Value::Object(Default::default()));
    }
    Value::Object(out)
}

pub fn strip_tool_semantic_fields(schema: &Value) -> Value {
    let Some(obj) = schema.as_object() else {
        return schema.clone();
    };
    let mut out = obj.clone();
    if let Some(props) = out.get_mut("properties").and_then(Value::as_object_mut) {
        for key in TOOL_SEMANTIC_FIELDS {
            props.remove(*key);
        }
    }
    Value::Object(out)
}

/// Tools as advertised by `tools/list`, aliases included.
pub fn list_tools() -> Vec<ToolDef> {
    let mut tools: Vec<ToolDef> = TOOL_CATALOG
        .iter()
        .map(|tool| ToolDef {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: strip_tool_semantic_fields(&normalize_json_schema(&tool.input_schema)),
        })
        .collect();

    let mut names: HashSet<String> = tools.iter().map(|tool| tool.name.clone()).collect();
    for (alias, target) in builtin_tool_aliases() {
        if names.contains(*alias) {
            continue;
        }
        let Some(target_tool) = tools.iter().find(|tool| tool.name == *target) else {
            continue;
        };
        let alias_def = ToolDef {
            name: (*alias).to_string(),
            description: format!("Alias for {}.", target),
            input_schema: target_tool.input_schema.clone(),
        };
        tools.push(alias_def);
        names.insert((*alias).to_string());
    }
    tools
}
