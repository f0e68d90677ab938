use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const BUILTIN_TOOL_ALIASES: &[(&str, &str)] = &[
    ("request", "http_request"),
    ("http", "http_request"),
    ("batch_request", "http_batch_request"),
    ("http_batch", "http_batch_request"),
];

static BUILTIN_TOOL_ALIAS_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| BUILTIN_TOOL_ALIASES.iter().copied().collect());

pub fn builtin_tool_aliases() -> &'static [(&'static str, &'static str)] {
    BUILTIN_TOOL_ALIASES
}

pub fn canonical_tool_name(tool: &str) -> &str {
    BUILTIN_TOOL_ALIAS_MAP.get(tool).copied().unwrap_or(tool)
}

pub fn builtin_tool_alias_map_owned() -> HashMap<String, String> {
    BUILTIN_TOOL_ALIASES
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect()
}
