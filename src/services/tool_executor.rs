use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ToolError;
use crate::services::logger::Logger;

use serde_json::Value;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

/// Argument keys consumed by the executor itself and never forwarded.
const CALL_META_FIELDS: &[&str] = &["trace_id", "span_id", "parent_span_id"];

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
    alias_map: HashMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct ToolCallMeta {
    pub tool: String,
    pub invoked_as: Option<String>,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub started_at: i64,
    pub duration_ms: u64,
}

impl ToolCallMeta {
    pub fn to_value(&self) -> Value {
        let mut out = serde_json::json!({
            "tool": self.tool,
            "trace_id": self.trace_id,
            "span_id": self.span_id,
            "started_at": self.started_at,
            "duration_ms": self.duration_ms,
        });
        if let Some(map) = out.as_object_mut() {
            if let Some(invoked_as) = &self.invoked_as {
                map.insert("invoked_as".to_string(), Value::String(invoked_as.clone()));
            }
            if let Some(parent) = &self.parent_span_id {
                map.insert("parent_span_id".to_string(), Value::String(parent.clone()));
            }
        }
        out
    }
}

impl ToolExecutor {
    pub fn new(
        logger: Logger,
        handlers: HashMap<String, Arc<dyn ToolHandler>>,
        alias_map: HashMap<String, String>,
    ) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
            alias_map,
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve_alias(&self, tool: &str) -> (String, Option<String>) {
        if self.handlers.contains_key(tool) {
            return (tool.to_string(), None);
        }
        match self.alias_map.get(tool) {
            Some(mapped) => (mapped.clone(), Some(tool.to_string())),
            None => (tool.to_string(), None),
        }
    }

    fn strip_call_meta(args: Value) -> Value {
        match args {
            Value::Object(mut map) => {
                for key in CALL_META_FIELDS {
                    map.remove(*key);
                }
                Value::Object(map)
            }
            Value::Null => Value::Object(Default::default()),
            other => other,
        }
    }

    fn read_id(args: &Value, key: &str) -> Option<String> {
        args.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }

    /// Dispatches `tool` and returns the handler's result with its call metadata.
    pub async fn execute(&self, tool: &str, args: Value) -> Result<(Value, ToolCallMeta), ToolError> {
        let (resolved, invoked_as) = self.resolve_alias(tool);
        let handler = self.handlers.get(&resolved).cloned().ok_or_else(|| {
            ToolError::not_found(format!("Unknown tool: {}", tool))
                .with_hint(format!("Available tools: {}", self.tool_names().join(", ")))
        })?;

        let trace_id =
            Self::read_id(&args, "trace_id").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let span_id =
            Self::read_id(&args, "span_id").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let parent_span_id = Self::read_id(&args, "parent_span_id");
        let cleaned = Self::strip_call_meta(args);

        let started_at = chrono::Utc::now().timestamp_millis();
        let started = Instant::now();
        let result = handler.handle(cleaned).await;
        let meta = ToolCallMeta {
            tool: resolved,
            invoked_as,
            trace_id,
            span_id,
            parent_span_id,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        match result {
            Ok(value) => {
                self.logger.debug("Tool call finished", Some(&meta.to_value()));
                Ok((value, meta))
            }
            Err(err) => {
                let mut log_meta = meta.to_value();
                if let Some(map) = log_meta.as_object_mut() {
                    map.insert("code".to_string(), Value::String(err.code.clone()));
                    map.insert("message".to_string(), Value::String(err.message.clone()));
                }
                self.logger.warn("Tool call rejected", Some(&log_meta));
                Err(err)
            }
        }
    }
}
