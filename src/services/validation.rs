use crate::errors::ToolError;
use crate::services::request_executor::value_type_name;
use serde_json::Value;
use std::time::Duration;

/// Boundary checks for tool arguments that JSON schema cannot express.
#[derive(Clone, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(
        &self,
        value: &Value,
        label: &str,
        trim: bool,
    ) -> Result<String, ToolError> {
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a non-empty string", label))
        })?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(if trim {
            normalized.to_string()
        } else {
            text.to_string()
        })
    }

    /// Seconds as a positive, finite float; absent or null falls back.
    pub fn ensure_timeout_secs(
        &self,
        value: Option<&Value>,
        fallback: f64,
    ) -> Result<f64, ToolError> {
        let raw = match value {
            None | Some(Value::Null) => fallback,
            Some(Value::Number(num)) => num.as_f64().unwrap_or(f64::NAN),
            Some(Value::String(text)) => text.trim().parse::<f64>().map_err(|_| {
                ToolError::invalid_params(format!(
                    "timeout must be a number of seconds, got {:?}",
                    text
                ))
            })?,
            Some(other) => {
                return Err(ToolError::invalid_params(format!(
                    "timeout must be a number of seconds, got {}",
                    value_type_name(other)
                )))
            }
        };
        if !raw.is_finite() || raw <= 0.0 || Duration::try_from_secs_f64(raw).is_err() {
            return Err(ToolError::invalid_params(format!(
                "timeout must be a positive number of seconds, got {}",
                raw
            ))
            .with_hint("Pass e.g. { \"timeout\": 10 } or { \"timeout\": 2.5 }."));
        }
        Ok(raw)
    }

    pub fn ensure_flag(
        &self,
        value: Option<&Value>,
        label: &str,
        fallback: bool,
    ) -> Result<bool, ToolError> {
        match value {
            None | Some(Value::Null) => Ok(fallback),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(Value::String(text)) => match text.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ToolError::invalid_params(format!(
                    "{} must be a boolean",
                    label
                ))),
            },
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be a boolean",
                label
            ))),
        }
    }

    pub fn ensure_array<'a>(
        &self,
        value: Option<&'a Value>,
        label: &str,
    ) -> Result<&'a [Value], ToolError> {
        value
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an array", label)))
    }
}
