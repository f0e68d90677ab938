use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::request_executor::{ExecOptions, RequestExecutor, RequestSpec, SpecError};
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use serde_json::Value;
use std::sync::Arc;

/// Handler for the `http_request` tool.
///
/// Unlike batch items, a single request with a missing or malformed URL is
/// rejected outright instead of producing an `invalid_request` record.
#[derive(Clone)]
pub struct HttpManager {
    logger: Logger,
    validation: Validation,
    executor: Arc<RequestExecutor>,
    default_timeout_secs: f64,
}

impl HttpManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        executor: Arc<RequestExecutor>,
        default_timeout_secs: f64,
    ) -> Self {
        Self {
            logger: logger.child("http_request"),
            validation,
            executor,
            default_timeout_secs,
        }
    }

    pub async fn request(&self, args: Value) -> Result<Value, ToolError> {
        self.validation
            .ensure_string(args.get("method").unwrap_or(&Value::Null), "method", true)?;
        let spec = RequestSpec::from_args(&args).map_err(|err| {
            self.logger.debug(
                "Rejected request arguments",
                Some(&serde_json::json!({ "reason": err.to_string() })),
            );
            spec_error_to_tool_error(err)
        })?;
        let options = ExecOptions {
            timeout_secs: self
                .validation
                .ensure_timeout_secs(args.get("timeout"), self.default_timeout_secs)?,
            include_headers: self.validation.ensure_flag(
                args.get("include_headers"),
                "include_headers",
                false,
            )?,
        };

        let record = self.executor.execute(&spec, &options).await;
        Ok(record.to_value())
    }
}

fn spec_error_to_tool_error(err: SpecError) -> ToolError {
    let message = err.to_string();
    match err {
        SpecError::MissingUrl | SpecError::InvalidUrl(_) => ToolError::invalid_params(message)
            .with_hint("url must be an absolute http(s) URL, e.g. https://api.example.com/items"),
        SpecError::InvalidField { field, .. } => ToolError::invalid_params(message)
            .with_details(serde_json::json!({ "field": field })),
    }
}

#[async_trait::async_trait]
impl ToolHandler for HttpManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.request(args).await
    }
}
