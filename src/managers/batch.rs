use crate::errors::ToolError;
use crate::services::batch::BatchCoordinator;
use crate::services::logger::Logger;
use crate::services::request_executor::ExecOptions;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use serde_json::Value;
use std::sync::Arc;

/// Handler for the `http_batch_request` tool.
#[derive(Clone)]
pub struct BatchManager {
    logger: Logger,
    validation: Validation,
    coordinator: Arc<BatchCoordinator>,
    default_timeout_secs: f64,
}

impl BatchManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        coordinator: Arc<BatchCoordinator>,
        default_timeout_secs: f64,
    ) -> Self {
        Self {
            logger: logger.child("http_batch_request"),
            validation,
            coordinator,
            default_timeout_secs,
        }
    }

    pub async fn batch(&self, args: Value) -> Result<Value, ToolError> {
        let requests = self
            .validation
            .ensure_array(args.get("requests"), "requests")
            .map_err(|err| {
                err.with_hint("Provide { requests: [{ url: \"https://...\", method: \"GET\" }] }.")
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

        let records = self.coordinator.execute_batch(requests, &options).await;
        self.logger.debug(
            "Batch finished",
            Some(&serde_json::json!({
                "requested": requests.len(),
                "succeeded": records.iter().filter(|r| r.is_success()).count(),
            })),
        );
        Ok(Value::Array(records.iter().map(|r| r.to_value()).collect()))
    }
}

#[async_trait::async_trait]
impl ToolHandler for BatchManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.batch(args).await
    }
}
