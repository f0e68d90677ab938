use crate::config::Settings;
use crate::errors::ToolError;
use crate::managers;
use crate::mcp::catalog::tool_catalog;
use crate::services::batch::BatchCoordinator;
use crate::services::logger::Logger;
use crate::services::request_executor::RequestExecutor;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
        alias_map: &HashMap<String, String>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .map(|tool| tool.name.clone())
            .filter(|name| !handlers.contains_key(name) && !alias_map.contains_key(name))
            .collect();
        let dangling: Vec<String> = alias_map
            .iter()
            .filter(|(_, target)| !handlers.contains_key(*target))
            .map(|(alias, target)| format!("{} -> {}", alias, target))
            .collect();
        if missing.is_empty() && dangling.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json needs a handler, and every alias a live target.")
            .with_details(serde_json::json!({
                "missing_handlers": missing,
                "dangling_aliases": dangling,
            })))
    }

    pub fn initialize(settings: Settings) -> Result<Self, ToolError> {
        let logger = Logger::with_level("mcp-api-client", settings.log_level);
        let validation = Validation::new();

        let request_executor = Arc::new(RequestExecutor::new(logger.clone()));
        let batch_coordinator = Arc::new(BatchCoordinator::new(
            logger.clone(),
            request_executor.clone(),
        ));

        let http_manager = Arc::new(managers::http::HttpManager::new(
            logger.clone(),
            validation.clone(),
            request_executor,
            settings.default_timeout_secs,
        ));
        let batch_manager = Arc::new(managers::batch::BatchManager::new(
            logger.clone(),
            validation,
            batch_coordinator,
            settings.default_timeout_secs,
        ));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert("http_request".to_string(), http_manager);
        handlers.insert("http_batch_request".to_string(), batch_manager);

        let alias_map = crate::mcp::aliases::builtin_tool_alias_map_owned();

        Self::validate_tool_wiring(&handlers, &alias_map)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers, alias_map));

        logger.debug(
            "Application initialized",
            Some(&serde_json::json!({
                "tools": tool_executor.tool_names(),
                "default_timeout_secs": settings.default_timeout_secs,
            })),
        );

        Ok(Self {
            logger,
            tool_executor,
        })
    }
}
