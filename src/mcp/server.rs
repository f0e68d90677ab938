use crate::app::App;
use crate::config::Settings;
use crate::constants::limits::LOG_MESSAGE_LENGTH;
use crate::constants::server as server_constants;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::aliases::canonical_tool_name;
use crate::mcp::catalog::{list_tools, validate_tool_args};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::services::logger::Logger;
use crate::utils::arg_aliases::normalize_args_aliases;
use crate::utils::text::truncate_for_log;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        "ToolError".to_string(),
        format!("tool: {}", tool),
        format!("kind: {:?}", error.kind).to_lowercase(),
        format!("code: {}", error.code),
        format!("message: {}", error.message),
    ];
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    if let Some(details) = &error.details {
        lines.push(format!("details: {}", details));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams | ToolErrorKind::NotFound => {
            McpError::new(ErrorCode::InvalidParams, message)
        }
        ToolErrorKind::Internal => McpError::new(ErrorCode::InternalError, message),
    }
}

pub struct McpServer {
    app: Arc<App>,
    logger: Logger,
}

impl McpServer {
    pub fn new(settings: Settings) -> Result<Self, ToolError> {
        let app = App::initialize(settings)?;
        let logger = app.logger.child("mcp");
        Ok(Self {
            app: Arc::new(app),
            logger,
        })
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": server_constants::PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": server_constants::NAME,
                "version": server_constants::VERSION,
            },
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": list_tools() })
    }

    async fn handle_tools_call(&self, params: &Value) -> Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        if name.is_empty() {
            return Err(McpError::invalid_params("Missing tool name"));
        }
        let raw_args = match params.get("arguments") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(args) => args.clone(),
        };

        let canonical_tool = canonical_tool_name(name);
        let (args, normalization) = normalize_args_aliases(&raw_args, canonical_tool);
        if let Some(report) = normalization.as_ref() {
            self.logger.debug(
                "Normalized argument aliases",
                Some(&serde_json::json!({ "tool": canonical_tool, "normalization": report })),
            );
        }

        validate_tool_args(canonical_tool, &args)?;

        let (result, meta) = self
            .app
            .tool_executor
            .execute(name, args)
            .await
            .map_err(|err| map_tool_error(canonical_tool, &err))?;

        let mut call_meta = meta.to_value();
        if let (Some(report), Some(obj)) = (normalization, call_meta.as_object_mut()) {
            obj.insert("normalization".to_string(), report);
        }
        let text = serde_json::to_string(&result)
            .map_err(|err| McpError::new(ErrorCode::InternalError, err.to_string()))?;

        Ok(serde_json::json!({
            "content": [ { "type": "text", "text": text } ],
            "_meta": call_meta,
        }))
    }

    /// Dispatches one parsed request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.logger.debug(
                "Notification received",
                Some(&serde_json::json!({ "method": request.method })),
            );
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&request.params).await,
            other => Err(McpError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", other),
            )),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                self.logger.warn(
                    "Request failed",
                    Some(&serde_json::json!({
                        "method": request.method,
                        "code": err.code.as_i32(),
                        "message": truncate_for_log(&err.message, LOG_MESSAGE_LENGTH),
                    })),
                );
                JsonRpcResponse::from_error(id, err)
            }
        })
    }

    /// Handles one line of the stdio stream.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let parsed: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(err) => {
                self.logger.warn(
                    "Unparsable input line",
                    Some(&serde_json::json!({ "error": err.to_string() })),
                );
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError,
                    "Parse error",
                ));
            }
        };

        let id = parsed.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(parsed) {
            Ok(request) => self.handle_request(request).await,
            Err(_) => Some(JsonRpcResponse::failure(
                id,
                ErrorCode::InvalidRequest,
                "Invalid request",
            )),
        }
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        self.logger.info(
            "Serving on stdio",
            Some(&serde_json::json!({
                "version": server_constants::VERSION,
                "protocol": server_constants::PROTOCOL_VERSION,
            })),
        );

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|err| ToolError::internal(err.to_string()))?
        {
            if let Some(response) = self.handle_line(&line).await {
                write_response(&mut writer, &response).await?;
            }
        }

        self.logger
            .info("stdin closed, shutting down", Some(&self.logger.stats()));
        Ok(())
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), ToolError>
where
    W: AsyncWrite + Unpin,
{
    let payload =
        serde_json::to_string(response).map_err(|err| ToolError::internal(err.to_string()))?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn run_stdio(settings: Settings) -> Result<(), ToolError> {
    let server = McpServer::new(settings)?;
    server.run_stdio().await
}
