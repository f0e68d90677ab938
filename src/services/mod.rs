pub mod batch;
pub mod logger;
pub mod request_executor;
pub mod tool_executor;
pub mod validation;
