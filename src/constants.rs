pub mod server {
    pub const NAME: &str = "mcp-api-client";
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PROTOCOL_VERSION: &str = "2025-06-18";
}

pub mod network {
    pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
    pub const USER_AGENT: &str = concat!("mcp-api-client/", env!("CARGO_PKG_VERSION"));
}

pub mod http {
    pub const DEFAULT_METHOD: &str = "GET";
    pub const JSON_CONTENT_TYPE: &str = "application/json";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}

pub mod limits {
    pub const LOG_URL_LENGTH: usize = 256;
    pub const LOG_MESSAGE_LENGTH: usize = 512;
}

pub mod env {
    pub const LOG_LEVEL: &str = "MCP_API_CLIENT_LOG_LEVEL";
    pub const LOG_LEVEL_FALLBACK: &str = "LOG_LEVEL";
    pub const DEFAULT_TIMEOUT: &str = "MCP_API_CLIENT_DEFAULT_TIMEOUT";
}
