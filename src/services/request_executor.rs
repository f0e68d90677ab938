use crate::constants::{
    http as http_constants, limits, network as network_constants, protocols::ALLOWED_HTTP,
};
use crate::services::logger::Logger;
use crate::utils::text::truncate_for_log;
use async_trait::async_trait;
use futures::FutureExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Outgoing payload of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Object or array, sent as `application/json`.
    Json(Value),
    /// Sent verbatim with no implied content type.
    Raw(String),
}

impl RequestBody {
    pub fn from_value(value: Option<&Value>) -> Result<Self, String> {
        match value {
            None | Some(Value::Null) => Ok(Self::Empty),
            Some(json @ (Value::Object(_) | Value::Array(_))) => Ok(Self::Json(json.clone())),
            Some(Value::String(text)) => Ok(Self::Raw(text.clone())),
            Some(other) => Err(format!(
                "expected an object, array, or string, got {}",
                value_type_name(other)
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub url: Url,
    pub method: String,
    pub body: RequestBody,
    pub headers: Option<BTreeMap<String, String>>,
    pub params: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("Missing 'url' field")]
    MissingUrl,
    #[error("Invalid 'url' field: {0}")]
    InvalidUrl(String),
    #[error("Invalid '{field}' field: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl RequestSpec {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: http_constants::DEFAULT_METHOD.to_string(),
            body: RequestBody::Empty,
            headers: None,
            params: None,
        }
    }

    /// Builds a spec from loosely-typed tool arguments.
    ///
    /// Only shape is checked here. The method is kept as given; it is
    /// uppercased at execution time.
    pub fn from_args(args: &Value) -> Result<Self, SpecError> {
        let Some(obj) = args.as_object() else {
            return Err(SpecError::InvalidField {
                field: "request",
                reason: format!("expected an object, got {}", value_type_name(args)),
            });
        };

        let raw_url = match obj.get("url") {
            None | Some(Value::Null) => return Err(SpecError::MissingUrl),
            Some(Value::String(text)) if text.trim().is_empty() => {
                return Err(SpecError::MissingUrl)
            }
            Some(Value::String(text)) => text.trim(),
            Some(other) => {
                return Err(SpecError::InvalidUrl(format!(
                    "expected a string, got {}",
                    value_type_name(other)
                )))
            }
        };
        let url = parse_http_url(raw_url).map_err(SpecError::InvalidUrl)?;

        let method = match obj.get("method") {
            None | Some(Value::Null) => http_constants::DEFAULT_METHOD.to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                return Err(SpecError::InvalidField {
                    field: "method",
                    reason: format!("expected a string, got {}", value_type_name(other)),
                })
            }
        };

        let body = RequestBody::from_value(obj.get("body"))
            .map_err(|reason| SpecError::InvalidField {
                field: "body",
                reason,
            })?;

        Ok(Self {
            url,
            method,
            body,
            headers: string_map(obj.get("headers"), "headers")?,
            params: string_map(obj.get("params"), "params")?,
        })
    }
}

/// Per-call knobs shared by every item of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecOptions {
    pub timeout_secs: f64,
    pub include_headers: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout_secs: network_constants::DEFAULT_TIMEOUT_SECS,
            include_headers: false,
        }
    }
}

impl ExecOptions {
    fn timeout(&self) -> Result<Duration, ExchangeError> {
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(ExchangeError::Invalid(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout_secs
            )));
        }
        Duration::try_from_secs_f64(self.timeout_secs).map_err(|err| {
            ExchangeError::Invalid(format!("timeout is out of range: {}", err))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    Timeout,
    Connection,
    Request,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::Request => "request",
            ErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpSuccess {
    pub status: u16,
    pub body: Value,
    /// Omitted from the wire unless the caller asked for headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpFailure {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one request: a response of any status, or a classified failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Success(HttpSuccess),
    Failure(HttpFailure),
}

impl ResultRecord {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure(HttpFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::InvalidRequest, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(success) => Some(success.status),
            Self::Failure(_) => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    /// Wire form of the record.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Error)]
enum ExchangeError {
    #[error("{0}")]
    Invalid(String),
    #[error("Timed out after {0:?}s")]
    Timeout(f64),
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Request(String),
    #[error("{0}")]
    Unknown(String),
}

const CONNECTION_IO_KINDS: &[io::ErrorKind] = &[
    io::ErrorKind::ConnectionRefused,
    io::ErrorKind::ConnectionReset,
    io::ErrorKind::ConnectionAborted,
    io::ErrorKind::NotConnected,
    io::ErrorKind::AddrNotAvailable,
];

impl ExchangeError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::Invalid(_) => ErrorKind::InvalidRequest,
            ExchangeError::Timeout(_) => ErrorKind::Timeout,
            ExchangeError::Connection(_) => ErrorKind::Connection,
            ExchangeError::Request(_) => ErrorKind::Request,
            ExchangeError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Timeouts win over connection failures: a connect that runs out the
    /// clock is reported as a timeout.
    fn classify(err: reqwest::Error, timeout_secs: f64) -> Self {
        let io_kind = source_io_kind(&err);
        if err.is_timeout() || io_kind == Some(io::ErrorKind::TimedOut) {
            return ExchangeError::Timeout(timeout_secs);
        }
        if err.is_connect() || io_kind.is_some_and(|kind| CONNECTION_IO_KINDS.contains(&kind)) {
            return ExchangeError::Connection(err.to_string());
        }
        if err.is_request()
            || err.is_body()
            || err.is_decode()
            || err.is_redirect()
            || err.is_builder()
        {
            return ExchangeError::Request(err.to_string());
        }
        ExchangeError::Unknown(err.to_string())
    }
}

impl From<Result<HttpSuccess, ExchangeError>> for ResultRecord {
    fn from(outcome: Result<HttpSuccess, ExchangeError>) -> Self {
        match outcome {
            Ok(success) => ResultRecord::Success(success),
            Err(err) => ResultRecord::failure(err.kind(), err.to_string()),
        }
    }
}

/// Runs one request to completion. Every outcome is a record.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, spec: &RequestSpec, options: &ExecOptions) -> ResultRecord;
}

/// Runs single HTTP exchanges and folds every outcome into a [`ResultRecord`].
#[derive(Clone)]
pub struct RequestExecutor {
    logger: Logger,
}

impl RequestExecutor {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.child("http"),
        }
    }

    /// Never fails: transport errors, bad options and panics inside the
    /// exchange all come back as failure records.
    pub async fn execute(&self, spec: &RequestSpec, options: &ExecOptions) -> ResultRecord {
        let method = spec.method.to_uppercase();
        let url = truncate_for_log(spec.url.as_str(), limits::LOG_URL_LENGTH);
        self.logger.debug(
            "Making request",
            Some(&serde_json::json!({ "method": method, "url": url })),
        );

        let started = Instant::now();
        let outcome = guarded(self.exchange(spec, &method, options)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(success) => self.logger.debug(
                "Request completed",
                Some(&serde_json::json!({
                    "method": method,
                    "url": url,
                    "status": success.status,
                    "duration_ms": duration_ms,
                })),
            ),
            Err(err) => {
                let meta = serde_json::json!({
                    "method": method,
                    "url": url,
                    "error": err.kind().as_str(),
                    "message": truncate_for_log(&err.to_string(), limits::LOG_MESSAGE_LENGTH),
                    "duration_ms": duration_ms,
                });
                if matches!(err, ExchangeError::Unknown(_)) {
                    self.logger.error("Unexpected request failure", Some(&meta));
                } else {
                    self.logger.warn("Request failed", Some(&meta));
                }
            }
        }

        outcome.into()
    }

    async fn exchange(
        &self,
        spec: &RequestSpec,
        method: &str,
        options: &ExecOptions,
    ) -> Result<HttpSuccess, ExchangeError> {
        let timeout = options.timeout()?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ExchangeError::Request(format!("Invalid HTTP method: {:?}", method)))?;
        let url = merge_query_params(&spec.url, spec.params.as_ref());

        // One client per call; nothing is pooled across requests.
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(network_constants::USER_AGENT)
            .build()
            .map_err(|err| ExchangeError::Unknown(format!("Failed to build HTTP client: {}", err)))?;

        let mut request = client.request(method, url);
        if let Some(headers) = &spec.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        request = match &spec.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Raw(text) => request.body(text.clone()),
        };

        let response = request
            .send()
            .await
            .map_err(|err| ExchangeError::classify(err, options.timeout_secs))?;

        let status = response.status().as_u16();
        let headers = options
            .include_headers
            .then(|| headers_to_map(response.headers()));
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|err| ExchangeError::classify(err, options.timeout_secs))?;

        Ok(HttpSuccess {
            status,
            body: normalize_body(&content_type, text),
            headers,
        })
    }
}

#[async_trait]
impl Dispatch for RequestExecutor {
    async fn dispatch(&self, spec: &RequestSpec, options: &ExecOptions) -> ResultRecord {
        self.execute(spec, options).await
    }
}

/// Polls `future` to completion, returning the panic message if it unwinds.
pub(crate) async fn catch_panic<F: Future>(future: F) -> Result<F::Output, String> {
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(panic_message)
}

async fn guarded<F>(exchange: F) -> Result<HttpSuccess, ExchangeError>
where
    F: Future<Output = Result<HttpSuccess, ExchangeError>>,
{
    catch_panic(exchange)
        .await
        .unwrap_or_else(|message| Err(ExchangeError::Unknown(message)))
}

pub fn parse_http_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw).map_err(|err| format!("{} ({})", err, raw))?;
    if !scheme_allowed(parsed.scheme()) {
        return Err(format!(
            "unsupported scheme '{}', only http and https are allowed",
            parsed.scheme()
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(format!("missing host ({})", raw));
    }
    Ok(parsed)
}

fn scheme_allowed(scheme: &str) -> bool {
    let normalized = scheme.trim_end_matches(':');
    ALLOWED_HTTP
        .iter()
        .any(|allowed| allowed.trim_end_matches(':') == normalized)
}

/// Merges `params` into the URL's query string.
///
/// A key already present in the URL takes the new value at its first
/// position and loses any later duplicates; unseen keys are appended.
pub(crate) fn merge_query_params(url: &Url, params: Option<&BTreeMap<String, String>>) -> Url {
    let mut merged = url.clone();
    let Some(params) = params.filter(|p| !p.is_empty()) else {
        return merged;
    };

    let existing: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut replaced = HashSet::new();
    {
        let mut pairs = merged.query_pairs_mut();
        pairs.clear();
        for (key, value) in &existing {
            match params.get(key) {
                Some(replacement) => {
                    if replaced.insert(key.as_str()) {
                        pairs.append_pair(key, replacement);
                    }
                }
                None => {
                    pairs.append_pair(key, value);
                }
            }
        }
        for (key, value) in params {
            if !replaced.contains(key.as_str()) {
                pairs.append_pair(key, value);
            }
        }
    }
    merged
}

pub(crate) fn normalize_body(content_type: &str, text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if content_type.contains(http_constants::JSON_CONTENT_TYPE) {
        if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
            return parsed;
        }
    }
    Value::String(text)
}

/// Lowercase names; repeated headers are joined with `", "`.
pub(crate) fn headers_to_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

fn string_map(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<BTreeMap<String, String>>, SpecError> {
    let map = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(SpecError::InvalidField {
                field,
                reason: format!("expected an object, got {}", value_type_name(other)),
            })
        }
    };
    let mut out = BTreeMap::new();
    for (key, value) in map {
        let rendered = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            other => {
                return Err(SpecError::InvalidField {
                    field,
                    reason: format!(
                        "value for '{}' must be a string, got {}",
                        key,
                        value_type_name(other)
                    ),
                })
            }
        };
        out.insert(key.clone(), rendered);
    }
    Ok(Some(out))
}

fn source_io_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = current.source();
    }
    None
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = panic.downcast_ref::<String>() {
        return text.clone();
    }
    "request task panicked".to_string()
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("valid url")
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn body_union_maps_each_json_shape() {
        assert_eq!(RequestBody::from_value(None), Ok(RequestBody::Empty));
        assert_eq!(
            RequestBody::from_value(Some(&Value::Null)),
            Ok(RequestBody::Empty)
        );
        assert_eq!(
            RequestBody::from_value(Some(&json!([1, 2]))),
            Ok(RequestBody::Json(json!([1, 2])))
        );
        assert_eq!(
            RequestBody::from_value(Some(&json!("raw"))),
            Ok(RequestBody::Raw("raw".to_string()))
        );
        assert!(RequestBody::from_value(Some(&json!(42))).is_err());
    }

    #[test]
    fn spec_from_args_defaults_method_and_keeps_case() {
        let spec = RequestSpec::from_args(&json!({"url": "http://example.com/a"})).unwrap();
        assert_eq!(spec.method, "GET");
        assert_eq!(spec.body, RequestBody::Empty);

        let spec = RequestSpec::from_args(&json!({
            "url": "https://example.com",
            "method": "patch",
            "headers": {"X-Trace": "abc", "X-Count": 3},
            "params": {"q": "rust", "skip": null}
        }))
        .unwrap();
        assert_eq!(spec.method, "patch");
        assert_eq!(spec.headers.unwrap().get("X-Count").unwrap(), "3");
        assert_eq!(spec.params.unwrap(), params(&[("q", "rust")]));
    }

    #[test]
    fn spec_from_args_rejects_missing_and_bad_urls() {
        assert_eq!(
            RequestSpec::from_args(&json!({"method": "GET"})),
            Err(SpecError::MissingUrl)
        );
        assert_eq!(
            RequestSpec::from_args(&json!({"url": "   "})),
            Err(SpecError::MissingUrl)
        );
        assert!(matches!(
            RequestSpec::from_args(&json!({"url": "not a url"})),
            Err(SpecError::InvalidUrl(_))
        ));
        assert!(matches!(
            RequestSpec::from_args(&json!({"url": "ftp://example.com/file"})),
            Err(SpecError::InvalidUrl(_))
        ));
        assert!(matches!(
            RequestSpec::from_args(&json!({"url": 12})),
            Err(SpecError::InvalidUrl(_))
        ));
        assert_eq!(
            SpecError::MissingUrl.to_string(),
            "Missing 'url' field".to_string()
        );
    }

    #[test]
    fn spec_from_args_rejects_wrong_field_types() {
        let err = RequestSpec::from_args(&json!({"url": "http://a.test", "body": true}))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidField { field: "body", .. }));

        let err = RequestSpec::from_args(&json!({"url": "http://a.test", "headers": ["x"]}))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidField { field: "headers", .. }));

        let err = RequestSpec::from_args(&json!("http://a.test")).unwrap_err();
        assert!(matches!(err, SpecError::InvalidField { field: "request", .. }));
    }

    #[test]
    fn merge_query_params_appends_to_existing_query() {
        let merged = merge_query_params(
            &url("http://example.com/search?page=2"),
            Some(&params(&[("q", "rust lang")])),
        );
        assert_eq!(merged.as_str(), "http://example.com/search?page=2&q=rust+lang");
    }

    #[test]
    fn merge_query_params_replaces_existing_key_in_place() {
        let merged = merge_query_params(
            &url("http://example.com/?a=1&b=2&a=3"),
            Some(&params(&[("a", "9"), ("c", "4")])),
        );
        assert_eq!(merged.query(), Some("a=9&b=2&c=4"));
    }

    #[test]
    fn merge_query_params_leaves_url_alone_without_params() {
        let original = url("http://example.com/path");
        assert_eq!(merge_query_params(&original, None), original);
        assert_eq!(
            merge_query_params(&original, Some(&BTreeMap::new())).as_str(),
            "http://example.com/path"
        );
    }

    #[test]
    fn normalize_body_follows_content_type() {
        assert_eq!(
            normalize_body("application/json; charset=utf-8", "{\"a\":1}".to_string()),
            json!({"a": 1})
        );
        assert_eq!(
            normalize_body("application/json", "{broken".to_string()),
            json!("{broken")
        );
        assert_eq!(normalize_body("text/plain", "hello".to_string()), json!("hello"));
        assert_eq!(normalize_body("text/plain", "{\"a\":1}".to_string()), json!("{\"a\":1}"));
        assert_eq!(normalize_body("application/json", String::new()), Value::Null);
        assert_eq!(normalize_body("", String::new()), Value::Null);
    }

    #[test]
    fn headers_to_map_joins_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", HeaderValue::from_static("a=1"));
        headers.append("Set-Cookie", HeaderValue::from_static("b=2"));
        headers.insert("Content-Type", HeaderValue::from_static("text/plain"));
        let map = headers_to_map(&headers);
        assert_eq!(map.get("set-cookie").unwrap(), "a=1, b=2");
        assert_eq!(map.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn success_without_headers_omits_the_key() {
        let record = ResultRecord::Success(HttpSuccess {
            status: 204,
            body: Value::Null,
            headers: None,
        });
        assert_eq!(record.to_value(), json!({"status": 204, "body": null}));

        let with_headers = ResultRecord::Success(HttpSuccess {
            status: 200,
            body: json!("ok"),
            headers: Some(BTreeMap::from([("x-a".to_string(), "1".to_string())])),
        });
        assert_eq!(
            with_headers.to_value(),
            json!({"status": 200, "body": "ok", "headers": {"x-a": "1"}})
        );
    }

    #[test]
    fn failure_serializes_kind_under_error_key() {
        let record = ResultRecord::invalid_request("Missing 'url' field");
        assert_eq!(
            record.to_value(),
            json!({"error": "invalid_request", "message": "Missing 'url' field"})
        );
        assert_eq!(record.error_kind(), Some(ErrorKind::InvalidRequest));
    }

    #[test]
    fn timeout_message_renders_float_seconds() {
        assert_eq!(ExchangeError::Timeout(30.0).to_string(), "Timed out after 30.0s");
        assert_eq!(ExchangeError::Timeout(1.5).to_string(), "Timed out after 1.5s");
    }

    #[test]
    fn exec_options_reject_unusable_timeouts() {
        let bad = ExecOptions {
            timeout_secs: f64::NAN,
            include_headers: false,
        };
        assert!(matches!(bad.timeout(), Err(ExchangeError::Invalid(_))));
        let bad = ExecOptions {
            timeout_secs: -1.0,
            include_headers: false,
        };
        assert!(matches!(bad.timeout(), Err(ExchangeError::Invalid(_))));
        assert_eq!(
            ExecOptions::default().timeout().unwrap(),
            Duration::from_secs(30)
        );
    }

    async fn exploding_exchange() -> Result<HttpSuccess, ExchangeError> {
        panic!("exchange blew up")
    }

    async fn exploding_with_context(code: u16) -> Result<HttpSuccess, ExchangeError> {
        panic!("unexpected status {}", code)
    }

    #[tokio::test]
    async fn panicking_exchange_becomes_unknown_record() {
        let record: ResultRecord = guarded(exploding_exchange()).await.into();
        assert_eq!(record.error_kind(), Some(ErrorKind::Unknown));
        assert_eq!(
            record.to_value(),
            json!({"error": "unknown", "message": "exchange blew up"})
        );

        let record: ResultRecord = guarded(exploding_with_context(599)).await.into();
        assert_eq!(
            record.to_value(),
            json!({"error": "unknown", "message": "unexpected status 599"})
        );
    }

    #[tokio::test]
    async fn guarded_passes_ordinary_outcomes_through() {
        let ok = guarded(async {
            Ok(HttpSuccess {
                status: 200,
                body: Value::Null,
                headers: None,
            })
        })
        .await;
        assert_eq!(ok.map(|success| success.status).ok(), Some(200));

        let failed = guarded(async { Err(ExchangeError::Connection("refused".to_string())) }).await;
        assert!(matches!(failed, Err(ExchangeError::Connection(_))));
    }

    #[tokio::test]
    async fn invalid_method_token_is_a_request_failure() {
        let executor = RequestExecutor::new(Logger::new("test"));
        let mut spec = RequestSpec::new(url("http://127.0.0.1:9/"));
        spec.method = "BAD METHOD".to_string();
        let record = executor.execute(&spec, &ExecOptions::default()).await;
        assert_eq!(record.error_kind(), Some(ErrorKind::Request));
    }
}
