//! Body parsing
//!
//! `parse_body` runs on every request. JSON and URL-encoded bodies are read
//! up to their own size caps and parsed into a `ParsedBody` extension; other
//! content types are left unread. Handlers pick the result up with
//! `Payload<T>`. URL-encoded keys may use bracket syntax to build nested
//! objects and arrays.

use axum::{
    async_trait,
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{AppError, ErrorResponse};

/// Deepest bracket nesting accepted in a form key
pub const MAX_FORM_DEPTH: usize = 5;

/// Size caps per parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    pub json: usize,
    pub form: usize,
}

impl BodyLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            json: config.json_body_limit,
            form: config.form_body_limit,
        }
    }
}

/// Body decoded by `parse_body`
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub Value);

/// Request body decoded from JSON or a URL-encoded form.
///
/// A request without a parsed body (no body, or a content type neither parser
/// handles) yields an empty object.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::from_content_type)
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/json" => Some(BodyKind::Json),
            "application/x-www-form-urlencoded" => Some(BodyKind::Form),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BodyKind::Json => "JSON",
            BodyKind::Form => "URL-encoded",
        }
    }

    fn limit(self, limits: BodyLimits) -> usize {
        match self {
            BodyKind::Json => limits.json,
            BodyKind::Form => limits.form,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("{kind} body exceeds {limit} bytes")]
    TooLarge { kind: &'static str, limit: usize },

    #[error("failed to read body: {0}")]
    Read(#[source] axum::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON body must be an object or an array")]
    NotObjectOrArray,

    #[error("invalid form: {0}")]
    Form(#[from] FormError),

    #[error("body does not match the expected shape: {0}")]
    Shape(String),
}

/// Parse JSON and URL-encoded bodies ahead of routing.
///
/// Any read, size or parse failure ends the request with the uniform 500.
pub async fn parse_body(State(limits): State<BodyLimits>, request: Request, next: Next) -> Response {
    let Some(kind) = BodyKind::from_headers(request.headers()) else {
        return next.run(request).await;
    };

    match read_body(kind, limits, request).await {
        Ok(request) => next.run(request).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse request body");
            ErrorResponse::internal()
        }
    }
}

async fn read_body(kind: BodyKind, limits: BodyLimits, request: Request) -> Result<Request, BodyError> {
    let limit = kind.limit(limits);
    let too_large = || BodyError::TooLarge {
        kind: kind.name(),
        limit,
    };

    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, limit).await.map_err(BodyError::Read)?;

    if !bytes.is_empty() {
        let value = match kind {
            BodyKind::Json => parse_strict_json(&bytes)?,
            BodyKind::Form => parse_nested_form(&bytes)?,
        };
        parts.extensions.insert(ParsedBody(value));
    }

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// Only objects and arrays are accepted at the top level
fn parse_strict_json(bytes: &[u8]) -> Result<Value, BodyError> {
    let value: Value = serde_json::from_slice(bytes)?;
    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(BodyError::NotObjectOrArray)
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .extensions
            .get::<ParsedBody>()
            .map(|parsed| parsed.0.clone())
            .unwrap_or_else(|| Value::Object(Map::new()));

        serde_json::from_value(value)
            .map(Payload)
            .map_err(|e| BodyError::Shape(e.to_string()).into())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("key '{0}' nests deeper than {MAX_FORM_DEPTH} levels")]
    TooDeep(String),

    #[error("key '{0}' uses '[]' before the last segment")]
    InnerArrayAppend(String),

    #[error("key '{0}' conflicts with an earlier field of a different shape")]
    Conflict(String),
}

/// Decode an `application/x-www-form-urlencoded` body into a JSON tree.
///
/// `a[b]=1` becomes `{"a":{"b":"1"}}`, `a[]=1&a[]=2` and repeated plain keys
/// become arrays. Keys with unbalanced brackets are taken literally. All leaf
/// values are strings.
pub fn parse_nested_form(body: &[u8]) -> Result<Value, FormError> {
    let mut root = Map::new();

    for (key, value) in url::form_urlencoded::parse(body) {
        let (head, segments) = split_key(&key);
        if segments.len() > MAX_FORM_DEPTH {
            return Err(FormError::TooDeep(key.to_string()));
        }
        insert(&mut root, head, &segments, Value::String(value.into_owned()))
            .map_err(|shape| shape.into_error(&key))?;
    }

    Ok(Value::Object(root))
}

/// Split `a[b][c]` into `("a", ["b", "c"])`
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if open == 0 {
        return (key, Vec::new());
    }

    let (head, mut rest) = key.split_at(open);
    let mut segments = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                segments.push(&stripped[..close]);
                rest = &stripped[close + 1..];
            }
            None => return (key, Vec::new()),
        }
    }

    if rest.is_empty() {
        (head, segments)
    } else {
        (key, Vec::new())
    }
}

enum ShapeError {
    InnerArrayAppend,
    Conflict,
}

impl ShapeError {
    fn into_error(self, key: &str) -> FormError {
        match self {
            ShapeError::InnerArrayAppend => FormError::InnerArrayAppend(key.to_string()),
            ShapeError::Conflict => FormError::Conflict(key.to_string()),
        }
    }
}

fn insert(target: &mut Map<String, Value>, key: &str, rest: &[&str], value: Value) -> Result<(), ShapeError> {
    let Some((next, deeper)) = rest.split_first() else {
        return match target.get_mut(key) {
            Some(slot) => append(slot, value),
            None => {
                target.insert(key.to_string(), value);
                Ok(())
            }
        };
    };

    if next.is_empty() {
        if !deeper.is_empty() {
            return Err(ShapeError::InnerArrayAppend);
        }
        let slot = target
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        return append(slot, value);
    }

    match target
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(child) => insert(child, next, deeper, value),
        _ => Err(ShapeError::Conflict),
    }
}

/// Add a value to a leaf that already exists, promoting a string to an array
fn append(slot: &mut Value, value: Value) -> Result<(), ShapeError> {
    if slot.is_string() {
        let first = slot.take();
        *slot = Value::Array(vec![first, value]);
        return Ok(());
    }

    match slot {
        Value::Array(items) => {
            items.push(value);
            Ok(())
        }
        _ => Err(ShapeError::Conflict),
    }
}
