//! Response and request helpers shared by all routes

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Incoming};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::types::JananiError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest JSON request body accepted
pub const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn with_cors(
    builder: hyper::http::response::Builder,
    origin: Option<&str>,
) -> hyper::http::response::Builder {
    match origin {
        Some(origin) => builder
            .header("Access-Control-Allow-Origin", origin)
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Authorization"),
        None => builder,
    }
}

pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    origin: Option<&str>,
) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    with_cors(Response::builder(), origin)
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(json))
        .unwrap()
}

pub fn text_response(status: StatusCode, text: &'static str, origin: Option<&str>) -> Response<BoxBody> {
    with_cors(Response::builder(), origin)
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(full_body(text))
        .unwrap()
}

pub fn message_response(message: impl Into<String>, origin: Option<&str>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: message.into(),
        },
        origin,
    )
}

/// Map an error to its HTTP response.
///
/// Server-side failures are logged here and reach the client only as a
/// generic message.
pub fn error_response(err: &JananiError, origin: Option<&str>) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    json_response(
        status,
        &ErrorResponse {
            error: err.public_message(),
            code: Some(err.code().to_string()),
        },
        origin,
    )
}

/// Collapse a handler result into a response
pub fn respond<T: Serialize>(
    result: Result<T, JananiError>,
    origin: Option<&str>,
) -> Response<BoxBody> {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body, origin),
        Err(e) => error_response(&e, origin),
    }
}

pub fn not_found_response(path: &str, origin: Option<&str>) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path,
        }),
        origin,
    )
}

pub fn method_not_allowed(origin: Option<&str>) -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
        origin,
    )
}

/// CORS preflight response
pub fn cors_preflight(origin: Option<&str>) -> Response<BoxBody> {
    with_cors(Response::builder(), origin)
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T, JananiError>
where
    T: for<'de> Deserialize<'de>,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| JananiError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    serde_json::from_slice(&bytes).map_err(|e| JananiError::Validation(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_hides_server_detail() {
        let resp = error_response(&JananiError::Database("disk I/O error at /var/db".into()), None);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get("Access-Control-Allow-Origin").is_none());
    }

    #[test]
    fn test_cors_headers_follow_origin() {
        let resp = json_response(StatusCode::OK, &"ok", Some("https://janani.example"));
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "https://janani.example"
        );

        let preflight = cors_preflight(Some("*"));
        assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
        assert_eq!(preflight.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
    }

    #[test]
    fn test_parse_json_body() {
        #[derive(Deserialize)]
        struct Weight {
            weight: f64,
        }

        let req = Request::new(Full::new(Bytes::from(r#"{"weight": 61.5}"#)));
        let body: Weight = tokio_test::block_on(parse_json_body(req)).unwrap();
        assert_eq!(body.weight, 61.5);

        let req = Request::new(Full::new(Bytes::from("{not json")));
        let result: Result<Weight, _> = tokio_test::block_on(parse_json_body(req));
        assert!(matches!(result, Err(JananiError::Validation(_))));

        let oversized = format!(r#"{{"weight": 1, "pad": "{}"}}"#, "x".repeat(MAX_BODY_BYTES));
        let req = Request::new(Full::new(Bytes::from(oversized)));
        let result: Result<Weight, _> = tokio_test::block_on(parse_json_body(req));
        assert!(matches!(result, Err(JananiError::Validation(_))));
    }

    #[test]
    fn test_status_mapping() {
        let conflict = error_response(&JananiError::Conflict("Email already registered".into()), None);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        let forbidden = error_response(&JananiError::Forbidden("no".into()), None);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
