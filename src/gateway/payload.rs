//! Request body extractor
//!
//! Bodies are read on every method, GET included: the search routes take
//! their `keyword` from the body. JSON and urlencoded forms are understood;
//! any other (or missing) body reads as an empty object.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::{Map, Value};

use super::error::ApiError;

/// Parsed request body, always a JSON value
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

fn body_kind(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Other;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if mime == "application/json" || mime.ends_with("+json") {
        BodyKind::Json
    } else if mime == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Decode an urlencoded form; every value is a string
pub fn parse_form_body(bytes: &[u8]) -> Value {
    let fields = url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Value::Object(fields)
}

/// Decode a JSON body; blank bodies are an empty object
pub fn parse_json_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(empty_object());
    }
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::warn!(error = %e, "malformed JSON body");
        ApiError::OperationFailed(format!("Invalid JSON body: {}", e))
    })
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let kind = body_kind(
            req.headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        if kind == BodyKind::Other {
            return Ok(Payload(empty_object()));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::OperationFailed(e.body_text()))?;
        match kind {
            BodyKind::Json => Ok(Payload(parse_json_body(&bytes)?)),
            BodyKind::Form => Ok(Payload(parse_form_body(&bytes))),
            BodyKind::Other => Ok(Payload(empty_object())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_kind_from_content_type() {
        assert_eq!(body_kind(Some("application/json")), BodyKind::Json);
        assert_eq!(
            body_kind(Some("Application/JSON; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(body_kind(Some("application/merge-patch+json")), BodyKind::Json);
        assert_eq!(
            body_kind(Some("application/x-www-form-urlencoded")),
            BodyKind::Form
        );
        assert_eq!(body_kind(Some("text/plain")), BodyKind::Other);
        assert_eq!(body_kind(None), BodyKind::Other);
    }

    #[test]
    fn test_blank_json_body_is_empty_object() {
        assert_eq!(parse_json_body(b"").unwrap(), json!({}));
        assert_eq!(parse_json_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_json_body_fails() {
        let err = parse_json_body(b"{\"keyword\":").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_form_body_values_are_strings() {
        assert_eq!(
            parse_form_body(b"name=Li+Na&credit=12.5"),
            json!({"name": "Li Na", "credit": "12.5"})
        );
        assert_eq!(parse_form_body(b""), json!({}));
    }

    #[test]
    fn test_json_body_is_forwarded_verbatim() {
        assert_eq!(
            parse_json_body(br#"{"keyword":"Li","extra":[1]}"#).unwrap(),
            json!({"keyword": "Li", "extra": [1]})
        );
    }
}
