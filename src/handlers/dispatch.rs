//! Fallback handler: every request not served by a fixed route goes through the router.

use crate::error::AppError;
use crate::front::{dispatch, error_reply};
use crate::params::Params;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};

/// Decode the request body by content type: JSON objects and url-encoded forms.
pub fn body_params(headers: &HeaderMap, body: &[u8]) -> Result<Params, AppError> {
    if body.is_empty() {
        return Ok(Params::new());
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
        if !value.is_object() {
            return Err(AppError::BadRequest("body must be a JSON object".into()));
        }
        return Ok(Params::from_json(&value));
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let text = std::str::from_utf8(body)
            .map_err(|_| AppError::BadRequest("body is not valid UTF-8".into()))?;
        return Ok(Params::from_query(text));
    }
    Err(AppError::NotImplemented(format!(
        "REST format input not allowed: {}",
        if content_type.is_empty() { "unknown" } else { content_type.as_str() }
    )))
}

/// Body params are overridden by query params.
pub async fn dispatch_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = Params::from_query(uri.query().unwrap_or(""));
    let mut request = match body_params(&headers, &body) {
        Ok(p) => p,
        Err(e) => return error_reply(&state, &query, e).into_response(),
    };
    request.merge(query);
    tracing::debug!(method = %method, path = %uri.path(), "dispatch");
    dispatch(&state, &method, uri.path(), request).await.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(ct: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        h
    }

    #[test]
    fn decodes_json_and_forms() {
        let p = body_params(&headers("application/json; charset=utf-8"), br#"{"name": "Ann", "n": 2}"#).unwrap();
        assert_eq!(p.text("name"), Some("Ann"));
        assert_eq!(p.text("n"), Some("2"));
        let p = body_params(&headers("application/x-www-form-urlencoded"), b"a=1&b[]=2").unwrap();
        assert_eq!(p.text("a"), Some("1"));
    }

    #[test]
    fn rejects_other_bodies() {
        assert_eq!(body_params(&headers("text/csv"), b"a,b").unwrap_err().status(), 501);
        assert_eq!(body_params(&headers("application/json"), b"[1]").unwrap_err().status(), 400);
        assert!(body_params(&HeaderMap::new(), b"").unwrap().is_empty());
    }
}
