//! Encoded response carried from a front to axum.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
    pub location: Option<String>,
}

impl Reply {
    pub fn ok(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Reply {
            status: StatusCode::OK,
            content_type: content_type.into(),
            body: body.into(),
            location: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// `301 Moved Permanently` to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Reply {
            status: StatusCode::MOVED_PERMANENTLY,
            content_type: "text/plain; charset=UTF-8".into(),
            body: String::new(),
            location: Some(location.into()),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut res = (self.status, self.body).into_response();
        let headers = res.headers_mut();
        if let Ok(v) = HeaderValue::from_str(&self.content_type) {
            headers.insert(header::CONTENT_TYPE, v);
        }
        if let Some(location) = self.location.as_deref().and_then(|l| HeaderValue::from_str(l).ok()) {
            headers.insert(header::LOCATION, location);
        }
        res
    }
}
