use axum::response::IntoResponse;
use http::header::{ALLOW, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use thiserror::Error;

/// An inbound HTTP request as handed over by the transport layer.
///
/// Headers are case-insensitive courtesy of `http::HeaderMap`. The body, when
/// present, has already been read to completion and decoded as UTF-8.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// An HTTP response ready to be written by the transport layer.
///
/// Also doubles as the shape consumed when interpreting a third party's
/// response to a forwarded lead.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Errors raised while normalizing an inbound lead submission.
///
/// Each variant maps to the HTTP status the poster should receive; the
/// rendered message is the response body. Nothing here is retryable.
#[derive(Error, Debug)]
pub enum InboundError {
    #[error("The {0} method is not allowed")]
    MethodNotAllowed(String),
    #[error("Not capable of generating content according to the Accept header")]
    NotAcceptable,
    #[error("Content-Type header is required")]
    MissingContentType,
    #[error("MIME type in Content-Type header is not supported. Use only {0}.")]
    UnsupportedContentType(String),
    #[error("Invalid redir_url")]
    InvalidRedirUrl,
    #[error("Unable to parse query string -- {0}.")]
    BadQuery(String),
    #[error("Unable to parse body -- {0}.")]
    BadBody(String),
    #[error("Body does not contain XML or XML is unparseable -- {0}.")]
    BadXmlBody(String),
}

impl InboundError {
    pub fn status(&self) -> StatusCode {
        match self {
            InboundError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            InboundError::NotAcceptable | InboundError::UnsupportedContentType(_) => {
                StatusCode::NOT_ACCEPTABLE
            }
            InboundError::MissingContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            InboundError::InvalidRedirUrl
            | InboundError::BadQuery(_)
            | InboundError::BadBody(_)
            | InboundError::BadXmlBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        if let InboundError::MethodNotAllowed(_) = self {
            headers.insert(ALLOW, HeaderValue::from_static("GET, POST"));
        }
        headers
    }

    /// Renders the error as the response the poster should receive.
    pub fn to_response(&self) -> Response {
        Response {
            status: self.status(),
            headers: self.headers(),
            body: self.to_string(),
        }
    }
}

impl IntoResponse for InboundError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), self.headers(), self.to_string()).into_response()
    }
}

pub(crate) fn content_length_header(headers: &mut HeaderMap, body: &str) {
    let len = HeaderValue::from_str(&body.len().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"));
    headers.insert(http::header::CONTENT_LENGTH, len);
}

pub(crate) fn location_header(headers: &mut HeaderMap, target: &str) {
    if let Ok(value) = HeaderValue::from_str(target) {
        headers.insert(LOCATION, value);
    }
}
