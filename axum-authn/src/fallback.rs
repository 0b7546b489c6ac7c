//! Ready-made failure handlers.
//!
//! Any `tower::Service` answering requests with a response can serve as the
//! failure handler of an [`AuthLayer`](crate::AuthLayer); axum handlers can be
//! turned into one with `into_service`. The [`ResponseFallback`] here covers
//! the common case of a fixed response.

use std::{
    convert::Infallible,
    future::{ready, Ready},
    task::{Context, Poll},
};

use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower::Service;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// A failure handler answering every request with the same response.
///
/// Unless configured otherwise that is `401 Unauthorized` with a plain text
/// body.
///
/// ```rust
/// use axum::http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode};
/// use axum_authn::fallback::ResponseFallback;
///
/// let fallback = ResponseFallback::text(StatusCode::UNAUTHORIZED, "Token required")
///     .with_header(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
/// ```
#[derive(Clone, Debug)]
pub struct ResponseFallback {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for ResponseFallback {
    fn default() -> Self {
        Self::text(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl ResponseFallback {
    /// `401 Unauthorized`, as plain text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Responds with `status` and a plain text body.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(status, TEXT_PLAIN, body.into())
    }

    /// Responds with `status` and an HTML body.
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(status, TEXT_HTML, body.into())
    }

    fn with_content_type(status: StatusCode, content_type: &'static str, body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

        Self {
            status,
            headers,
            body: Bytes::from(body),
        }
    }

    /// Replaces the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Replaces the body, keeping the content type.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a response header, replacing any earlier value of the same name.
    /// This includes `Content-Type`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The status code responded with.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn respond(&self) -> Response {
        let mut response = (self.status, self.body.clone()).into_response();
        response.headers_mut().extend(self.headers.clone());
        response
    }
}

impl<B> Service<Request<B>> for ResponseFallback {
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _request: Request<B>) -> Self::Future {
        ready(Ok(self.respond()))
    }
}
