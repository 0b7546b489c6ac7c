use std::{convert::Infallible, fmt, marker::PhantomData, sync::Arc};

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{Request, Response},
};
use futures::future::BoxFuture;
use http_body::Limited;
use tower::{BoxError, Service, ServiceExt};
use tower_http::auth::{AsyncAuthorizeRequest, AsyncRequireAuthorizationLayer};

use crate::{error::BuildError, lookup::is_form_submission, AuthRequest, Composed, Strategy};

/// Largest form body buffered for strategies unless configured otherwise.
///
/// This matches axum's own default body limit.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// The layer produced by [`AuthLayer`].
pub type AuthenticateLayer<St, F, ResBody> =
    AsyncRequireAuthorizationLayer<Authenticate<St, F, ResBody>>;

/// Authorizes requests with a [`Strategy`], handing rejected requests to a
/// failure handler.
///
/// Only urlencoded form submissions (`POST`, `PUT` or `PATCH`) have their body
/// buffered, since that is the only body a lookup reads; the protected service
/// and the failure handler then receive a body rebuilt from the same bytes.
/// Every other request is authenticated with an empty body in its place and
/// forwarded with its original body, unread. The failure handler is not told
/// why authentication failed.
///
/// This is used through [`AuthLayer`].
pub struct Authenticate<St: ?Sized, F, ResBody> {
    strategy: Arc<St>,
    failure: F,
    body_limit: usize,
    _body_type: PhantomData<fn() -> ResBody>,
}

impl<St: ?Sized, F: Clone, ResBody> Clone for Authenticate<St, F, ResBody> {
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
            failure: self.failure.clone(),
            body_limit: self.body_limit,
            _body_type: PhantomData,
        }
    }
}

impl<St: ?Sized, F: fmt::Debug, ResBody> fmt::Debug for Authenticate<St, F, ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticate")
            .field("strategy", &"<strategy>")
            .field("failure", &self.failure)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

impl<B, St, F, ResBody> AsyncAuthorizeRequest<B> for Authenticate<St, F, ResBody>
where
    B: HttpBody + From<Bytes> + Default + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    St: Strategy + ?Sized + 'static,
    F: Service<Request<B>, Response = Response<ResBody>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    F::Future: Send + 'static,
    ResBody: Send + 'static,
{
    type RequestBody = B;
    type ResponseBody = ResBody;
    type Future = BoxFuture<'static, Result<Request<B>, Response<ResBody>>>;

    fn authorize(&mut self, request: Request<B>) -> Self::Future {
        let strategy = Arc::clone(&self.strategy);
        let failure = self.failure.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            let (parts, body) = request.into_parts();

            let (outcome, request) = if is_form_submission(&parts.method, &parts.headers) {
                let bytes = match hyper::body::to_bytes(Limited::new(body, body_limit)).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::warn!(uri = %parts.uri, "could not buffer form body: {err}");
                        let request = Request::from_parts(parts, B::default());
                        return Err(reject(failure, request).await);
                    }
                };

                let request: AuthRequest = Request::from_parts(parts, bytes);
                let outcome = strategy.authenticate(&request).await;
                let (parts, bytes) = request.into_parts();
                (outcome, Request::from_parts(parts, B::from(bytes)))
            } else {
                let request: AuthRequest = Request::from_parts(parts, Bytes::new());
                let outcome = strategy.authenticate(&request).await;
                let (parts, _) = request.into_parts();
                (outcome, Request::from_parts(parts, body))
            };

            match outcome {
                Ok(()) => Ok(request),
                Err(err) => {
                    tracing::debug!(
                        uri = %request.uri(),
                        kind = ?err.kind(),
                        "authentication failed: {err}"
                    );
                    Err(reject(failure, request).await)
                }
            }
        })
    }
}

async fn reject<B, F, ResBody>(failure: F, request: Request<B>) -> Response<ResBody>
where
    F: Service<Request<B>, Response = Response<ResBody>, Error = Infallible>,
{
    match failure.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Constructors for authentication layers.
///
/// Each returns a [`tower::Layer`]: given the protected service it produces
/// the service that authenticates requests before reaching it.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{routing::get, Router};
/// use axum_authn::{fallback::ResponseFallback, jwt::JwtStrategy, AuthLayer};
///
/// # async fn run() {
/// let strategy = JwtStrategy::builder()
///     .secret(b"secret")
///     .verify(|_claims| async { Ok(()) })
///     .build()
///     .unwrap();
///
/// let app = Router::new()
///     .route("/protected", get(|| async { "Hello, authenticated user!" }))
///     .route_layer(AuthLayer::new(ResponseFallback::new(), strategy));
///
/// axum::Server::bind(&"0.0.0.0:3000".parse().unwrap())
///     .serve(app.into_make_service())
///     .await
///     .unwrap();
/// # }
/// ```
pub struct AuthLayer;

impl AuthLayer {
    /// Authenticates requests with `strategy`, sending failures to `failure`.
    pub fn new<St, F, ResBody>(failure: F, strategy: St) -> AuthenticateLayer<St, F, ResBody>
    where
        St: Strategy + 'static,
        F: Service<Request<Body>, Response = Response<ResBody>, Error = Infallible> + Clone,
    {
        Self::builder(failure, strategy).build()
    }

    /// Authenticates requests with the first of `strategies` that succeeds.
    pub fn composed<F, ResBody>(
        failure: F,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Result<AuthenticateLayer<Composed, F, ResBody>, BuildError>
    where
        F: Service<Request<Body>, Response = Response<ResBody>, Error = Infallible> + Clone,
    {
        Ok(Self::new(failure, Composed::new(strategies)?))
    }

    /// Starts a layer with further configuration.
    pub fn builder<St, F, ResBody>(failure: F, strategy: St) -> AuthLayerBuilder<St, F, ResBody>
    where
        St: Strategy + 'static,
        F: Service<Request<Body>, Response = Response<ResBody>, Error = Infallible> + Clone,
    {
        AuthLayerBuilder {
            strategy: Arc::new(strategy),
            failure,
            body_limit: DEFAULT_BODY_LIMIT,
            _body_type: PhantomData,
        }
    }
}

/// A builder for authentication layers. See [`AuthLayer::builder`].
pub struct AuthLayerBuilder<St: ?Sized, F, ResBody> {
    strategy: Arc<St>,
    failure: F,
    body_limit: usize,
    _body_type: PhantomData<fn() -> ResBody>,
}

impl<St: ?Sized, F, ResBody> AuthLayerBuilder<St, F, ResBody> {
    /// Sets the largest form body, in bytes, buffered for strategies. Form
    /// submissions with larger bodies fail authentication; other requests are
    /// never buffered.
    pub fn body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Builds the layer.
    pub fn build(self) -> AuthenticateLayer<St, F, ResBody> {
        AsyncRequireAuthorizationLayer::new(Authenticate {
            strategy: self.strategy,
            failure: self.failure,
            body_limit: self.body_limit,
            _body_type: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::task::{Context, Poll};

    use axum::http::{header::CONTENT_TYPE, Method, StatusCode};
    use tower::Layer;

    use super::*;
    use crate::{from_fn, local::LocalStrategy, Error};

    /// Counts its calls and echoes the request body back with a fixed status.
    #[derive(Clone)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        status: StatusCode,
    }

    impl Service<Request<Body>> for Counting {
        type Response = Response<Body>;
        type Error = Infallible;
        type Future = BoxFuture<'static, Result<Response<Body>, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: Request<Body>) -> Self::Future {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self.status;
            Box::pin(async move {
                let body = hyper::body::to_bytes(request.into_body()).await.unwrap();
                Ok(Response::builder()
                    .status(status)
                    .body(Body::from(body))
                    .unwrap())
            })
        }
    }

    fn counting(calls: &Arc<AtomicUsize>, status: StatusCode) -> Counting {
        Counting {
            calls: calls.clone(),
            status,
        }
    }

    struct Handlers {
        protected: Arc<AtomicUsize>,
        failure: Arc<AtomicUsize>,
    }

    impl Handlers {
        fn new() -> Self {
            Self {
                protected: Arc::new(AtomicUsize::new(0)),
                failure: Arc::new(AtomicUsize::new(0)),
            }
        }

        async fn call<St>(&self, strategy: St, request: Request<Body>) -> Response<Body>
        where
            St: Strategy + 'static,
        {
            let layer = AuthLayer::new(
                counting(&self.failure, StatusCode::UNAUTHORIZED),
                strategy,
            );
            layer
                .layer(counting(&self.protected, StatusCode::OK))
                .oneshot(request)
                .await
                .unwrap()
        }

        fn counts(&self) -> (usize, usize) {
            (
                self.protected.load(Ordering::SeqCst),
                self.failure.load(Ordering::SeqCst),
            )
        }
    }

    #[tokio::test]
    async fn success_runs_protected_handler_once() {
        let handlers = Handlers::new();
        let response = handlers
            .call(from_fn(|_| Ok(())), Request::new(Body::empty()))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(handlers.counts(), (1, 0));
    }

    #[tokio::test]
    async fn failure_runs_failure_handler() {
        let handlers = Handlers::new();
        let response = handlers
            .call(
                from_fn(|_| Err(Error::CredentialsMissing)),
                Request::new(Body::empty()),
            )
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(handlers.counts(), (0, 1));
    }

    fn login(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn local() -> LocalStrategy {
        LocalStrategy::builder()
            .verify(|credentials| async move {
                if credentials.username == "test" {
                    Ok(())
                } else {
                    Err(eyre::eyre!("wrong username or password"))
                }
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn protected_handler_sees_original_body() {
        let handlers = Handlers::new();
        let response = handlers
            .call(local(), login("username=test&password=test"))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"username=test&password=test");
    }

    #[tokio::test]
    async fn failure_handler_sees_original_body() {
        let handlers = Handlers::new();
        let response = handlers
            .call(local(), login("username=nope&password=test"))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(handlers.counts(), (0, 1));
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"username=nope&password=test");
    }

    #[tokio::test]
    async fn oversized_form_body_fails() {
        let protected = Arc::new(AtomicUsize::new(0));
        let failure = Arc::new(AtomicUsize::new(0));
        let layer = AuthLayer::builder(
            counting(&failure, StatusCode::UNAUTHORIZED),
            from_fn(|_| Ok(())),
        )
        .body_limit(4)
        .build();

        let response = layer
            .layer(counting(&protected, StatusCode::OK))
            .oneshot(login("username=test&password=test"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(protected.load(Ordering::SeqCst), 0);
        assert_eq!(failure.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn large_non_form_body_is_forwarded_unread() {
        let handlers = Handlers::new();
        let upload = vec![7u8; DEFAULT_BODY_LIMIT + 1024 * 1024];
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(upload.clone()))
            .unwrap();

        let response = handlers
            .call(
                from_fn(|request| match request.body().is_empty() {
                    true => Ok(()),
                    false => Err(Error::AuthenticationFailed),
                }),
                request,
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(handlers.counts(), (1, 0));
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body.len(), upload.len());
    }

    #[tokio::test]
    async fn layer_is_reusable() {
        let handlers = Handlers::new();
        let layer = AuthLayer::new(
            counting(&handlers.failure, StatusCode::UNAUTHORIZED),
            local(),
        );
        let service = layer.layer(counting(&handlers.protected, StatusCode::OK));

        for body in ["username=test&password=a", "username=other&password=b"] {
            service.clone().oneshot(login(body)).await.unwrap();
        }
        assert_eq!(handlers.counts(), (1, 1));
    }

    #[test]
    fn composed_requires_strategies() {
        let result = AuthLayer::composed(
            counting(&Arc::new(AtomicUsize::new(0)), StatusCode::UNAUTHORIZED),
            Vec::new(),
        );
        assert!(matches!(result, Err(BuildError::NoStrategies)));
    }
}
