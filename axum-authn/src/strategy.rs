use std::{fmt, sync::Arc};

use async_trait::async_trait;
use axum::{body::Bytes, http::Request};

use crate::Result;

/// A request whose body has been buffered, as seen by strategies.
///
/// Strategies only ever borrow it, so any number of them can inspect the same
/// headers and body without affecting each other or the handler that
/// eventually receives the request.
pub type AuthRequest = Request<Bytes>;

/// A way of authenticating requests.
///
/// An implementation inspects the request and returns `Ok(())` when it
/// carries acceptable credentials. Any error means the request is not
/// authenticated by this strategy.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use axum_authn::{AuthRequest, Error, Strategy};
///
/// struct ApiKey(&'static str);
///
/// #[async_trait]
/// impl Strategy for ApiKey {
///     async fn authenticate(&self, request: &AuthRequest) -> axum_authn::Result<()> {
///         match request.headers().get("x-api-key") {
///             Some(key) if key == self.0 => Ok(()),
///             _ => Err(Error::CredentialsMissing),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Authenticates the request.
    async fn authenticate(&self, request: &AuthRequest) -> Result<()>;
}

#[async_trait]
impl<S> Strategy for Arc<S>
where
    S: Strategy + ?Sized,
{
    async fn authenticate(&self, request: &AuthRequest) -> Result<()> {
        (**self).authenticate(request).await
    }
}

#[async_trait]
impl<S> Strategy for Box<S>
where
    S: Strategy + ?Sized,
{
    async fn authenticate(&self, request: &AuthRequest) -> Result<()> {
        (**self).authenticate(request).await
    }
}

/// A [`Strategy`] backed by a plain function. See [`from_fn`].
#[derive(Clone)]
pub struct StrategyFn<F> {
    f: F,
}

impl<F> fmt::Debug for StrategyFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyFn")
            .field("f", &"<function>")
            .finish()
    }
}

/// Uses an ordinary function as a [`Strategy`].
///
/// ```rust
/// use axum_authn::{from_fn, Error};
///
/// let strategy = from_fn(|request| {
///     if request.uri().path().starts_with("/public") {
///         Ok(())
///     } else {
///         Err(Error::AuthenticationFailed)
///     }
/// });
/// ```
pub fn from_fn<F>(f: F) -> StrategyFn<F>
where
    F: Fn(&AuthRequest) -> Result<()> + Send + Sync,
{
    StrategyFn { f }
}

#[async_trait]
impl<F> Strategy for StrategyFn<F>
where
    F: Fn(&AuthRequest) -> Result<()> + Send + Sync,
{
    async fn authenticate(&self, request: &AuthRequest) -> Result<()> {
        (self.f)(request)
    }
}
