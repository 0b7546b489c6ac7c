//! Authentication with a username and password submitted as form data.

use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};

use crate::{
    error::BuildError,
    lookup::{self, Credentials, DEFAULT_PASSWORD_FIELD, DEFAULT_USERNAME_FIELD},
    AuthRequest, Error, Result, Strategy,
};

type LookupFn = Arc<dyn Fn(&AuthRequest) -> Result<Credentials> + Send + Sync>;
type VerifyFn = Arc<dyn Fn(Credentials) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync>;

/// Authenticates requests with a username and password.
///
/// By default the credentials are read from the `username` and `password`
/// form fields. Checking them, typically against a user store, is the job of
/// the verify function.
///
/// # Examples
///
/// ```rust
/// use axum_authn::{local::LocalStrategy, secrecy::ExposeSecret};
///
/// let strategy = LocalStrategy::builder()
///     .verify(|credentials| async move {
///         if credentials.username == "ferris" && credentials.password.expose_secret() == "hunter42" {
///             Ok(())
///         } else {
///             Err(eyre::eyre!("wrong username or password"))
///         }
///     })
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct LocalStrategy {
    lookup: LookupFn,
    verify: VerifyFn,
}

impl fmt::Debug for LocalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStrategy")
            .field("lookup", &"<function>")
            .field("verify", &"<function>")
            .finish()
    }
}

impl LocalStrategy {
    /// Creates a builder reading the default form fields.
    pub fn builder() -> LocalStrategyBuilder {
        LocalStrategyBuilder::new()
    }
}

#[async_trait]
impl Strategy for LocalStrategy {
    async fn authenticate(&self, request: &AuthRequest) -> Result<()> {
        let credentials = (self.lookup)(request)?;
        (self.verify)(credentials).await.map_err(Error::Rejected)
    }
}

/// A builder for [`LocalStrategy`].
pub struct LocalStrategyBuilder {
    lookup: LookupFn,
    verify: Option<VerifyFn>,
}

impl Default for LocalStrategyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStrategyBuilder {
    /// Creates a builder reading the `username` and `password` form fields.
    pub fn new() -> Self {
        Self {
            lookup: Arc::new(lookup::form_credentials(
                DEFAULT_USERNAME_FIELD,
                DEFAULT_PASSWORD_FIELD,
            )),
            verify: None,
        }
    }

    /// Sets how credentials are extracted from requests.
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&AuthRequest) -> Result<Credentials> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    /// Reads credentials from the given form fields instead of the defaults.
    pub fn fields(self, username_field: &str, password_field: &str) -> Self {
        self.lookup(lookup::form_credentials(username_field, password_field))
    }

    /// Sets the function deciding whether credentials are acceptable.
    pub fn verify<F, Fut>(mut self, verify: F) -> Self
    where
        F: Fn(Credentials) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        self.verify = Some(Arc::new(move |credentials| verify(credentials).boxed()));
        self
    }

    /// Builds the strategy.
    pub fn build(self) -> std::result::Result<LocalStrategy, BuildError> {
        let verify = self
            .verify
            .ok_or(BuildError::MissingVerifier("LocalStrategy"))?;

        Ok(LocalStrategy {
            lookup: self.lookup,
            verify,
        })
    }
}
