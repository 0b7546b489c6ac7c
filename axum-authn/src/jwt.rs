//! Authentication with JSON Web Tokens.

use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};

use crate::{error::BuildError, lookup, AuthRequest, Error, Result, Strategy};

/// The decoded payload of a verified token.
pub type Claims = serde_json::Map<String, serde_json::Value>;

type LookupFn = Arc<dyn Fn(&AuthRequest) -> Result<String> + Send + Sync>;
type KeyFn = Arc<dyn Fn(&Header) -> eyre::Result<DecodingKey> + Send + Sync>;
type VerifyFn = Arc<dyn Fn(Claims) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync>;

/// Authenticates requests carrying a signed JWT.
///
/// The token is looked up in the request (by default as a bearer token in the
/// `Authorization` header), its signature and registered claims are checked
/// with a key provided by the key resolver, and finally the claims are handed
/// to the application's verify function.
///
/// # Examples
///
/// ```rust
/// use axum_authn::jwt::JwtStrategy;
///
/// let strategy = JwtStrategy::builder()
///     .secret(b"my secret")
///     .verify(|claims| async move {
///         match claims.get("user").and_then(|user| user.as_str()) {
///             Some("ferris") => Ok(()),
///             _ => Err(eyre::eyre!("not a valid user")),
///         }
///     })
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct JwtStrategy {
    lookup: LookupFn,
    key: KeyFn,
    verify: VerifyFn,
    validation: Validation,
}

impl fmt::Debug for JwtStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtStrategy")
            .field("lookup", &"<function>")
            .field("key", &"<function>")
            .field("verify", &"<function>")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtStrategy {
    /// Creates a builder with the default lookup and validation.
    pub fn builder() -> JwtStrategyBuilder {
        JwtStrategyBuilder::new()
    }
}

#[async_trait]
impl Strategy for JwtStrategy {
    async fn authenticate(&self, request: &AuthRequest) -> Result<()> {
        let token = (self.lookup)(request)?;

        let header = jsonwebtoken::decode_header(&token)?;
        let key = (self.key)(&header).map_err(Error::KeyUnavailable)?;
        let data = jsonwebtoken::decode::<Claims>(&token, &key, &self.validation)?;

        (self.verify)(data.claims).await.map_err(Error::Rejected)
    }
}

/// The validation used unless one is configured.
///
/// Only `HS256` is accepted. No registered claim is required, but `exp` is
/// checked whenever present. The audience is left to the verify function.
pub fn default_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;
    validation
}

/// A builder for [`JwtStrategy`].
///
/// A key resolver and a verify function are required.
pub struct JwtStrategyBuilder {
    lookup: LookupFn,
    key: Option<KeyFn>,
    verify: Option<VerifyFn>,
    validation: Validation,
}

impl Default for JwtStrategyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtStrategyBuilder {
    /// Creates a builder looking up bearer tokens and using
    /// [`default_validation`].
    pub fn new() -> Self {
        Self {
            lookup: Arc::new(lookup::bearer_token()),
            key: None,
            verify: None,
            validation: default_validation(),
        }
    }

    /// Sets how the raw token is extracted from requests.
    ///
    /// See [`lookup`](crate::lookup) for the provided lookups.
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&AuthRequest) -> Result<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    /// Sets the function providing the key a token's signature is checked
    /// against, given the token's header.
    pub fn key_resolver<F>(mut self, key_resolver: F) -> Self
    where
        F: Fn(&Header) -> eyre::Result<DecodingKey> + Send + Sync + 'static,
    {
        self.key = Some(Arc::new(key_resolver));
        self
    }

    /// Checks every token against the same HMAC secret.
    pub fn secret(self, secret: &[u8]) -> Self {
        let key = DecodingKey::from_secret(secret);
        self.key_resolver(move |_| Ok(key.clone()))
    }

    /// Sets the function deciding whether the claims of a valid token are
    /// acceptable.
    pub fn verify<F, Fut>(mut self, verify: F) -> Self
    where
        F: Fn(Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        self.verify = Some(Arc::new(move |claims| verify(claims).boxed()));
        self
    }

    /// Replaces the validation entirely.
    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Sets the accepted signing algorithms.
    pub fn algorithms(mut self, algorithms: &[Algorithm]) -> Self {
        self.validation.algorithms = algorithms.to_vec();
        self
    }

    /// Sets the clock skew, in seconds, tolerated when checking `exp`.
    pub fn leeway(mut self, leeway: u64) -> Self {
        self.validation.leeway = leeway;
        self
    }

    /// Builds the strategy.
    pub fn build(self) -> std::result::Result<JwtStrategy, BuildError> {
        let verify = self
            .verify
            .ok_or(BuildError::MissingVerifier("JwtStrategy"))?;
        let key = self
            .key
            .ok_or(BuildError::MissingKeyResolver("JwtStrategy"))?;

        Ok(JwtStrategy {
            lookup: self.lookup,
            key,
            verify,
            validation: self.validation,
        })
    }
}
