//! Pluggable request authentication for Axum.
//!
//! This crate provides a Tower middleware which asks an authentication
//! [`Strategy`] whether a request carries valid credentials. Authenticated
//! requests continue to the protected service; all others are handed to a
//! failure handler of your choosing.
//!
//! Two strategies are provided:
//!
//! 1. [`JwtStrategy`](jwt::JwtStrategy), which verifies a signed JSON Web
//!    Token, by default sent as a bearer token,
//! 2. [`LocalStrategy`](local::LocalStrategy), which reads a username and
//!    password from form data.
//!
//! Strategies can be combined with [`Composed`], which accepts a request as
//! soon as one of its strategies does. Any function with the right signature
//! can be used as a strategy via [`from_fn`].
//!
//! # Verification
//!
//! This crate only extracts credentials and checks what can be checked
//! without knowing your application: token signatures and expiry. Whether the
//! claims or credentials belong to an actual user is decided by the verify
//! function each strategy is built with. A verify function returns
//! `eyre::Result<()>`; its error message is kept as the reason for the
//! rejection.
//!
//! # Request bodies
//!
//! Urlencoded form submissions have their body buffered (up to
//! [`DEFAULT_BODY_LIMIT`] by default) before the strategy runs, so form
//! lookups see the whole body and the protected service still receives it
//! unchanged. Other bodies are never read; strategies see them as empty.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum::{routing::get, Router};
//! use axum_authn::{
//!     fallback::ResponseFallback, jwt::JwtStrategy, local::LocalStrategy,
//!     secrecy::ExposeSecret, AuthLayer, Strategy,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let token = JwtStrategy::builder()
//!         .secret(b"my secret")
//!         .verify(|claims| async move {
//!             match claims.get("user").and_then(|user| user.as_str()) {
//!                 Some("ferris") => Ok(()),
//!                 _ => Err(eyre::eyre!("not a valid user")),
//!             }
//!         })
//!         .build()
//!         .unwrap();
//!
//!     let password = LocalStrategy::builder()
//!         .verify(|credentials| async move {
//!             if credentials.username == "ferris"
//!                 && credentials.password.expose_secret() == "hunter42"
//!             {
//!                 Ok(())
//!             } else {
//!                 Err(eyre::eyre!("wrong username or password"))
//!             }
//!         })
//!         .build()
//!         .unwrap();
//!
//!     let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(token), Arc::new(password)];
//!     let auth_layer = AuthLayer::composed(ResponseFallback::new(), strategies).unwrap();
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "Welcome, Ferris!" }))
//!         .route_layer(auth_layer);
//!
//!     axum::Server::bind(&"0.0.0.0:3000".parse().unwrap())
//!         .serve(app.into_make_service())
//!         .await
//!         .unwrap();
//! }
//! ```

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod compose;
mod error;
pub mod fallback;
pub mod jwt;
pub mod local;
pub mod lookup;
mod middleware;
mod strategy;

pub use compose::Composed;
pub use error::{BuildError, Error, ErrorKind};
pub use jsonwebtoken;
pub use middleware::{
    AuthLayer, AuthLayerBuilder, Authenticate, AuthenticateLayer, DEFAULT_BODY_LIMIT,
};
pub use secrecy;
pub use strategy::{from_fn, AuthRequest, Strategy, StrategyFn};

/// The result of an authentication attempt.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;
