//! Run with
//!
//! ```not_rust
//! cargo run -p demo-password-and-token
//! ```
//!
//! Then log in with a form to get a token, and use either the token or the
//! form credentials to reach the protected route:
//!
//! ```not_rust
//! curl -d 'username=ferris&password=hunter42' localhost:3000/login
//! curl -H 'Authorization: Bearer <token>' localhost:3000/protected
//! curl -d 'username=ferris&password=hunter42' localhost:3000/protected
//! ```

use std::{collections::HashMap, sync::Arc};

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Router,
};
use axum_authn::{
    fallback::ResponseFallback,
    jsonwebtoken::{self, EncodingKey},
    jwt::{Claims, JwtStrategy},
    local::LocalStrategy,
    lookup::Credentials,
    secrecy::ExposeSecret,
    AuthLayer, Strategy,
};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SECRET: &[u8] = b"an example secret, use a generated one";

#[derive(Clone)]
struct Users {
    passwords: Arc<HashMap<String, String>>,
}

impl Users {
    fn with_ferris() -> Self {
        let mut passwords = HashMap::new();
        passwords.insert("ferris".to_string(), "hunter42".to_string());
        Self {
            passwords: Arc::new(passwords),
        }
    }

    fn check_password(&self, credentials: &Credentials) -> eyre::Result<()> {
        match self.passwords.get(&credentials.username) {
            Some(password) if password == credentials.password.expose_secret() => Ok(()),
            _ => Err(eyre::eyre!("wrong username or password")),
        }
    }

    fn check_claims(&self, claims: &Claims) -> eyre::Result<()> {
        let user = claims
            .get("user")
            .and_then(|user| user.as_str())
            .ok_or_else(|| eyre::eyre!("token has no user"))?;

        if self.passwords.contains_key(user) {
            Ok(())
        } else {
            Err(eyre::eyre!("unknown user {user}"))
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "axum_authn=debug,demo_password_and_token=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    let users = Users::with_ferris();

    let token = JwtStrategy::builder()
        .secret(SECRET)
        .verify({
            let users = users.clone();
            move |claims: Claims| {
                let checked = users.check_claims(&claims);
                async move { checked }
            }
        })
        .build()?;

    let password = LocalStrategy::builder()
        .verify({
            let users = users.clone();
            move |credentials: Credentials| {
                let checked = users.check_password(&credentials);
                async move { checked }
            }
        })
        .build()?;

    async fn login_handler(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
        // The layer has already verified the form; only the name is needed here.
        let user = form.get("username").cloned().unwrap_or_default();
        let claims = json!({ "user": user, "exp": jsonwebtoken::get_current_timestamp() + 3600 });

        match jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        ) {
            Ok(token) => (StatusCode::OK, token),
            Err(err) => {
                tracing::error!("could not issue token: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }

    async fn protected_handler() -> impl IntoResponse {
        "Welcome to the protected area :)"
    }

    let protected_strategies: Vec<Arc<dyn Strategy>> =
        vec![Arc::new(token), Arc::new(password.clone())];

    let app = Router::new()
        .route("/protected", get(protected_handler).post(protected_handler))
        .route_layer(AuthLayer::composed(
            ResponseFallback::new()
                .with_header(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer")),
            protected_strategies,
        )?)
        .merge(
            Router::new()
                .route("/login", post(login_handler))
                .route_layer(AuthLayer::new(
                    ResponseFallback::text(StatusCode::UNAUTHORIZED, "Invalid credentials"),
                    password,
                )),
        );

    tracing::info!("listening on 0.0.0.0:3000");
    axum::Server::bind(&"0.0.0.0:3000".parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
