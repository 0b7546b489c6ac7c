//! Functions which extract raw, unverified credential material from requests.
//!
//! Strategies use these by default; any function with the same shape can be
//! given to a strategy builder instead.

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, HeaderName, Method,
};
use secrecy::SecretString;

use crate::{AuthRequest, Error, Result};

/// Scheme prefix required by [`bearer_token`]. Matched exactly, including
/// case and the trailing space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Default name of the username form field.
pub const DEFAULT_USERNAME_FIELD: &str = "username";

/// Default name of the password form field.
pub const DEFAULT_PASSWORD_FIELD: &str = "password";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A username and password pair extracted from a request.
///
/// The password is kept secret so it does not end up in logs by way of
/// `Debug`.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The submitted username.
    pub username: String,
    /// The submitted password.
    pub password: SecretString,
}

/// Looks up the whole value of the given header.
///
/// Fails with [`Error::TokenNotFound`] when the header is absent, empty or
/// not visible ASCII.
pub fn header(name: HeaderName) -> impl Fn(&AuthRequest) -> Result<String> + Clone + Send + Sync {
    move |request: &AuthRequest| header_value(request, &name).map(str::to_owned)
}

/// Looks up a bearer token in the `Authorization` header.
pub fn bearer_token() -> impl Fn(&AuthRequest) -> Result<String> + Clone + Send + Sync {
    bearer_header(AUTHORIZATION)
}

/// Looks up a bearer token in the given header.
///
/// The value must start with [`BEARER_PREFIX`]; the prefix is stripped from
/// the returned token.
pub fn bearer_header(
    name: HeaderName,
) -> impl Fn(&AuthRequest) -> Result<String> + Clone + Send + Sync {
    move |request: &AuthRequest| {
        header_value(request, &name)?
            .strip_prefix(BEARER_PREFIX)
            .map(str::to_owned)
            .ok_or_else(|| Error::TokenNotFound {
                header: name.clone(),
            })
    }
}

fn header_value<'a>(request: &'a AuthRequest, name: &HeaderName) -> Result<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::TokenNotFound {
            header: name.clone(),
        })
}

/// Looks up credentials in form data.
///
/// Values are read from a urlencoded body (for `POST`, `PUT` and `PATCH`
/// requests) and then from the query string; body values take precedence.
/// Fails with [`Error::CredentialsMissing`] if either field is missing or
/// empty.
pub fn form_credentials(
    username_field: &str,
    password_field: &str,
) -> impl Fn(&AuthRequest) -> Result<Credentials> + Clone + Send + Sync {
    let username_field = username_field.to_owned();
    let password_field = password_field.to_owned();

    move |request: &AuthRequest| {
        let values = form_values(request)?;
        let field = |name: &str| {
            values
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .filter(|value| !value.is_empty())
        };

        match (field(&username_field), field(&password_field)) {
            (Some(username), Some(password)) => Ok(Credentials {
                username,
                password: SecretString::new(password),
            }),
            _ => Err(Error::CredentialsMissing),
        }
    }
}

fn form_values(request: &AuthRequest) -> Result<Vec<(String, String)>> {
    let mut values = Vec::new();

    if is_form_submission(request.method(), request.headers()) {
        let body = std::str::from_utf8(request.body())
            .map_err(|err| Error::MalformedForm(err.to_string()))?;
        values.extend(decode(body)?);
    }

    if let Some(query) = request.uri().query() {
        values.extend(decode(query)?);
    }

    Ok(values)
}

fn decode(input: &str) -> Result<Vec<(String, String)>> {
    check_escapes(input)?;
    serde_urlencoded::from_str(input).map_err(|err| Error::MalformedForm(err.to_string()))
}

// The urlencoded decoder passes invalid escapes through verbatim.
fn check_escapes(input: &str) -> Result<()> {
    let bytes = input.as_bytes();
    for (at, _) in input.match_indices('%') {
        let valid = bytes
            .get(at + 1..at + 3)
            .map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(Error::MalformedForm(format!(
                "invalid percent escape at byte {at}"
            )));
        }
    }

    Ok(())
}

/// Whether a request of this shape carries a urlencoded form body that
/// lookups read: a `POST`, `PUT` or `PATCH` with a form content type.
pub(crate) fn is_form_submission(method: &Method, headers: &HeaderMap) -> bool {
    if ![Method::POST, Method::PUT, Method::PATCH].contains(method) {
        return false;
    }

    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        .unwrap_or(false)
}
