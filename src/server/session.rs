//! Session identity carried in the `sid` cookie.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::storage::SessionId;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// Session of the current request.
#[derive(Clone, Debug)]
pub struct Session {
    /// Opaque session key.
    pub id: SessionId,
    /// True when the id was generated for this request.
    pub is_new: bool,
}

impl Session {
    /// Read the session from request headers, generating a fresh id when
    /// the cookie is absent or implausible.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookie_value(headers, SESSION_COOKIE).and_then(|v| SessionId::parse(&v)) {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: SessionId::generate(),
                is_new: true,
            },
        }
    }

    /// `Set-Cookie` value for a newly issued session.
    #[must_use]
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.is_new {
            return None;
        }
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/",
            self.id
        ))
        .ok()
    }

    /// Attach the session cookie, if newly issued, to a response.
    pub fn respond(&self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if let Some(cookie) = self.set_cookie() {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        response
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}
