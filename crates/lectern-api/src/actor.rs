//! Acting-user extractor.
//!
//! The upstream auth layer resolves the session and passes the user id in the
//! `X-User-Id` header. Anything other than a positive integer is rejected with
//! 401 before a handler runs.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use lectern_core::proposal::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

/// Read the acting user directly from headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let id = headers
    .get(USER_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<UserId>().ok())
    .filter(|id| *id > 0)
    .ok_or(ApiError::Unauthenticated)?;
  Ok(Actor(id))
}

impl<S> FromRequestParts<S> for Actor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &'static str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_ID_HEADER, HeaderValue::from_static(value));
    h
  }

  #[test]
  fn positive_integer_is_accepted() {
    assert_eq!(actor_from_headers(&headers("42")).unwrap(), Actor(42));
  }

  #[test]
  fn missing_or_malformed_header_is_rejected() {
    assert!(actor_from_headers(&HeaderMap::new()).is_err());
    for bad in ["", "abc", "0", "-3", "1.5"] {
      assert!(
        matches!(actor_from_headers(&headers(bad)), Err(ApiError::Unauthenticated)),
        "accepted {bad:?}"
      );
    }
  }
}
