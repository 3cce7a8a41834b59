//! The resolved-identity extractor.
//!
//! Identity resolution (login, OTP, session tokens) happens in the
//! identity collaborator upstream of this service. Every inbound call
//! arrives with the already-resolved identity in three headers, which
//! this extractor reads and types. The core trusts the resolution and
//! performs no authentication itself.
//!
//! Headers:
//! - `x-party-id` -- the resolved party UUID
//! - `x-party-role` -- `host` or `bidder`
//! - `x-party-name` -- display name (shown in bid highlights)

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use encore_types::{Identity, PartyId, Role};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the resolved party UUID.
const PARTY_ID_HEADER: &str = "x-party-id";

/// Header carrying the caller's role.
const PARTY_ROLE_HEADER: &str = "x-party-role";

/// Header carrying the caller's display name.
const PARTY_NAME_HEADER: &str = "x-party-name";

/// The calling party, extracted from the resolved-identity headers.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    /// Ensure the caller acts under `role`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] on a role mismatch.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "this operation requires the {role} role"
            )))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing identity header {name}")))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let party = Uuid::parse_str(header(parts, PARTY_ID_HEADER)?)
            .map(PartyId::from)
            .map_err(|e| ApiError::Unauthorized(format!("invalid {PARTY_ID_HEADER}: {e}")))?;

        let role = Role::from_str(header(parts, PARTY_ROLE_HEADER)?)
            .map_err(|e| ApiError::Unauthorized(format!("invalid {PARTY_ROLE_HEADER}: {e}")))?;

        let display_name = header(parts, PARTY_NAME_HEADER)?.to_owned();

        Ok(Self(Identity {
            party,
            role,
            display_name,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn extracts_a_complete_identity() {
        let id = Uuid::now_v7();
        let mut parts = parts_with(&[
            (PARTY_ID_HEADER, &id.to_string()),
            (PARTY_ROLE_HEADER, "bidder"),
            (PARTY_NAME_HEADER, "Ava"),
        ]);
        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.0.party, PartyId::from(id));
        assert_eq!(caller.0.role, Role::Bidder);
        assert_eq!(caller.0.display_name, "Ava");
    }

    #[tokio::test]
    async fn missing_headers_are_unauthorized() {
        let mut parts = parts_with(&[]);
        let err = Caller::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let id = Uuid::now_v7();
        let mut parts = parts_with(&[
            (PARTY_ID_HEADER, &id.to_string()),
            (PARTY_ROLE_HEADER, "admin"),
            (PARTY_NAME_HEADER, "Ava"),
        ]);
        let err = Caller::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn role_guard_rejects_mismatches() {
        let caller = Caller(Identity {
            party: PartyId::new(),
            role: Role::Bidder,
            display_name: "Ava".to_owned(),
        });
        assert!(caller.require_role(Role::Bidder).is_ok());
        assert!(matches!(
            caller.require_role(Role::Host),
            Err(ApiError::Forbidden(_))
        ));
    }
}
