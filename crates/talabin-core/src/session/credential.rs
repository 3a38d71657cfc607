use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Access/refresh token pair.
///
/// Tokens are secrets: `Debug` redacts them and nothing in this crate
/// logs them.
#[derive(Clone)]
pub struct Credential {
    access: SecretString,
    refresh: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Build a credential, taking the expiry from the access token's JWT
    /// `exp` claim when it has one.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        let access = access.into();
        let expires_at = jwt_expiry(&access);
        Self {
            access: SecretString::from(access),
            refresh: SecretString::from(refresh.into()),
            expires_at,
        }
    }

    /// Override the derived expiry.
    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access
    }

    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A credential without a known expiry never expires client-side.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The token pair after a refresh. A missing refresh token keeps the
    /// current one.
    pub fn refreshed(&self, access: String, refresh: Option<String>) -> Self {
        let next = Self::new(access, String::new());
        Self {
            refresh: refresh.map_or_else(|| self.refresh.clone(), SecretString::from),
            ..next
        }
    }

    /// `Bearer <access>` header value.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.access.expose_secret())
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.access.expose_secret() == other.access.expose_secret()
            && self.refresh.expose_secret() == other.refresh.expose_secret()
            && self.expires_at == other.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Read `exp` from a JWT payload without verifying the signature; the
/// server is the authority, this only predicts expiry.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","exp":{exp}}}"#));
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn expiry_is_derived_from_jwt_exp() {
        let cred = Credential::new(jwt_with_exp(1_900_000_000), "R1");
        assert_eq!(
            cred.expires_at(),
            Some(Utc.timestamp_opt(1_900_000_000, 0).unwrap())
        );
        assert!(!cred.is_expired_at(Utc.timestamp_opt(1_899_999_999, 0).unwrap()));
        assert!(cred.is_expired_at(Utc.timestamp_opt(1_900_000_000, 0).unwrap()));
    }

    #[test]
    fn opaque_tokens_never_expire() {
        let cred = Credential::new("A1", "R1");
        assert_eq!(cred.expires_at(), None);
        assert!(!cred.is_expired());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let cred = Credential::new("super-secret-access", "super-secret-refresh");
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn refresh_without_rotation_keeps_refresh_token() {
        let cred = Credential::new("A1", "R1");
        let next = cred.refreshed("A2".into(), None);
        assert_eq!(next.access_token().expose_secret(), "A2");
        assert_eq!(next.refresh_token().expose_secret(), "R1");

        let rotated = cred.refreshed("A3".into(), Some("R3".into()));
        assert_eq!(rotated.refresh_token().expose_secret(), "R3");
    }

    #[test]
    fn bearer_header_uses_access_token() {
        assert_eq!(Credential::new("A1", "R1").bearer(), "Bearer A1");
    }
}
