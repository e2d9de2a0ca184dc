//! Access/refresh token issuance (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub token_type: TokenKind,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies bearer tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Issue an access/refresh pair for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair { access: self.issue(user_id, TokenKind::Access)?, refresh: self.issue(user_id, TokenKind::Refresh)? })
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            token_type: kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Check signature, expiry and kind.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on any failure.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AuthError::InvalidToken
        })?;
        if data.claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_pair_verifies_by_kind() {
        let issuer = TokenIssuer::new(SECRET, 300, 86_400);
        let user = Uuid::now_v7();
        let pair = issuer.issue_pair(user).unwrap();

        assert_eq!(issuer.verify(&pair.access, TokenKind::Access).unwrap().sub, user);
        assert_eq!(issuer.verify(&pair.refresh, TokenKind::Refresh).unwrap().sub, user);
        assert!(matches!(issuer.verify(&pair.access, TokenKind::Refresh), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.verify(&pair.refresh, TokenKind::Access), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new(SECRET, -120, -120);
        let token = issuer.issue(Uuid::now_v7(), TokenKind::Access).unwrap();
        assert!(matches!(issuer.verify(&token, TokenKind::Access), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let issuer = TokenIssuer::new(SECRET, 300, 300);
        let other = TokenIssuer::new(b"another-secret-another-secret-xx", 300, 300);
        let token = other.issue(Uuid::now_v7(), TokenKind::Access).unwrap();
        assert!(matches!(issuer.verify(&token, TokenKind::Access), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer.verify("not-a-jwt", TokenKind::Access), Err(AuthError::InvalidToken)));
    }
}
