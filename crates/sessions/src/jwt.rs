//! Token codec: signed, expiring access/refresh tokens.
//!
//! Both token kinds are HS256-signed JWTs carrying the owning principal and
//! the session id. Staff and student codecs hold distinct secrets, so a token
//! minted for one kind can never verify against the other. Only the SHA-256
//! hash of a refresh token is ever stored server-side.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use campus_core::principal::{Principal, PrincipalKind};
use campus_core::types::DbId;

use crate::error::{SessionError, SessionResult};

/// Declared purpose of a token, embedded in its claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in every campus token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the principal's internal database id.
    pub sub: DbId,
    /// College the principal belongs to.
    pub cid: DbId,
    /// Principal kind the token was minted for.
    pub kind: PrincipalKind,
    /// Declared token type (access vs refresh).
    pub typ: TokenKind,
    /// Session id the token is bound to.
    pub sid: Uuid,
    /// Unique token identifier. Guarantees that rotation always produces a
    /// new token string (and therefore a new hash) even within one second.
    pub jti: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// Minimum revocation lifetime, tolerating clock skew between issuer and
/// store when a retired token is close to its own expiry.
const MIN_REVOCATION_TTL_SECS: u64 = 60;

/// Encoder/verifier for one principal kind's tokens.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    kind: PrincipalKind,
    /// HMAC-SHA256 secret scoped to `kind`.
    secret: String,
    /// Access token lifetime in minutes.
    access_ttl_mins: i64,
    /// Refresh token lifetime (= session lifetime) in days.
    refresh_ttl_days: i64,
}

impl TokenCodec {
    pub fn new(
        kind: PrincipalKind,
        secret: String,
        access_ttl_mins: i64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            kind,
            secret,
            access_ttl_mins,
            refresh_ttl_days,
        }
    }

    /// The principal kind this codec signs for.
    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Access token lifetime in seconds (the `expires_in` the API reports).
    pub fn access_expires_in(&self) -> i64 {
        self.access_ttl_mins * 60
    }

    /// Session lifetime, fixed at creation.
    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_ttl_days)
    }

    /// Maximum possible refresh-token lifetime in seconds. Conservative
    /// revocation TTL when a retired token's expiry cannot be read.
    pub fn max_refresh_ttl_secs(&self) -> u64 {
        (self.refresh_ttl_days * 86_400).max(0) as u64
    }

    /// Mint a signed token of the given kind bound to `session_id`.
    pub fn issue(
        &self,
        principal: &Principal,
        typ: TokenKind,
        session_id: Uuid,
    ) -> SessionResult<String> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = match typ {
            TokenKind::Access => self.access_ttl_mins * 60,
            TokenKind::Refresh => self.refresh_ttl_days * 86_400,
        };

        let claims = Claims {
            sub: principal.id,
            cid: principal.college_id,
            kind: self.kind,
            typ,
            sid: session_id,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl_secs,
        };

        encode(
            &Header::default(), // HS256
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SessionError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify signature and expiry, returning the embedded [`Claims`].
    ///
    /// Tokens signed for the other principal kind fail here: either the
    /// signature does not verify (different secret), or -- were the secrets
    /// ever misconfigured to match -- the `kind` claim check rejects them.
    pub fn decode(&self, token: &str) -> SessionResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(), // HS256, validates exp with leeway
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::TokenExpired,
            _ => SessionError::InvalidToken,
        })?;

        if token_data.claims.kind != self.kind {
            return Err(SessionError::InvalidToken);
        }
        Ok(token_data.claims)
    }

    /// Reject claims whose declared type is not `expected`.
    pub fn validate_type(&self, claims: &Claims, expected: TokenKind) -> SessionResult<()> {
        if claims.typ != expected {
            return Err(SessionError::InvalidToken);
        }
        Ok(())
    }

    /// Remaining lifetime of a token in seconds, read from its `exp` claim
    /// WITHOUT signature verification, floored at [`MIN_REVOCATION_TTL_SECS`].
    ///
    /// Only safe after the token has already been authenticated by matching
    /// its hash against a known-good session credential; callers must not
    /// use this before that check. Unreadable claims fall back to the
    /// maximum refresh lifetime.
    pub fn remaining_lifetime(&self, token: &str) -> u64 {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
            Ok(data) => {
                let remaining = data.claims.exp - chrono::Utc::now().timestamp();
                (remaining.max(0) as u64).max(MIN_REVOCATION_TTL_SECS)
            }
            Err(_) => self.max_refresh_ttl_secs(),
        }
    }
}

/// Compute the SHA-256 hex digest of a token.
///
/// Used both to persist the current refresh credential on a session and to
/// key the revocation registry.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec(kind: PrincipalKind, secret: &str) -> TokenCodec {
        TokenCodec::new(kind, secret.to_string(), 15, 30)
    }

    fn test_principal(kind: PrincipalKind) -> Principal {
        Principal {
            id: 42,
            kind,
            college_id: 7,
        }
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let codec = test_codec(PrincipalKind::Staff, "staff-secret-long-enough-for-hmac");
        let sid = Uuid::new_v4();
        let token = codec
            .issue(&test_principal(PrincipalKind::Staff), TokenKind::Access, sid)
            .expect("issue should succeed");

        let claims = codec.decode(&token).expect("decode should succeed");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.cid, 7);
        assert_eq!(claims.sid, sid);
        assert_eq!(claims.typ, TokenKind::Access);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_token_fails_as_expired() {
        let codec = test_codec(PrincipalKind::Staff, "staff-secret-long-enough-for-hmac");
        let now = chrono::Utc::now().timestamp();
        // Expired 5 minutes ago, well past the default 60-second leeway.
        let claims = Claims {
            sub: 1,
            cid: 1,
            kind: PrincipalKind::Staff,
            typ: TokenKind::Refresh,
            sid: Uuid::new_v4(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 600,
            exp: now - 300,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("staff-secret-long-enough-for-hmac".as_bytes()),
        )
        .expect("encoding should succeed");

        assert_matches::assert_matches!(codec.decode(&token), Err(SessionError::TokenExpired));
    }

    #[test]
    fn test_cross_kind_token_rejected() {
        let staff = test_codec(PrincipalKind::Staff, "staff-secret-long-enough-for-hmac");
        let student = test_codec(PrincipalKind::Student, "student-secret-also-long-enough");
        let sid = Uuid::new_v4();

        let student_token = student
            .issue(&test_principal(PrincipalKind::Student), TokenKind::Access, sid)
            .expect("issue should succeed");

        // Different secret: signature verification fails.
        assert_matches::assert_matches!(
            staff.decode(&student_token),
            Err(SessionError::InvalidToken)
        );

        // Even with an identical secret, the kind claim is rejected.
        let staff_same_secret =
            test_codec(PrincipalKind::Staff, "student-secret-also-long-enough");
        assert_matches::assert_matches!(
            staff_same_secret.decode(&student_token),
            Err(SessionError::InvalidToken)
        );
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let codec = test_codec(PrincipalKind::Student, "student-secret-also-long-enough");
        let token = codec
            .issue(
                &test_principal(PrincipalKind::Student),
                TokenKind::Access,
                Uuid::new_v4(),
            )
            .expect("issue should succeed");
        let claims = codec.decode(&token).expect("decode should succeed");

        assert!(codec.validate_type(&claims, TokenKind::Access).is_ok());
        assert_matches::assert_matches!(
            codec.validate_type(&claims, TokenKind::Refresh),
            Err(SessionError::InvalidToken)
        );
    }

    #[test]
    fn test_rotation_yields_distinct_tokens() {
        // Two refresh tokens for the same session minted back to back must
        // differ (jti), otherwise rotation could not distinguish old from new.
        let codec = test_codec(PrincipalKind::Staff, "staff-secret-long-enough-for-hmac");
        let principal = test_principal(PrincipalKind::Staff);
        let sid = Uuid::new_v4();

        let a = codec.issue(&principal, TokenKind::Refresh, sid).unwrap();
        let b = codec.issue(&principal, TokenKind::Refresh, sid).unwrap();
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), hash_token(&b));
    }

    #[test]
    fn test_remaining_lifetime_floor_and_fallback() {
        let codec = test_codec(PrincipalKind::Staff, "staff-secret-long-enough-for-hmac");

        // A fresh refresh token has close to its full lifetime left.
        let token = codec
            .issue(
                &test_principal(PrincipalKind::Staff),
                TokenKind::Refresh,
                Uuid::new_v4(),
            )
            .unwrap();
        let remaining = codec.remaining_lifetime(&token);
        assert!(remaining > 29 * 86_400);
        assert!(remaining <= 30 * 86_400);

        // Garbage falls back to the maximum refresh lifetime.
        assert_eq!(
            codec.remaining_lifetime("not-a-token"),
            codec.max_refresh_ttl_secs()
        );

        // An already-expired exp claim floors at the skew guard.
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            cid: 1,
            kind: PrincipalKind::Staff,
            typ: TokenKind::Refresh,
            sid: Uuid::new_v4(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 100,
            exp: now - 10,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("staff-secret-long-enough-for-hmac".as_bytes()),
        )
        .unwrap();
        assert_eq!(codec.remaining_lifetime(&stale), MIN_REVOCATION_TTL_SECS);
    }

    #[test]
    fn test_hash_token_stable_hex() {
        let token = "some.jwt.token";
        let h1 = hash_token(token);
        let h2 = hash_token(token);
        assert_eq!(h1, h2, "hash of the same token must be stable");
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash_token("some.jwt.tokeN"), h1);
    }
}
