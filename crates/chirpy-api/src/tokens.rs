use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use chirpy_db::Database;
use chirpy_types::models::UserId;
use chirpy_types::{Error, Result};

pub const DEFAULT_ACCESS_ISSUER: &str = "chirpy-access";
pub const DEFAULT_REFRESH_ISSUER: &str = "chirpy-refresh";
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signing material and issuer names. Fixed at startup.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_issuer: String,
    pub refresh_issuer: String,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_issuer: DEFAULT_ACCESS_ISSUER.to_string(),
            refresh_issuer: DEFAULT_REFRESH_ISSUER.to_string(),
        }
    }
}

/// JWT claims for both token kinds. The kinds differ only by `iss` and
/// lifetime. An access token minted without a ttl has no `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId> {
        self.sub
            .parse()
            .map_err(|_| Error::auth("invalid token subject"))
    }
}

/// Issues and validates access and refresh tokens. Refresh-token revocations
/// are kept in the store's deny-list.
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    db: Arc<Database>,
}

impl TokenService {
    pub fn new(config: TokenConfig, db: Arc<Database>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
            db,
        }
    }

    /// `ttl: None` produces a token without `exp` that never expires.
    pub fn issue_access_token(&self, user_id: UserId, ttl: Option<Duration>) -> Result<String> {
        self.issue(user_id, &self.config.access_issuer, ttl)
    }

    pub fn issue_refresh_token(&self, user_id: UserId) -> Result<String> {
        self.issue(
            user_id,
            &self.config.refresh_issuer,
            Some(Duration::days(REFRESH_TOKEN_TTL_DAYS)),
        )
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        self.verify(token, &self.config.access_issuer)
    }

    /// The deny-list is consulted before the signature, so a revoked token
    /// is refused even while it is otherwise valid.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims> {
        if self.db.is_refresh_token_revoked(token)? {
            return Err(Error::auth("token has been revoked"));
        }
        self.verify(token, &self.config.refresh_issuer)
    }

    /// Deny-list a refresh token. Does not check that it was ever valid.
    pub fn revoke_refresh_token(&self, token: &str) -> Result<()> {
        self.db.revoke_refresh_token(token, Utc::now())?;
        info!("Refresh token revoked");
        Ok(())
    }

    fn issue(&self, user_id: UserId, issuer: &str, ttl: Option<Duration>) -> Result<String> {
        let now = Utc::now();
        let exp = ttl
            .map(|ttl| {
                now.checked_add_signed(ttl)
                    .map(|at| at.timestamp())
                    .ok_or_else(|| Error::internal("token lifetime out of range"))
            })
            .transpose()?;
        let claims = Claims {
            iss: issuer.to_string(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp,
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| Error::internal(format!("token signing failed: {}", e)))
    }

    fn verify(&self, token: &str, issuer: &str) -> Result<Claims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["iss", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                Error::auth("invalid token")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    const SECRET: &str = "test-secret";

    fn service() -> (TempDir, TokenService) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("database.json")).unwrap();
        let tokens = TokenService::new(TokenConfig::new(SECRET), Arc::new(db));
        (dir, tokens)
    }

    fn assert_auth_error(result: Result<Claims>) {
        assert!(matches!(result, Err(Error::Auth(_))), "got {:?}", result);
    }

    #[test]
    fn access_token_round_trip() {
        let (_dir, tokens) = service();
        for user_id in [1, 42, u64::MAX] {
            let token = tokens
                .issue_access_token(user_id, Some(Duration::hours(1)))
                .unwrap();
            let claims = tokens.validate_access_token(&token).unwrap();
            assert_eq!(claims.user_id().unwrap(), user_id);
            assert_eq!(claims.iss, DEFAULT_ACCESS_ISSUER);
            assert!(claims.exp.unwrap() > claims.iat);
        }
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let (_dir, tokens) = service();
        let access = tokens.issue_access_token(5, Some(Duration::hours(1))).unwrap();
        assert_auth_error(tokens.validate_refresh_token(&access));

        let refresh = tokens.issue_refresh_token(5).unwrap();
        assert_auth_error(tokens.validate_access_token(&refresh));
        assert_eq!(tokens.validate_refresh_token(&refresh).unwrap().sub, "5");
    }

    #[test]
    fn refresh_token_lasts_sixty_days() {
        let (_dir, tokens) = service();
        let claims = tokens
            .validate_refresh_token(&tokens.issue_refresh_token(3).unwrap())
            .unwrap();
        assert_eq!(claims.iss, DEFAULT_REFRESH_ISSUER);
        assert_eq!(claims.exp.unwrap() - claims.iat, 60 * 24 * 60 * 60);
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let (_dir, tokens) = service();
        let token = tokens
            .issue_access_token(1, Some(Duration::seconds(-1)))
            .unwrap();
        assert_auth_error(tokens.validate_access_token(&token));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let (_dir, tokens) = service();
        let err = tokens
            .issue_access_token(1, Some(Duration::days(365 * 1_000_000)))
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn access_token_without_ttl_has_no_expiry() {
        let (_dir, tokens) = service();
        let token = tokens.issue_access_token(1, None).unwrap();
        let claims = tokens.validate_access_token(&token).unwrap();
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn revoked_refresh_token_is_rejected() {
        let (_dir, tokens) = service();
        let token = tokens.issue_refresh_token(9).unwrap();
        tokens.validate_refresh_token(&token).unwrap();

        tokens.revoke_refresh_token(&token).unwrap();
        tokens.revoke_refresh_token(&token).unwrap();

        match tokens.validate_refresh_token(&token) {
            Err(Error::Auth(msg)) => assert!(msg.contains("revoked")),
            other => panic!("expected revocation error, got {:?}", other),
        }
        // A fresh token for the same user is unaffected.
        let fresh = tokens.issue_refresh_token(9).unwrap();
        if fresh != token {
            tokens.validate_refresh_token(&fresh).unwrap();
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (_dir, tokens) = service();
        let (_other_dir, other) = {
            let dir = tempdir().unwrap();
            let db = Database::open(&dir.path().join("database.json")).unwrap();
            (dir, TokenService::new(TokenConfig::new("other-secret"), Arc::new(db)))
        };

        let token = other.issue_access_token(1, Some(Duration::hours(1))).unwrap();
        assert_auth_error(tokens.validate_access_token(&token));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let (_dir, tokens) = service();
        let token = tokens.issue_access_token(1, Some(Duration::hours(1))).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            iss: DEFAULT_ACCESS_ISSUER.to_string(),
            sub: "2".to_string(),
            iat: Utc::now().timestamp(),
            exp: None,
        };
        let forged = encode(
            &Header::new(ALGORITHM),
            &forged_claims,
            &EncodingKey::from_secret(b"guess"),
        )
        .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;

        assert_auth_error(tokens.validate_access_token(&parts.join(".")));
        assert_auth_error(tokens.validate_access_token("not.a.jwt"));
    }

    #[test]
    fn unexpected_algorithm_is_rejected() {
        let (_dir, tokens) = service();
        let claims = Claims {
            iss: DEFAULT_ACCESS_ISSUER.to_string(),
            sub: "1".to_string(),
            iat: Utc::now().timestamp(),
            exp: Some(Utc::now().timestamp() + 3600),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_auth_error(tokens.validate_access_token(&token));
    }

    #[test]
    fn configured_issuers_are_enforced() {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("database.json")).unwrap());
        let config = TokenConfig {
            secret: SECRET.to_string(),
            access_issuer: "custom-access".to_string(),
            refresh_issuer: "custom-refresh".to_string(),
        };
        let custom = TokenService::new(config, db.clone());
        let default = TokenService::new(TokenConfig::new(SECRET), db);

        let token = custom.issue_access_token(1, Some(Duration::hours(1))).unwrap();
        assert_eq!(custom.validate_access_token(&token).unwrap().iss, "custom-access");
        assert_auth_error(default.validate_access_token(&token));
    }

    #[test]
    fn malformed_subject_is_auth_error() {
        let claims = Claims {
            iss: DEFAULT_ACCESS_ISSUER.to_string(),
            sub: "not-a-number".to_string(),
            iat: 0,
            exp: None,
        };
        assert!(matches!(claims.user_id(), Err(Error::Auth(_))));
    }
}
