//! 买家令牌
//!
//! Tokens are minted by the accounts service with a shared HS256 secret.
//! This side only checks them; `generate_token` exists for tests and local
//! tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// `sub` 是买家 ID 的十进制字符串
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn buyer_id(&self) -> Result<i64, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::Malformed(format!("subject {:?} is not a buyer id", self.sub)))
    }
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("令牌已过期")]
    Expired,

    #[error("签名不匹配")]
    BadSignature,

    #[error("令牌格式错误: {0}")]
    Malformed(String),

    #[error("令牌签发失败: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::BadSignature,
            _ => JwtError::Malformed(e.to_string()),
        }
    }
}

pub struct JwtService {
    issuer: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer,
            audience: config.audience,
            validation,
        }
    }

    pub fn generate_token(&self, buyer_id: i64, ttl: Duration) -> Result<String, JwtError> {
        let iat = Utc::now();
        let claims = Claims {
            sub: buyer_id.to_string(),
            exp: (iat + ttl).timestamp(),
            iat: iat.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    /// `Authorization: Bearer <token>` 中的令牌部分
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-very-long-shared-secret-for-tests-only";

    fn service(secret: &str, audience: &str) -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: secret.into(),
            issuer: "market-accounts".into(),
            audience: audience.into(),
        })
    }

    #[test]
    fn issued_token_yields_buyer_id() {
        let jwt = service(SECRET, "market-buyers");
        let token = jwt.generate_token(42, Duration::minutes(5)).unwrap();
        assert_eq!(jwt.validate_token(&token).unwrap().buyer_id().unwrap(), 42);
    }

    #[test]
    fn rejects_wrong_secret_audience_and_expiry() {
        let jwt = service(SECRET, "market-buyers");

        let forged = service("another-secret-entirely-different-123", "market-buyers")
            .generate_token(42, Duration::minutes(5))
            .unwrap();
        assert!(matches!(jwt.validate_token(&forged), Err(JwtError::BadSignature)));

        let seller = service(SECRET, "market-sellers")
            .generate_token(42, Duration::minutes(5))
            .unwrap();
        assert!(matches!(jwt.validate_token(&seller), Err(JwtError::Malformed(_))));

        let expired = jwt.generate_token(42, Duration::minutes(-10)).unwrap();
        assert!(matches!(jwt.validate_token(&expired), Err(JwtError::Expired)));
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let claims = Claims {
            sub: "admin".into(),
            exp: 0,
            iat: 0,
            iss: String::new(),
            aud: String::new(),
        };
        assert!(matches!(claims.buyer_id(), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn bearer_prefix() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
