//! HS256 bearer tokens via `jsonwebtoken`.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use zeroize::Zeroizing;

use crate::domain::User;
use crate::domain::ports::{AccessClaims, TokenError, TokenIssuer};

/// Issues and verifies access tokens signed with a shared secret.
///
/// Tokens carry the account's token version so a logout or password reset
/// revokes every token issued before it.
pub struct JwtTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl JwtTokenIssuer {
    /// Create an issuer signing with `secret`; tokens expire after `ttl`.
    pub fn new(secret: &[u8], ttl: TimeDelta) -> Self {
        let secret = Zeroizing::new(secret.to_vec());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            validation,
            ttl,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct WireClaims {
    sub: String,
    email: String,
    ver: u32,
    iat: i64,
    exp: i64,
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = WireClaims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            ver: user.token_version,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| TokenError::signing(error.to_string()))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(|error| TokenError::invalid(error.to_string()))?;
        let claims = data.claims;
        let sub = claims
            .sub
            .parse()
            .map_err(|_| TokenError::invalid("subject is not a user id"))?;
        Ok(AccessClaims {
            sub,
            email: claims.email,
            ver: claims.ver,
            iat: claims.iat,
            exp: claims.exp,
        })
    }
}
