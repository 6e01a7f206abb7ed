//! Credential adapters: Argon2id password hashing and HS256 bearer tokens.

mod jwt;
mod password;

pub use jwt::JwtTokenIssuer;
pub use password::Argon2PasswordHasher;
