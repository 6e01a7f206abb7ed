//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod audit;
mod cache_key;
mod cache_store;
mod cipher;
mod credentials;
mod otp;
mod persistence;
mod stock_repository;
mod user_repository;

pub use audit::{AuditDispatcher, AuditLogRepository, JobDispatchError};
#[cfg(test)]
pub use audit::{MockAuditDispatcher, MockAuditLogRepository};
pub use cache_key::{CacheKey, CacheKeyValidationError};
#[cfg(test)]
pub use cache_store::MockCacheStore;
pub use cache_store::{CacheStore, CacheStoreError};
#[cfg(test)]
pub use cipher::MockPayloadCipher;
pub use cipher::{CipherError, PayloadCipher};
#[cfg(test)]
pub use credentials::{MockPasswordHasher, MockTokenIssuer};
pub use credentials::{AccessClaims, CredentialError, PasswordHasher, TokenError, TokenIssuer};
#[cfg(test)]
pub use otp::{MockOtpNotifier, MockOtpRepository};
pub use otp::{OtpDeliveryError, OtpNotifier, OtpRepository};
pub use persistence::{ListSlice, PersistenceError};
#[cfg(test)]
pub use stock_repository::{MockAlertRepository, MockStockRepository, MockSubscriptionRepository};
pub use stock_repository::{AlertRepository, StockRepository, SubscriptionRepository};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::UserRepository;
