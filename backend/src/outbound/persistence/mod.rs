//! In-process persistence adapters.
//!
//! Each repository keeps its rows in memory behind async-aware locks and
//! translates nothing: domain types are stored as-is. Swapping in a database
//! means implementing the same ports; no caller changes.

mod memory_audit;
mod memory_otp;
mod memory_stocks;
mod memory_users;
mod table;

pub use memory_audit::MemoryAuditLogRepository;
pub use memory_otp::MemoryOtpRepository;
pub use memory_stocks::{
    MemoryAlertRepository, MemoryStockRepository, MemorySubscriptionRepository,
};
pub use memory_users::MemoryUserRepository;
