//! Outbound adapters implementing domain ports.
//!
//! - **cache**: in-memory and Redis cache stores
//! - **crypto**: AES-256-GCM transport cipher
//! - **notify**: one-time code delivery
//! - **persistence**: in-process repositories
//! - **queue**: bounded audit job queue and its worker
//! - **security**: Argon2id hashing and HS256 tokens
//!
//! Adapters translate between domain types and infrastructure; they contain
//! no business rules.

pub mod cache;
pub mod crypto;
pub mod notify;
pub mod persistence;
pub mod queue;
pub mod security;
