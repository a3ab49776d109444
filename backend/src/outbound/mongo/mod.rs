//! MongoDB adapters.
//!
//! [`MongoStore`] owns the pooled driver client for the process lifetime;
//! [`MongoUserRepository`] implements the user persistence port over one
//! collection of that store.

mod client;
mod documents;
mod error_mapping;
mod user_repository;

pub use client::{MongoStore, StoreConfig, StoreError};
pub use user_repository::MongoUserRepository;
