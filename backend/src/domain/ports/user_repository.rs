//! Driven port for user persistence and its errors.
//!
//! Operations are collection scoped and map one-to-one onto document store
//! calls: find-many, find-one, insert-one, replace-one and delete-one.

use async_trait::async_trait;

use crate::domain::{User, UserDraft, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// The store could not be reached.
        Connection { message: String } => "user store connection failed: {message}",
        /// The store did not answer within the deadline.
        Timeout { message: String } => "user store timed out: {message}",
        /// A document with the same identifier already exists.
        Duplicate { message: String } => "user already stored: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
        /// A stored document could not be turned into a user.
        Decode { message: String } => "stored user could not be decoded: {message}",
    }
}

impl UserPersistenceError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Persistence port for the users collection.
///
/// Implementations make one store call per method and leave deadlines and
/// retries to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Return at most `limit` users in store order.
    async fn list(&self, limit: u32) -> Result<Vec<User>, UserPersistenceError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Insert a new user under its pre-assigned identifier.
    ///
    /// Fails with [`UserPersistenceError::Duplicate`] when the identifier is
    /// already taken.
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError>;

    /// Replace every stored field of a user with `draft`, keeping only the
    /// identifier, and return whether a document matched.
    async fn update(&self, id: &UserId, draft: &UserDraft) -> Result<bool, UserPersistenceError>;

    /// Delete a user, returning whether a document was removed.
    async fn delete(&self, id: &UserId) -> Result<bool, UserPersistenceError>;
}
