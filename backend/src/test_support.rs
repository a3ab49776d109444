//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or when the `test-support` feature is enabled.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{Sleeper, User, UserDraft, UserId};

#[derive(Default)]
struct Collection {
    users: Vec<User>,
    failures: VecDeque<UserPersistenceError>,
}

/// In-memory stand-in for the document store collection.
///
/// Users are kept in insertion order, matching natural store order for a
/// collection without deletions. Queued failures are returned, one per call,
/// before any operation touches the data.
///
/// # Examples
/// ```
/// use users_backend::domain::ports::{UserPersistenceError, UserRepository};
/// use users_backend::domain::{User, UserDraft, UserId};
/// use users_backend::test_support::InMemoryUserRepository;
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let repo = InMemoryUserRepository::default();
/// let user = User::new(UserId::generate(), UserDraft::new("Ana", "x").expect("draft"));
/// repo.insert(&user).await.expect("insert");
/// assert_eq!(repo.list(100).await.expect("list"), vec![user.clone()]);
/// assert!(matches!(
///     repo.insert(&user).await,
///     Err(UserPersistenceError::Duplicate { .. })
/// ));
/// # });
/// ```
#[derive(Default)]
pub struct InMemoryUserRepository {
    state: Mutex<Collection>,
}

impl InMemoryUserRepository {
    /// Seed the collection with existing users.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            state: Mutex::new(Collection {
                users: users.into_iter().collect(),
                failures: VecDeque::new(),
            }),
        }
    }

    /// Make the next store calls fail with the given errors, in order.
    pub fn queue_failures(&self, failures: impl IntoIterator<Item = UserPersistenceError>) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.extend(failures);
        }
    }

    /// Snapshot of the stored users.
    pub fn users(&self) -> Vec<User> {
        self.state
            .lock()
            .map(|state| state.users.clone())
            .unwrap_or_default()
    }

    fn begin(&self) -> Result<MutexGuard<'_, Collection>, UserPersistenceError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| UserPersistenceError::query("in-memory collection lock poisoned"))?;
        match state.failures.pop_front() {
            Some(failure) => Err(failure),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, limit: u32) -> Result<Vec<User>, UserPersistenceError> {
        let state = self.begin()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(state.users.iter().take(limit).cloned().collect())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let state = self.begin()?;
        Ok(state.users.iter().find(|user| user.id() == id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut state = self.begin()?;
        if state.users.iter().any(|existing| existing.id() == user.id()) {
            return Err(UserPersistenceError::duplicate(format!(
                "E11000 duplicate key _id {}",
                user.id()
            )));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn update(&self, id: &UserId, draft: &UserDraft) -> Result<bool, UserPersistenceError> {
        let mut state = self.begin()?;
        let Some(slot) = state.users.iter_mut().find(|user| user.id() == id) else {
            return Ok(false);
        };
        *slot = User::new(*id, draft.clone());
        Ok(true)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserPersistenceError> {
        let mut state = self.begin()?;
        let before = state.users.len();
        state.users.retain(|user| user.id() != id);
        Ok(state.users.len() != before)
    }
}

/// Sleeper that returns immediately so retry paths run without delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl Sleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}
