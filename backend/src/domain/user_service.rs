//! User CRUD use-cases.
//!
//! [`UserService`] implements the driving ports on top of a
//! [`UserRepository`], applying the [`RetryPolicy`] to every store call and
//! mapping persistence failures onto domain errors: missing records become
//! not-found, unreachable or slow stores become service-unavailable, and
//! everything else is internal.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::domain::ports::{UserPersistenceError, UserRepository, UsersCommand, UsersQuery};
use crate::domain::{Error, RetryPolicy, Sleeper, TokioSleeper, User, UserDraft, UserId};

/// Maximum number of users returned by a list call.
pub const LIST_LIMIT: u32 = 100;

/// Message carried by not-found errors for point operations.
pub const USER_NOT_FOUND: &str = "Usuario no encontrado";

const STORE_UNAVAILABLE: &str = "El almacén de usuarios no está disponible";
const STORE_FAILURE: &str = "Error al acceder al almacén de usuarios";

/// Domain service backing the users HTTP endpoints.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl UserService {
    /// Build a service that sleeps on the Tokio timer between retries.
    pub fn new(repository: Arc<dyn UserRepository>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(repository, policy, Arc::new(TokioSleeper))
    }

    /// Build a service with an injected sleeper.
    pub fn with_sleeper(
        repository: Arc<dyn UserRepository>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            repository,
            policy,
            sleeper,
        }
    }

    /// Run one logical store operation under the deadline and retry policy.
    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> Result<T, UserPersistenceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UserPersistenceError>>,
    {
        let attempts = self.policy.attempts();
        let deadline = self.policy.attempt_timeout;
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(deadline, op()).await {
                Ok(result) => result,
                Err(_) => Err(UserPersistenceError::timeout(format!(
                    "{operation} exceeded {} ms",
                    deadline.as_millis()
                ))),
            };
            match outcome {
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient store failure; retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn map_persistence_error(operation: &'static str, err: UserPersistenceError) -> Error {
    error!(operation, error = %err, "user store operation failed");
    if err.is_transient() {
        Error::service_unavailable(STORE_UNAVAILABLE)
    } else {
        Error::internal(STORE_FAILURE)
    }
}

/// Accept a duplicate seen on a retry only when the user is already stored
/// under its identifier, meaning an earlier attempt landed but its
/// acknowledgement was lost.
async fn confirm_earlier_insert(
    repository: &dyn UserRepository,
    user: &User,
    duplicate: UserPersistenceError,
) -> Result<(), UserPersistenceError> {
    match repository.find_by_id(user.id()).await? {
        Some(_) => {
            debug!(id = %user.id(), "insert already applied by an earlier attempt");
            Ok(())
        }
        None => Err(duplicate),
    }
}

fn found<T>(value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| Error::not_found(USER_NOT_FOUND))
}

fn matched(hit: bool) -> Result<(), Error> {
    if hit {
        Ok(())
    } else {
        Err(Error::not_found(USER_NOT_FOUND))
    }
}

#[async_trait]
impl UsersQuery for UserService {
    async fn list_users(&self) -> Result<Vec<User>, Error> {
        let repository = &self.repository;
        self.call("list", move || repository.list(LIST_LIMIT))
            .await
            .map_err(|err| map_persistence_error("list", err))
    }

    async fn get_user(&self, id: &UserId) -> Result<User, Error> {
        let repository = &self.repository;
        let user = self
            .call("find_one", move || repository.find_by_id(id))
            .await
            .map_err(|err| map_persistence_error("find_one", err))?;
        found(user)
    }
}

#[async_trait]
impl UsersCommand for UserService {
    async fn create_user(&self, draft: UserDraft) -> Result<User, Error> {
        let user = User::new(UserId::generate(), draft);
        let repository = &self.repository;
        let stored = &user;
        let calls = AtomicU32::new(0);
        let calls = &calls;
        self.call("insert_one", move || async move {
            let call = calls.fetch_add(1, Ordering::Relaxed) + 1;
            match repository.insert(stored).await {
                Err(duplicate @ UserPersistenceError::Duplicate { .. }) if call > 1 => {
                    confirm_earlier_insert(&**repository, stored, duplicate).await
                }
                other => other,
            }
        })
        .await
        .map_err(|err| map_persistence_error("insert_one", err))?;
        Ok(user)
    }

    async fn update_user(&self, id: &UserId, draft: UserDraft) -> Result<(), Error> {
        let repository = &self.repository;
        let draft = &draft;
        let hit = self
            .call("replace_one", move || repository.update(id, draft))
            .await
            .map_err(|err| map_persistence_error("replace_one", err))?;
        matched(hit)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), Error> {
        let repository = &self.repository;
        let hit = self
            .call("delete_one", move || repository.delete(id))
            .await
            .map_err(|err| map_persistence_error("delete_one", err))?;
        matched(hit)
    }
}
