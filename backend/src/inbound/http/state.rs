//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::UserService;
use crate::domain::ports::{UsersCommand, UsersQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Read side: list and get.
    pub users: Arc<dyn UsersQuery>,
    /// Write side: create, update and delete.
    pub users_command: Arc<dyn UsersCommand>,
}

impl HttpState {
    /// Construct state from the query and command ports.
    pub fn new(users: Arc<dyn UsersQuery>, users_command: Arc<dyn UsersCommand>) -> Self {
        Self {
            users,
            users_command,
        }
    }

    /// Serve both ports from one user service.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use users_backend::domain::{RetryPolicy, UserService};
    /// use users_backend::inbound::http::state::HttpState;
    /// use users_backend::test_support::InMemoryUserRepository;
    ///
    /// let service = UserService::new(
    ///     Arc::new(InMemoryUserRepository::default()),
    ///     RetryPolicy::default(),
    /// );
    /// let state = HttpState::from_service(service);
    /// let _query = state.users.clone();
    /// ```
    pub fn from_service(service: UserService) -> Self {
        let service = Arc::new(service);
        Self::new(service.clone(), service)
    }
}
