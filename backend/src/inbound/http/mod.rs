//! HTTP inbound adapter exposing REST endpoints.

use actix_web::error::JsonPayloadError;
use actix_web::{HttpRequest, web};
use serde_json::json;
use tracing::debug;

use crate::domain::Error;

pub mod error;
pub mod health;
pub mod state;
pub mod users;

pub use error::ApiResult;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected request body");
    Error::invalid_request("request body must be a JSON user object")
        .with_details(json!({ "reason": err.to_string() }))
        .into()
}

/// Register the users endpoints and the JSON body rules they rely on.
///
/// Health probes are registered separately because they depend on
/// [`health::HealthState`] rather than [`state::HttpState`].
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use std::sync::Arc;
/// use users_backend::domain::{RetryPolicy, UserService};
/// use users_backend::inbound::http::{configure, state::HttpState};
/// use users_backend::test_support::InMemoryUserRepository;
///
/// let repository = Arc::new(InMemoryUserRepository::default());
/// let service = UserService::new(repository, RetryPolicy::default());
/// let _app = App::new()
///     .app_data(web::Data::new(HttpState::from_service(service)))
///     .configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(users::index)
        .service(users::list_users)
        .service(users::get_user)
        .service(users::create_user)
        .service(users::update_user)
        .service(users::delete_user);
}
