//! Domain primitives, ports and services.
//!
//! Purpose: define the user aggregate, the identifier codec shared with the
//! document store, the error payload returned by the API and the service
//! that applies deadlines and retries to store calls.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - User, UserDraft, UserId — the user aggregate and its parts.
//! - UserService — CRUD use-cases over a `ports::UserRepository`.

pub mod codec;
pub mod error;
pub mod ports;
pub mod retry;
pub mod trace_id;
pub mod user;
pub mod user_service;

pub use self::codec::InvalidIdentifier;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use self::trace_id::TraceId;
pub use self::user::{User, UserDraft, UserId, UserValidationError};
pub use self::user_service::{LIST_LIMIT, USER_NOT_FOUND, UserService};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use users_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::not_found("Usuario no encontrado"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
