//! Classification of driver errors into user persistence errors.

use mongodb::error::{CommandError, Error as DriverError, ErrorKind, WriteError, WriteFailure};
use tracing::debug;

use crate::domain::ports::UserPersistenceError;

const DUPLICATE_KEY: i32 = 11000;

/// Coarse category of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FailureClass {
    Connection,
    Duplicate,
    Query,
}

pub(super) fn classify(kind: &ErrorKind) -> FailureClass {
    match kind {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => FailureClass::Connection,
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code, .. }))
        | ErrorKind::Command(CommandError { code, .. })
            if *code == DUPLICATE_KEY =>
        {
            FailureClass::Duplicate
        }
        _ => FailureClass::Query,
    }
}

/// Map a driver error raised by `operation` onto the port error.
pub(super) fn map_driver_error(
    operation: &'static str,
    error: &DriverError,
) -> UserPersistenceError {
    debug!(operation, error = %error, "store operation failed");
    let message = format!("{operation}: {error}");
    match classify(&error.kind) {
        FailureClass::Connection => UserPersistenceError::connection(message),
        FailureClass::Duplicate => UserPersistenceError::duplicate(message),
        FailureClass::Query => UserPersistenceError::query(message),
    }
}
