//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **mongo**: MongoDB client wiring and the document-backed
//!   `UserRepository`.
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod mongo;
