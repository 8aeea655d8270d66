//! Persistence layer — libSQL-backed storage for messages, tenant
//! configuration, and mirrored WhatsApp templates.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{MessageFilter, Store};
