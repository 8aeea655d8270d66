//! Courier — multi-tenant messaging core (email / SMS / WhatsApp).

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod senders;
pub mod store;
pub mod templates;
pub mod webhooks;
