//! WhatsApp template mirror — normalization and reconciliation.

pub mod model;
pub mod sync;

pub use model::{Template, TemplateUpsert, map_remote_status};
pub use sync::{GraphCatalogClient, SyncReport, TemplateCatalog, TemplateSyncEngine};
