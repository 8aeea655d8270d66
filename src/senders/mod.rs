//! Channel senders — one adapter per delivery channel.
//!
//! A sender is a pure capability: `(tenant_id, message) -> SendResult`. Each
//! adapter loads its own credentials from the tenant config store by its own
//! service name and normalizes every transport failure into a failed
//! `SendResult` — transport errors never escape as `Err`.

pub mod email;
pub mod sms;
pub mod whatsapp;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Channel, Message, SendResult};

pub use email::EmailSender;
pub use sms::Fast2SmsSender;
pub use whatsapp::WhatsAppSender;

/// Capability for sending one normalized outbound message.
#[async_trait]
pub trait Sender: Send + Sync {
    /// The channel this sender serves.
    fn channel(&self) -> Channel;

    /// Send the message on behalf of a tenant.
    ///
    /// Infallible by contract: provider and transport failures come back as
    /// `SendResult { status: Failed, error: Some(..) }`.
    async fn send(&self, tenant_id: &str, message: &Message) -> SendResult;
}

/// Registry of senders keyed by channel tag.
#[derive(Default)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn Sender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sender: Arc<dyn Sender>) {
        self.senders.insert(sender.channel(), sender);
    }

    pub fn get(&self, channel: Channel) -> Option<Arc<dyn Sender>> {
        self.senders.get(&channel).cloned()
    }
}

/// Normalize a reqwest transport error into a diagnostic string.
///
/// Timeouts are reported as the literal `"timeout"` so callers and
/// dashboards can distinguish them from provider rejections.
pub(crate) fn transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else {
        e.to_string()
    }
}
