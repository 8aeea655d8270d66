//! Outbound dispatch pipeline.
//!
//! Turns a generic send request into a channel-specific sender call and a
//! persisted, status-tracked message. Deferred sends (future `schedule_at`)
//! are persisted as `queued` and picked up by an external trigger; this
//! module only defines the state.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::model::{Channel, Message, MessageStatus, SendRequest};
use crate::senders::SenderRegistry;
use crate::store::Store;

/// Result of a dispatch call.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub message: Message,
    /// True when the message was deferred instead of sent now.
    pub queued: bool,
}

/// Orchestrates immediate vs. deferred sends and persists the outcome.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    senders: SenderRegistry,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, senders: SenderRegistry) -> Self {
        Self { store, senders }
    }

    /// Dispatch one send request on behalf of a tenant.
    ///
    /// Provider-level failures do NOT surface as `Err`: the message is
    /// persisted with `status = failed` and returned. Only malformed
    /// requests, unsupported channels, and persistence failures error out.
    pub async fn dispatch(
        &self,
        tenant_id: &str,
        request: &SendRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let channel_tag = request
            .channel
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DispatchError::InvalidRequest("'channel' is required".into()))?;
        let to = request
            .to
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DispatchError::InvalidRequest("'to' is required".into()))?;

        let channel = Channel::parse(channel_tag)
            .ok_or_else(|| DispatchError::UnsupportedChannel(channel_tag.to_string()))?;

        let mut draft = Message::outbound_draft(tenant_id, channel, to);
        if channel == Channel::Email {
            draft.subject = request.subject.clone();
        }
        draft.body_text = request.content.clone();
        draft.body_html = request.html.clone();
        draft.scheduled_at = request.schedule_at;

        // Deferred send: persist as queued, no sender call.
        if let Some(schedule_at) = request.schedule_at
            && schedule_at > Utc::now()
        {
            draft.status = MessageStatus::Queued;
            let message = self.store.insert_message(draft).await?;
            info!(
                id = %message.id,
                tenant = tenant_id,
                channel = %channel,
                schedule_at = %schedule_at,
                "Message queued for deferred send"
            );
            return Ok(DispatchOutcome {
                message,
                queued: true,
            });
        }

        let sender = self
            .senders
            .get(channel)
            .ok_or_else(|| DispatchError::UnsupportedChannel(channel_tag.to_string()))?;

        let result = sender.send(tenant_id, &draft).await;

        draft.status = result.status;
        draft.error = result.error;
        draft.provider_message_id = result.provider_message_id;
        if draft.status == MessageStatus::Sent {
            draft.sent_at = Some(Utc::now());
        }

        if draft.status == MessageStatus::Failed {
            warn!(
                tenant = tenant_id,
                channel = %channel,
                error = draft.error.as_deref().unwrap_or("unknown"),
                "Send failed"
            );
        } else {
            info!(
                tenant = tenant_id,
                channel = %channel,
                provider_message_id = draft.provider_message_id.as_deref().unwrap_or(""),
                "Message sent"
            );
        }

        // Persist regardless of send success; only a store failure errors.
        let message = self.store.insert_message(draft).await?;
        Ok(DispatchOutcome {
            message,
            queued: false,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;

    use crate::model::{Direction, SendResult};
    use crate::senders::Sender;
    use crate::store::{LibSqlBackend, MessageFilter};

    /// Test sender that records invocations and returns a fixed result.
    struct RecordingSender {
        channel: Channel,
        result: SendResult,
        calls: AtomicUsize,
        last_to: Mutex<Option<String>>,
    }

    impl RecordingSender {
        fn new(channel: Channel, result: SendResult) -> Arc<Self> {
            Arc::new(Self {
                channel,
                result,
                calls: AtomicUsize::new(0),
                last_to: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Sender for RecordingSender {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn send(&self, _tenant_id: &str, message: &Message) -> SendResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_to.lock().unwrap() = message.to.clone();
            self.result.clone()
        }
    }

    async fn dispatcher_with(
        sender: Arc<RecordingSender>,
    ) -> (Dispatcher, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let mut registry = SenderRegistry::new();
        registry.register(sender);
        (Dispatcher::new(Arc::clone(&store), registry), store)
    }

    fn email_request(to: &str) -> SendRequest {
        SendRequest {
            channel: Some("email".into()),
            to: Some(to.into()),
            subject: Some("Hi".into()),
            content: Some("Hello".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_channel_is_invalid_request() {
        let sender = RecordingSender::new(Channel::Email, SendResult::sent(None));
        let (dispatcher, _) = dispatcher_with(sender).await;

        let request = SendRequest {
            to: Some("a@b.com".into()),
            ..Default::default()
        };
        let err = dispatcher.dispatch("t1", &request).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn missing_to_is_invalid_request() {
        let sender = RecordingSender::new(Channel::Email, SendResult::sent(None));
        let (dispatcher, _) = dispatcher_with(sender).await;

        let request = SendRequest {
            channel: Some("email".into()),
            to: Some("   ".into()),
            ..Default::default()
        };
        let err = dispatcher.dispatch("t1", &request).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unknown_channel_is_unsupported() {
        let sender = RecordingSender::new(Channel::Email, SendResult::sent(None));
        let (dispatcher, _) = dispatcher_with(sender).await;

        let request = SendRequest {
            channel: Some("pigeon".into()),
            to: Some("somewhere".into()),
            ..Default::default()
        };
        let err = dispatcher.dispatch("t1", &request).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedChannel(_)));
    }

    #[tokio::test]
    async fn known_channel_without_sender_is_unsupported() {
        let sender = RecordingSender::new(Channel::Email, SendResult::sent(None));
        let (dispatcher, _) = dispatcher_with(sender).await;

        let request = SendRequest {
            channel: Some("sms".into()),
            to: Some("+1555".into()),
            ..Default::default()
        };
        let err = dispatcher.dispatch("t1", &request).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedChannel(_)));
    }

    #[tokio::test]
    async fn successful_send_stamps_sent_at_and_persists() {
        let sender = RecordingSender::new(
            Channel::Email,
            SendResult::sent(Some("prov-123".into())),
        );
        let (dispatcher, store) = dispatcher_with(Arc::clone(&sender)).await;

        let outcome = dispatcher
            .dispatch("t1", &email_request("a@b.com"))
            .await
            .unwrap();

        assert!(!outcome.queued);
        assert_eq!(outcome.message.status, MessageStatus::Sent);
        assert!(outcome.message.sent_at.is_some());
        assert_eq!(
            outcome.message.provider_message_id.as_deref(),
            Some("prov-123")
        );
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            sender.last_to.lock().unwrap().as_deref(),
            Some("a@b.com")
        );

        let persisted = store
            .get_message("t1", &outcome.message.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted.status, MessageStatus::Sent);
        assert_eq!(persisted.direction, Direction::Outbound);
    }

    #[tokio::test]
    async fn failed_send_is_persisted_not_raised() {
        let sender = RecordingSender::new(Channel::Email, SendResult::failed("gateway down"));
        let (dispatcher, store) = dispatcher_with(sender).await;

        let outcome = dispatcher
            .dispatch("t1", &email_request("a@b.com"))
            .await
            .unwrap();

        assert_eq!(outcome.message.status, MessageStatus::Failed);
        assert_eq!(outcome.message.error.as_deref(), Some("gateway down"));
        assert!(outcome.message.sent_at.is_none());

        let persisted = store
            .get_message("t1", &outcome.message.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted.status, MessageStatus::Failed);
        assert_eq!(persisted.error.as_deref(), Some("gateway down"));
    }

    #[tokio::test]
    async fn future_schedule_queues_without_sender_call() {
        let sender = RecordingSender::new(Channel::Email, SendResult::sent(None));
        let (dispatcher, store) = dispatcher_with(Arc::clone(&sender)).await;

        let mut request = email_request("a@b.com");
        request.schedule_at = Some(Utc::now() + Duration::hours(1));

        let outcome = dispatcher.dispatch("t1", &request).await.unwrap();
        assert!(outcome.queued);
        assert_eq!(outcome.message.status, MessageStatus::Queued);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);

        let persisted = store
            .list_messages("t1", MessageFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].status, MessageStatus::Queued);
        assert!(persisted[0].scheduled_at.is_some());
    }

    #[tokio::test]
    async fn past_schedule_sends_immediately() {
        let sender = RecordingSender::new(Channel::Email, SendResult::sent(None));
        let (dispatcher, _) = dispatcher_with(Arc::clone(&sender)).await;

        let mut request = email_request("a@b.com");
        request.schedule_at = Some(Utc::now() - Duration::minutes(5));

        let outcome = dispatcher.dispatch("t1", &request).await.unwrap();
        assert!(!outcome.queued);
        assert_eq!(outcome.message.status, MessageStatus::Sent);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subject_only_kept_for_email() {
        let sender = RecordingSender::new(Channel::Whatsapp, SendResult::sent(None));
        let (dispatcher, _) = dispatcher_with(sender).await;

        let request = SendRequest {
            channel: Some("whatsapp".into()),
            to: Some("+1555".into()),
            subject: Some("ignored".into()),
            content: Some("hi".into()),
            ..Default::default()
        };
        let outcome = dispatcher.dispatch("t1", &request).await.unwrap();
        assert!(outcome.message.subject.is_none());
    }
}
