// ABOUTME: Explicit chat session state: id, ordered history and in-flight cancellation
// ABOUTME: One session per conversation; sessions never share state

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{AbortHandle, Abortable};
use serde_json::Value;
use tracing::{debug, warn};
use trialguard_core::ChatMessage;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::service::TrialGuardClient;
use crate::types::ChatRequest;

const CANCELLED_NOTICE: &str = "Request cancelled.";

/// Anything that can answer a chat turn
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_chat(&self, request: ChatRequest) -> ClientResult<String>;
}

#[async_trait]
impl ChatBackend for TrialGuardClient {
    async fn send_chat(&self, request: ChatRequest) -> ClientResult<String> {
        self.chat(&request).await
    }
}

type InFlight = Arc<Mutex<Option<AbortHandle>>>;

/// Cancels whatever turn its session has in flight. Cloneable and usable
/// from another task while `send` is awaiting.
#[derive(Debug, Clone)]
pub struct ChatCancelHandle {
    in_flight: InFlight,
}

impl ChatCancelHandle {
    /// Returns true when a request was actually aborted
    pub fn cancel(&self) -> bool {
        match self.in_flight.lock() {
            Ok(mut guard) => match guard.take() {
                Some(handle) => {
                    handle.abort();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    messages: Vec<ChatMessage>,
    in_flight: InFlight,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn cancel_handle(&self) -> ChatCancelHandle {
        ChatCancelHandle {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Clear the history. The session id is kept.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Send one user message with the analysis context.
    ///
    /// The user message is appended first. On success the reply is appended
    /// and returned; on failure an assistant message flagged as an error is
    /// appended; on cancellation a system notice is appended.
    pub async fn send<B>(&mut self, backend: &B, message: &str, context: &Value) -> ClientResult<String>
    where
        B: ChatBackend + ?Sized,
    {
        self.messages.push(ChatMessage::user(message));

        let request = ChatRequest {
            session_id: self.id.to_string(),
            message: message.to_string(),
            context: context.clone(),
        };

        let (handle, registration) = AbortHandle::new_pair();
        if let Ok(mut guard) = self.in_flight.lock() {
            *guard = Some(handle);
        }

        let outcome = Abortable::new(backend.send_chat(request), registration).await;

        if let Ok(mut guard) = self.in_flight.lock() {
            guard.take();
        }

        match outcome {
            Ok(Ok(reply)) => {
                debug!(session = %self.id, "Chat reply received");
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Ok(Err(e)) => {
                warn!(session = %self.id, "Chat request failed: {}", e);
                self.messages
                    .push(ChatMessage::assistant_error(format!("Error: {}", e)));
                Err(e)
            }
            Err(_aborted) => {
                debug!(session = %self.id, "Chat request cancelled");
                self.messages.push(ChatMessage::system(CANCELLED_NOTICE));
                Err(ClientError::Cancelled)
            }
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use trialguard_core::MessageRole;

    #[tokio::test]
    async fn test_successful_turn_appends_both_messages() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_chat()
            .withf(|req| req.message == "Why high risk?" && req.context["overall_score"] == 72)
            .times(1)
            .returning(|_| Ok("Because of the missing DSMB.".to_string()));

        let mut session = ChatSession::new();
        let reply = session
            .send(&backend, "Why high risk?", &json!({"overall_score": 72}))
            .await
            .unwrap();

        assert_eq!(reply, "Because of the missing DSMB.");
        let roles: Vec<MessageRole> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_request_carries_session_id() {
        let sent_ids = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sent_ids);
        let mut backend = MockChatBackend::new();
        backend.expect_send_chat().times(2).returning(move |req| {
            seen.lock().unwrap().push(req.session_id);
            Ok("ok".to_string())
        });

        let mut session = ChatSession::new();
        session.send(&backend, "one", &Value::Null).await.unwrap();
        session.send(&backend, "two", &Value::Null).await.unwrap();

        let ids = sent_ids.lock().unwrap();
        assert_eq!(*ids, vec![session.id().to_string(), session.id().to_string()]);
    }

    #[tokio::test]
    async fn test_failed_turn_appends_error_message() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_chat()
            .returning(|_| Err(ClientError::upstream(500, r#"{"detail": "model overloaded"}"#)));

        let mut session = ChatSession::new();
        let err = session.send(&backend, "hello", &Value::Null).await.unwrap_err();

        assert_eq!(err.to_string(), "model overloaded");
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.error);
        assert!(last.content.contains("model overloaded"));
    }

    struct SlowBackend;

    #[async_trait]
    impl ChatBackend for SlowBackend {
        async fn send_chat(&self, _request: ChatRequest) -> ClientResult<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_turn() {
        let mut session = ChatSession::new();
        let cancel = session.cancel_handle();
        assert!(!cancel.cancel());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel()
        });

        let err = session.send(&SlowBackend, "hello", &Value::Null).await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert!(canceller.await.unwrap());

        let roles: Vec<MessageRole> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::System]);
        assert!(!session.is_in_flight());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = ChatSession::new();
        let second = ChatSession::new();
        assert_ne!(first.id(), second.id());

        first.messages.push(ChatMessage::user("hi"));
        assert!(second.messages().is_empty());

        let id = first.id();
        first.reset();
        assert!(first.messages().is_empty());
        assert_eq!(first.id(), id);
    }
}
