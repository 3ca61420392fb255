//! Chat session controller.
//!
//! Owns the UI-facing state of a chat: which conversation is active, and a
//! two-state send machine (`Idle`/`Sending`). A send commits the user
//! message locally before the relay call, then commits either the
//! assistant reply or a synthesized error message, so persisted message
//! order always matches causal order and no relay failure ever escapes the
//! controller. There is no cancellation: a send in flight runs to
//! completion, and the `Sending` guard rejects a second attempt instead.

use crate::conversation::{Conversation, ConversationStore, Message};
use crate::error::Result;
use crate::relay::client::Relay;
use crate::storage::{Repository, KEY_USER_ID};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::sync::Arc;

/// Send-machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to send
    Idle,
    /// A relay call is in flight
    Sending,
}

/// Why a send attempt was rejected before any network call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A send is already in flight
    Busy,
    /// The trimmed message was empty
    EmptyMessage,
    /// No active conversation to append to
    NoActiveConversation,
}

/// Outcome of a send attempt
#[derive(Debug)]
pub enum SendOutcome {
    /// The exchange completed; the appended assistant-role message (reply
    /// or synthesized error) is returned for rendering
    Completed(Message),
    /// The attempt was rejected up front; nothing was appended
    Rejected(RejectReason),
}

/// Controller for one user's chat session
pub struct ChatSession {
    relay: Arc<dyn Relay>,
    store: ConversationStore,
    user_id: String,
    active: Option<String>,
    state: SessionState,
}

impl ChatSession {
    /// Create a session for the given user over a relay and store
    pub fn new(relay: Arc<dyn Relay>, store: ConversationStore, user_id: String) -> Self {
        Self {
            relay,
            store,
            user_id,
            active: None,
            state: SessionState::Idle,
        }
    }

    /// Current send-machine state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The stable user identifier this session sends as
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Id of the active conversation, if any
    pub fn active_conversation(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The underlying conversation store
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Make an existing conversation the active one
    pub fn open_conversation(&mut self, conversation_id: &str) {
        self.active = Some(conversation_id.to_string());
    }

    /// Start a fresh conversation and make it active
    ///
    /// Clears the relay-side vendor conversation first so the next send
    /// starts a new vendor context. A failed reset is logged and ignored:
    /// the local conversation is still created.
    pub async fn new_conversation(&mut self) -> Result<Conversation> {
        if let Err(err) = self.relay.reset(&self.user_id).await {
            tracing::warn!("Conversation reset failed: {}", err);
        }

        let conversation = self.store.create_conversation()?;
        self.active = Some(conversation.id.clone());
        Ok(conversation)
    }

    /// Delete a conversation, clearing the active view state if it was the
    /// one being shown
    pub fn delete_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.store.delete_conversation(conversation_id)?;
        if self.active.as_deref() == Some(conversation_id) {
            self.active = None;
        }
        Ok(())
    }

    /// Send a user message through the relay
    ///
    /// Rejections (busy, empty message, no active conversation) happen
    /// before any network call and append nothing. Otherwise the user
    /// message is committed first, then the relay is invoked; its reply or
    /// a synthesized error message is appended, and the session always
    /// returns to `Idle`.
    pub async fn send(&mut self, content: &str) -> Result<SendOutcome> {
        if self.state == SessionState::Sending {
            return Ok(SendOutcome::Rejected(RejectReason::Busy));
        }

        let content = content.trim();
        if content.is_empty() {
            return Ok(SendOutcome::Rejected(RejectReason::EmptyMessage));
        }

        let Some(conversation_id) = self.active.clone() else {
            return Ok(SendOutcome::Rejected(RejectReason::NoActiveConversation));
        };

        self.state = SessionState::Sending;
        let result = self.exchange(&conversation_id, content).await;
        self.state = SessionState::Idle;

        result.map(SendOutcome::Completed)
    }

    /// One user/assistant exchange: commit the user message, call the
    /// relay, commit the reply or the error message.
    async fn exchange(&mut self, conversation_id: &str, content: &str) -> Result<Message> {
        self.store.append_user_message(conversation_id, content)?;

        match self.relay.send_chat(content, &self.user_id).await {
            Ok(reply) => self.store.append_assistant_message(
                conversation_id,
                &reply.answer,
                Some(&reply.message_id),
            ),
            Err(err) => {
                tracing::warn!("Chat send failed: {}", err);
                self.store.append_error_message(
                    conversation_id,
                    &format!("エラーが発生しました: {}", err),
                )
            }
        }
    }
}

/// Load the stable per-installation user id, generating one on first use
///
/// Generated ids look like `user_k3j9x2m4q8n1v`: the `user_` prefix plus 13
/// random lowercase alphanumerics, stored under the `user_id` key.
pub fn ensure_user_id(repo: &dyn Repository) -> Result<String> {
    if let Some(existing) = repo.get(KEY_USER_ID)? {
        return Ok(existing);
    }

    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(13)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    let user_id = format!("user_{}", suffix);

    repo.set(KEY_USER_ID, &user_id)?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::error::KondateError;
    use crate::relay::client::{ChatReply, MockRelay};
    use crate::storage::MemoryRepository;

    fn new_session(relay: MockRelay) -> ChatSession {
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
        ChatSession::new(
            Arc::new(relay),
            ConversationStore::new(repo),
            "user_test".to_string(),
        )
    }

    fn reply(answer: &str) -> ChatReply {
        ChatReply {
            answer: answer.to_string(),
            conversation_id: "conv-vendor".to_string(),
            message_id: "msg-vendor".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_without_active_conversation_is_noop() {
        let mut relay = MockRelay::new();
        relay.expect_send_chat().never();
        let mut session = new_session(relay);

        let outcome = session.send("鶏肉").await.unwrap();
        assert!(matches!(
            outcome,
            SendOutcome::Rejected(RejectReason::NoActiveConversation)
        ));
    }

    #[tokio::test]
    async fn test_send_empty_message_is_rejected_before_network() {
        let mut relay = MockRelay::new();
        relay.expect_reset().returning(|_| Ok(()));
        relay.expect_send_chat().never();
        let mut session = new_session(relay);
        session.new_conversation().await.unwrap();

        let outcome = session.send("   ").await.unwrap();
        assert!(matches!(
            outcome,
            SendOutcome::Rejected(RejectReason::EmptyMessage)
        ));

        let conversation_id = session.active_conversation().unwrap().to_string();
        assert!(session.store().messages(&conversation_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_success_appends_user_then_assistant() {
        let mut relay = MockRelay::new();
        relay.expect_reset().returning(|_| Ok(()));
        relay
            .expect_send_chat()
            .withf(|message, user_id| message == "鶏肉、玉ねぎ" && user_id == "user_test")
            .times(1)
            .returning(|_, _| Ok(reply("親子丼はいかがでしょう")));
        let mut session = new_session(relay);
        session.new_conversation().await.unwrap();

        let outcome = session.send("鶏肉、玉ねぎ").await.unwrap();
        let SendOutcome::Completed(message) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.id, "msg-vendor");

        let conversation_id = session.active_conversation().unwrap().to_string();
        let messages = session.store().messages(&conversation_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "鶏肉、玉ねぎ");
        assert_eq!(messages[1].content, "親子丼はいかがでしょう");

        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_send_failure_becomes_error_message() {
        let mut relay = MockRelay::new();
        relay.expect_reset().returning(|_| Ok(()));
        relay.expect_send_chat().times(1).returning(|_, _| {
            Err(KondateError::Relay("status=500, Dify APIエラー: upstream down".to_string())
                .into())
        });
        let mut session = new_session(relay);
        session.new_conversation().await.unwrap();

        let outcome = session.send("材料あります").await.unwrap();
        let SendOutcome::Completed(message) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.contains("エラーが発生しました"));
        assert!(message.content.contains("upstream down"));

        // The user message is not lost or duplicated, and the session
        // returned to Idle.
        let conversation_id = session.active_conversation().unwrap().to_string();
        let messages = session.store().messages(&conversation_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_first_send_sets_conversation_title() {
        let mut relay = MockRelay::new();
        relay.expect_reset().returning(|_| Ok(()));
        relay
            .expect_send_chat()
            .returning(|_, _| Ok(reply("はい")));
        let mut session = new_session(relay);
        session.new_conversation().await.unwrap();

        session.send("鶏肉、玉ねぎ").await.unwrap();

        let list = session.store().conversations().unwrap();
        assert_eq!(list[0].title, "鶏肉、玉ねぎ");
    }

    #[tokio::test]
    async fn test_new_conversation_resets_relay_side_handle() {
        let mut relay = MockRelay::new();
        relay
            .expect_reset()
            .withf(|user_id| user_id == "user_test")
            .times(1)
            .returning(|_| Ok(()));
        let mut session = new_session(relay);

        let conversation = session.new_conversation().await.unwrap();
        assert_eq!(session.active_conversation(), Some(conversation.id.as_str()));
    }

    #[tokio::test]
    async fn test_new_conversation_survives_reset_failure() {
        let mut relay = MockRelay::new();
        relay
            .expect_reset()
            .returning(|_| Err(KondateError::Relay("unreachable".to_string()).into()));
        let mut session = new_session(relay);

        let conversation = session.new_conversation().await.unwrap();
        assert_eq!(session.active_conversation(), Some(conversation.id.as_str()));
    }

    #[tokio::test]
    async fn test_delete_active_conversation_clears_view_state() {
        let mut relay = MockRelay::new();
        relay.expect_reset().returning(|_| Ok(()));
        let mut session = new_session(relay);
        let conversation = session.new_conversation().await.unwrap();

        session.delete_conversation(&conversation.id).unwrap();
        assert!(session.active_conversation().is_none());
    }

    #[tokio::test]
    async fn test_delete_other_conversation_keeps_view_state() {
        let mut relay = MockRelay::new();
        relay.expect_reset().returning(|_| Ok(()));
        let mut session = new_session(relay);
        let old = session.new_conversation().await.unwrap();
        let current = session.new_conversation().await.unwrap();

        session.delete_conversation(&old.id).unwrap();
        assert_eq!(session.active_conversation(), Some(current.id.as_str()));
    }

    #[test]
    fn test_ensure_user_id_is_stable() {
        let repo = MemoryRepository::new();

        let first = ensure_user_id(&repo).unwrap();
        let second = ensure_user_id(&repo).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("user_"));
        assert_eq!(first.len(), "user_".len() + 13);
    }

    #[test]
    fn test_ensure_user_id_differs_per_installation() {
        let a = ensure_user_id(&MemoryRepository::new()).unwrap();
        let b = ensure_user_id(&MemoryRepository::new()).unwrap();
        assert_ne!(a, b);
    }
}
