//! Conversation and message storage for the chat client.
//!
//! Conversations and their message sequences live behind the
//! [`Repository`](crate::storage::Repository) contract: the conversation
//! list under one key, each message sequence under
//! `messages_{conversationId}`. Messages are immutable and append-only.
//! The conversation list keeps most-recently-created first (new
//! conversations are prepended and the list is never re-sorted).

use crate::error::Result;
use crate::storage::{messages_key, Repository, KEY_CONVERSATIONS};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

/// Title given to a conversation before its first message
pub const DEFAULT_TITLE: &str = "新しいレシピ相談";

/// Maximum derived-title length in characters
const TITLE_MAX_CHARS: usize = 30;

/// Message sender role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user
    User,
    /// Message produced by the assistant (including synthesized errors)
    Assistant,
}

/// A single chat message
///
/// Messages are immutable once created and only ever appended to a
/// conversation's message sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (ULID, or the vendor's message id)
    pub id: String,
    /// Sender role
    pub role: Role,
    /// Message text
    pub content: String,
    /// Creation timestamp (RFC-3339)
    pub created_at: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use kondate::conversation::{Message, Role};
    ///
    /// let msg = Message::user("鶏肉、玉ねぎ");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            content: content.into(),
            created_at: now_rfc3339(),
        }
    }

    /// Creates a new assistant message with a locally generated id
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            content: content.into(),
            created_at: now_rfc3339(),
        }
    }

    /// Creates a new assistant message carrying the vendor's message id
    pub fn assistant_with_id(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            created_at: now_rfc3339(),
        }
    }
}

/// Conversation metadata
///
/// The title is derived from the first user message and never overwritten
/// by later messages; `updated_at` is refreshed on every message exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (ULID, ordered by creation time)
    pub id: String,
    /// Display title
    pub title: String,
    /// Last-exchange timestamp (RFC-3339)
    pub updated_at: String,
}

/// Conversation and message persistence
///
/// Owns the conversation list and the per-conversation message sequences.
/// Checklist state is keyed by message id elsewhere and is deliberately
/// not cascaded on delete.
pub struct ConversationStore {
    repo: Arc<dyn Repository>,
}

impl ConversationStore {
    /// Create a store over the given repository
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// All conversations, most recently created first
    pub fn conversations(&self) -> Result<Vec<Conversation>> {
        let list: Option<Vec<Conversation>> = self.repo.get_json(KEY_CONVERSATIONS)?;
        Ok(list.unwrap_or_default())
    }

    /// The ordered message sequence of a conversation
    pub fn messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let messages: Option<Vec<Message>> = self.repo.get_json(&messages_key(conversation_id))?;
        Ok(messages.unwrap_or_default())
    }

    /// Create a new conversation and prepend it to the list
    ///
    /// The new conversation starts with the default title and an empty
    /// message sequence.
    pub fn create_conversation(&self) -> Result<Conversation> {
        let conversation = Conversation {
            id: new_conversation_id(),
            title: DEFAULT_TITLE.to_string(),
            updated_at: now_rfc3339(),
        };

        let mut list = self.conversations()?;
        list.insert(0, conversation.clone());
        self.repo.set_json(KEY_CONVERSATIONS, &list)?;

        tracing::debug!("Created conversation {}", conversation.id);
        Ok(conversation)
    }

    /// Delete a conversation and its message sequence
    ///
    /// Deleting is idempotent. Checklist state for the conversation's
    /// messages is left behind.
    pub fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut list = self.conversations()?;
        list.retain(|c| c.id != conversation_id);
        self.repo.set_json(KEY_CONVERSATIONS, &list)?;
        self.repo.delete(&messages_key(conversation_id))?;

        tracing::debug!("Deleted conversation {}", conversation_id);
        Ok(())
    }

    /// Find a conversation by full id or unique id prefix
    ///
    /// Returns `None` when no conversation matches or when a short prefix
    /// is ambiguous.
    pub fn find_by_prefix(&self, id_or_prefix: &str) -> Result<Option<Conversation>> {
        let list = self.conversations()?;

        if let Some(exact) = list.iter().find(|c| c.id == id_or_prefix) {
            return Ok(Some(exact.clone()));
        }

        let mut matches = list.iter().filter(|c| c.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Ok(Some(only.clone())),
            _ => Ok(None),
        }
    }

    /// Append a user message
    ///
    /// The first message of a conversation also sets the conversation
    /// title (truncated to 30 characters with an ellipsis marker) and
    /// refreshes `updated_at`.
    pub fn append_user_message(&self, conversation_id: &str, content: &str) -> Result<Message> {
        let mut messages = self.messages(conversation_id)?;
        let is_first = messages.is_empty();

        let message = Message::user(content);
        messages.push(message.clone());
        self.repo
            .set_json(&messages_key(conversation_id), &messages)?;

        if is_first {
            self.update_conversation(conversation_id, |c| {
                c.title = derive_title(content);
                c.updated_at = now_rfc3339();
            })?;
        }

        Ok(message)
    }

    /// Append an assistant message and refresh `updated_at`
    ///
    /// Uses the vendor-provided message id when present, otherwise a
    /// locally generated one. The conversation title is never touched.
    pub fn append_assistant_message(
        &self,
        conversation_id: &str,
        content: &str,
        external_id: Option<&str>,
    ) -> Result<Message> {
        let message = match external_id {
            Some(id) if !id.is_empty() => Message::assistant_with_id(id, content),
            _ => Message::assistant(content),
        };

        let mut messages = self.messages(conversation_id)?;
        messages.push(message.clone());
        self.repo
            .set_json(&messages_key(conversation_id), &messages)?;

        self.update_conversation(conversation_id, |c| {
            c.updated_at = now_rfc3339();
        })?;

        Ok(message)
    }

    /// Append a user-facing error as an assistant message
    ///
    /// Same code path as a normal assistant message, with a local id.
    pub fn append_error_message(&self, conversation_id: &str, error_text: &str) -> Result<Message> {
        self.append_assistant_message(conversation_id, error_text, None)
    }

    /// Apply a mutation to one conversation in the list and persist it.
    ///
    /// A conversation id absent from the list is ignored, matching the
    /// lenient behavior of the message sequence itself.
    fn update_conversation(
        &self,
        conversation_id: &str,
        mutate: impl FnOnce(&mut Conversation),
    ) -> Result<()> {
        let mut list = self.conversations()?;
        if let Some(conversation) = list.iter_mut().find(|c| c.id == conversation_id) {
            mutate(conversation);
            self.repo.set_json(KEY_CONVERSATIONS, &list)?;
        }
        Ok(())
    }
}

/// Derive a conversation title from its first user message
///
/// Keeps the first 30 characters and appends an ellipsis marker when the
/// message is longer. Counted in characters, not bytes: titles are
/// routinely Japanese.
fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    } else {
        content.to_string()
    }
}

/// Generate a new ULID for a conversation
///
/// ULIDs are preferred over UUIDs here because they sort by timestamp,
/// which keeps id order consistent with creation order.
pub fn new_conversation_id() -> String {
    Ulid::new().to_string()
}

/// Generate a new ULID for a locally created message
pub fn new_message_id() -> String {
    Ulid::new().to_string()
}

/// Get current timestamp in RFC-3339 format
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
