use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const MAX_MESSAGE_CHARS: usize = 10_000;
pub const DISPLAY_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    General,
    Database,
    Project,
}

impl ContextType {
    pub fn label(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Database => "database",
            Self::Project => "project",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: u64,
    pub title: String,
    pub context_type: ContextType,
    pub project_id: Option<u64>,
    pub last_message_at_epoch_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: u64,
    pub conversation_id: u64,
    pub role: MessageRole,
    pub content: String,
    pub created_at_epoch_ms: u64,
    pub tokens_used: Option<u32>,
    pub processing_time_ms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatSendError {
    #[error("Type a message before sending.")]
    Empty,
    #[error("Messages are limited to {MAX_MESSAGE_CHARS} characters.")]
    TooLong,
    #[error("A message is already in flight. Wait for the reply.")]
    Busy,
    #[error("No conversation is selected. Create one with /new.")]
    NoConversation,
}

/// Validated message handed to the caller for dispatch. The reducer never
/// talks to the service itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub conversation_id: u64,
    pub text: String,
    pub include_schema_context: bool,
    pub include_history_context: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub tokens_used: Option<u32>,
    pub processing_time_ms: Option<u32>,
}

/// Conversation-list and message state for the chat pane. Messages are
/// append-only per conversation; the view window in `display_messages` trims
/// rendering, never storage.
#[derive(Debug, Default)]
pub struct ChatState {
    conversations: Vec<Conversation>,
    current: Option<u64>,
    messages: HashMap<u64, Vec<ChatMessage>>,
    is_typing: bool,
    pub error: Option<String>,
    pending: Option<PendingSend>,
    next_id: u64,
}

/// Stash of an in-flight send. Carries the originating conversation id so
/// the reply lands there even if the user switches conversations before it
/// arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSend {
    conversation_id: u64,
    text: String,
}

impl ChatState {
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        let id = self.current?;
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn current_id(&self) -> Option<u64> {
        self.current
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn messages(&self, conversation_id: u64) -> &[ChatMessage] {
        self.messages
            .get(&conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Most recent messages of the current conversation, windowed for display.
    pub fn display_messages(&self) -> &[ChatMessage] {
        let Some(id) = self.current else {
            return &[];
        };
        let all = self.messages(id);
        let start = all.len().saturating_sub(DISPLAY_WINDOW);
        &all[start..]
    }

    pub fn create_conversation(&mut self, title: &str, context_type: ContextType) -> u64 {
        let title = title.trim();
        let title = if title.is_empty() { "Untitled" } else { title };
        let id = self.alloc_id();
        self.conversations.push(Conversation {
            id,
            title: title.to_string(),
            context_type,
            project_id: None,
            last_message_at_epoch_ms: now_epoch_ms(),
        });
        self.current = Some(id);
        self.messages.entry(id).or_default();
        self.error = None;
        id
    }

    pub fn select_conversation(&mut self, id: u64) -> bool {
        if !self.conversations.iter().any(|c| c.id == id) {
            return false;
        }
        self.current = Some(id);
        self.error = None;
        true
    }

    pub fn update_title(&mut self, id: u64, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        match self.conversations.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn delete_conversation(&mut self, id: u64) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return false;
        }
        self.messages.remove(&id);
        if self.current == Some(id) {
            self.current = self.conversations.last().map(|c| c.id);
        }
        true
    }

    /// Validates the composed text and stashes it without appending anything.
    /// The user message only becomes part of the transcript when the reply
    /// arrives, so a failed send leaves the conversation untouched.
    pub fn begin_send(&mut self, text: &str) -> Result<OutboundMessage, ChatSendError> {
        if self.is_typing {
            return Err(ChatSendError::Busy);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatSendError::Empty);
        }
        if trimmed.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatSendError::TooLong);
        }
        let Some(conversation_id) = self.current else {
            return Err(ChatSendError::NoConversation);
        };
        self.is_typing = true;
        self.error = None;
        self.pending = Some(PendingSend {
            conversation_id,
            text: trimmed.to_string(),
        });
        let include_context = self
            .current_conversation()
            .is_some_and(|c| c.context_type != ContextType::General);
        Ok(OutboundMessage {
            conversation_id,
            text: trimmed.to_string(),
            include_schema_context: include_context,
            include_history_context: include_context,
        })
    }

    /// Appends the stashed user message and the assistant reply together to
    /// the conversation the send began in, regardless of which conversation
    /// is currently selected. A reply for a deleted conversation is dropped.
    pub fn complete_send(&mut self, reply: ChatReply) {
        self.is_typing = false;
        let Some(PendingSend {
            conversation_id,
            text,
        }) = self.pending.take()
        else {
            return;
        };
        if !self.conversations.iter().any(|c| c.id == conversation_id) {
            return;
        }
        let now = now_epoch_ms();
        let user_id = self.alloc_id();
        let reply_id = self.alloc_id();
        let entry = self.messages.entry(conversation_id).or_default();
        entry.push(ChatMessage {
            id: user_id,
            conversation_id,
            role: MessageRole::User,
            content: text,
            created_at_epoch_ms: now,
            tokens_used: None,
            processing_time_ms: None,
        });
        entry.push(ChatMessage {
            id: reply_id,
            conversation_id,
            role: MessageRole::Assistant,
            content: reply.content,
            created_at_epoch_ms: now,
            tokens_used: reply.tokens_used,
            processing_time_ms: reply.processing_time_ms,
        });
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.last_message_at_epoch_ms = now;
        }
    }

    /// Appends nothing and returns the stashed text for the composer.
    pub fn fail_send(&mut self, error: &str) -> Option<String> {
        self.is_typing = false;
        self.error = Some(error.to_string());
        self.pending.take().map(|pending| pending.text)
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "../tests/unit/chat_tests.rs"]
mod tests;
