//! Conversation log entity.

use super::entities::{Message, Sender};
use crate::core::error::DomainError;
use crate::util::is_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persona metadata a coaching suggestion is framed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaContext {
    pub persona_id: String,
    pub system_instruction: String,
}

/// Ordered, append-only record of one session's turns (Entity)
///
/// Identity is the session id. The message sequence never shrinks and is
/// never reordered. Sender alternation is not enforced: a caller may send
/// consecutive user messages (for instance after a failed turn), so the
/// last user and last AI message are looked up independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationLog {
    session_id: String,
    owner_id: String,
    persona_id: String,
    system_instruction: String,
    created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl ConversationLog {
    /// Create an empty log.
    ///
    /// Fails with [`DomainError::InvalidArgument`] if any identifier or the
    /// system instruction is blank.
    pub fn new(
        session_id: impl Into<String>,
        owner_id: impl Into<String>,
        persona_id: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let session_id = session_id.into();
        let owner_id = owner_id.into();
        let persona_id = persona_id.into();
        let system_instruction = system_instruction.into();

        for (field, value) in [
            ("sessionId", &session_id),
            ("ownerId", &owner_id),
            ("personaId", &persona_id),
            ("systemInstruction", &system_instruction),
        ] {
            if is_blank(value) {
                return Err(DomainError::blank(field));
            }
        }

        Ok(Self {
            session_id,
            owner_id,
            persona_id,
            system_instruction,
            created_at: Utc::now(),
            messages: Vec::new(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn persona_id(&self) -> &str {
        &self.persona_id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a completed turn: the user message always precedes the AI
    /// message that answers it.
    pub fn append_turn(&mut self, user: Message, ai: Message) {
        debug_assert!(user.is_user() && ai.is_ai());
        self.messages.reserve(2);
        self.messages.push(user);
        self.messages.push(ai);
    }

    /// Most recent message sent by the user, regardless of alternation.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.last_by(Sender::User)
    }

    /// Most recent message produced by the AI, regardless of alternation.
    pub fn last_ai_message(&self) -> Option<&Message> {
        self.last_by(Sender::Ai)
    }

    pub fn persona_context(&self) -> PersonaContext {
        PersonaContext {
            persona_id: self.persona_id.clone(),
            system_instruction: self.system_instruction.clone(),
        }
    }

    fn last_by(&self, sender: Sender) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.sender == sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> ConversationLog {
        ConversationLog::new("s1", "u1", "p1", "You are a barista.").unwrap()
    }

    #[test]
    fn new_log_is_empty() {
        let log = log();
        assert!(log.is_empty());
        assert_eq!(log.persona_id(), "p1");
        assert!(log.last_user_message().is_none());
        assert!(log.last_ai_message().is_none());
    }

    #[test]
    fn blank_fields_are_rejected() {
        let err = ConversationLog::new("s1", "u1", "", "instr").unwrap_err();
        assert_eq!(err, DomainError::blank("personaId"));

        let err = ConversationLog::new("s1", "u1", "p1", "   ").unwrap_err();
        assert_eq!(err, DomainError::blank("systemInstruction"));
    }

    #[test]
    fn append_turn_keeps_user_before_ai() {
        let mut log = log();
        log.append_turn(Message::user("hi"), Message::ai("hello"));

        assert_eq!(log.len(), 2);
        assert!(log.messages()[0].is_user());
        assert!(log.messages()[1].is_ai());
    }

    #[test]
    fn last_messages_found_without_strict_alternation() {
        let mut log = log();
        log.append_turn(Message::user("first"), Message::ai("reply one"));
        log.append_turn(Message::user("second"), Message::ai("reply two"));
        // Simulate a restored log where a user message was never answered
        log.messages.push(Message::user("third"));

        assert_eq!(log.last_user_message().unwrap().text, "third");
        assert_eq!(log.last_ai_message().unwrap().text, "reply two");
    }

    #[test]
    fn persona_context_mirrors_log() {
        let ctx = log().persona_context();
        assert_eq!(ctx.persona_id, "p1");
        assert_eq!(ctx.system_instruction, "You are a barista.");
    }
}
