//! Prompt templates for turns and analysis

use crate::session::entities::{Message, Sender};
use crate::session::log::PersonaContext;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System instruction for a coaching turn.
    ///
    /// The persona's own instruction is kept as context so the coach knows
    /// who the user is practicing with.
    pub fn coaching_system(persona_instruction: &str) -> String {
        format!(
            r#"You are a supportive conversation coach. The user is practicing a conversation with the following persona:

--- Persona ---
{}
--- End persona ---

Step out of the persona. Answer the user's question about the conversation directly,
give concrete advice they can use in their next message, and keep it short."#,
            persona_instruction
        )
    }

    /// Single-shot prompt for realtime feedback on the latest exchange
    pub fn feedback_prompt(user_text: &str, ai_text: &str) -> String {
        format!(
            r#"You are evaluating a language learner's message in a role-play conversation.

The learner wrote:
"{}"

The conversation partner replied:
"{}"

Assess the learner's message for clarity, tone and naturalness.
Respond ONLY with a JSON object of this shape:
{{"summary": "<one or two sentences>", "strengths": ["..."], "improvements": ["..."], "score": <1-10>}}"#,
            user_text, ai_text
        )
    }

    /// Single-shot prompt for a next-message coaching suggestion
    pub fn suggestion_prompt(history: &[Message], persona: &PersonaContext) -> String {
        let mut prompt = format!(
            r#"You are a conversation coach. The learner is talking with this persona ({}):

{}

Conversation so far:
"#,
            persona.persona_id, persona.system_instruction
        );

        if history.is_empty() {
            prompt.push_str("\n(no messages yet)\n");
        }
        for message in history {
            let speaker = match message.sender {
                Sender::User => "Learner",
                Sender::Ai => "Persona",
            };
            prompt.push_str(&format!("\n{}: {}", speaker, message.text));
        }

        prompt.push_str(
            r#"

Suggest the single best next message for the learner to send.
Respond ONLY with a JSON object of this shape:
{"suggestion": "<the message>", "rationale": "<why it helps>"}"#,
        );

        prompt
    }
}
