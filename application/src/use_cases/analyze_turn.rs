//! Analyze Turn use case.
//!
//! Realtime feedback on the latest exchange and a coaching suggestion for the
//! learner's next message. Both are single-shot gateway calls over a read-only
//! snapshot of the log, so they can run while a turn is streaming.

use crate::ports::generation_gateway::{GatewayError, GenerationGateway};
use crate::registry::{SessionError, SessionRegistry};
use parley_domain::util::is_blank;
use parley_domain::{
    FeedbackResult, Message, PersonaContext, PromptTemplate, SuggestionResult,
    parse_feedback_response, parse_suggestion_response,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during analysis
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Analysis unavailable: {0}")]
    Unavailable(String),
}

impl From<SessionError> for AnalysisError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => AnalysisError::NotFound(id),
            other => AnalysisError::InvalidArgument(other.to_string()),
        }
    }
}

impl From<GatewayError> for AnalysisError {
    fn from(e: GatewayError) -> Self {
        AnalysisError::Unavailable(e.to_string())
    }
}

/// Use case for feedback and suggestions
pub struct TurnAnalyzer {
    registry: Arc<SessionRegistry>,
    gateway: Arc<dyn GenerationGateway>,
    timeout: Option<Duration>,
}

impl Clone for TurnAnalyzer {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            gateway: self.gateway.clone(),
            timeout: self.timeout,
        }
    }
}

impl TurnAnalyzer {
    pub fn new(registry: Arc<SessionRegistry>, gateway: Arc<dyn GenerationGateway>) -> Self {
        Self {
            registry,
            gateway,
            timeout: None,
        }
    }

    /// Bound each analysis round trip. `None` waits as long as the gateway does.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Feedback on one user message and the AI reply to it.
    pub async fn realtime_feedback(
        &self,
        user_text: &str,
        ai_text: &str,
    ) -> Result<FeedbackResult, AnalysisError> {
        if is_blank(user_text) || is_blank(ai_text) {
            return Err(AnalysisError::InvalidArgument(
                "both userMessage and aiMessage are required".to_string(),
            ));
        }

        let prompt = PromptTemplate::feedback_prompt(user_text, ai_text);
        let reply = self.complete(&prompt).await?;
        let feedback = parse_feedback_response(&reply)
            .map_err(|e| AnalysisError::Unavailable(e.to_string()))?;

        info!(score = ?feedback.score, "Feedback ready");
        Ok(feedback)
    }

    /// Suggest the learner's next message from the full history.
    pub async fn coach_suggestion(
        &self,
        history: &[Message],
        persona: &PersonaContext,
    ) -> Result<SuggestionResult, AnalysisError> {
        let prompt = PromptTemplate::suggestion_prompt(history, persona);
        let reply = self.complete(&prompt).await?;
        let suggestion = parse_suggestion_response(&reply)
            .map_err(|e| AnalysisError::Unavailable(e.to_string()))?;

        info!(persona_id = %persona.persona_id, "Suggestion ready");
        Ok(suggestion)
    }

    /// Feedback on a session's last user and last AI message.
    pub async fn feedback_for_session(
        &self,
        session_id: &str,
    ) -> Result<FeedbackResult, AnalysisError> {
        let log = self.registry.get(session_id).await?;
        let (Some(user), Some(ai)) = (log.last_user_message(), log.last_ai_message()) else {
            return Err(AnalysisError::InvalidArgument(format!(
                "session {} has no completed exchange yet",
                session_id
            )));
        };
        self.realtime_feedback(&user.text, &ai.text).await
    }

    /// Suggestion for a session, framed by its persona.
    pub async fn suggestion_for_session(
        &self,
        session_id: &str,
    ) -> Result<SuggestionResult, AnalysisError> {
        let log = self.registry.get(session_id).await?;
        self.coach_suggestion(log.messages(), &log.persona_context())
            .await
    }

    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        debug!(prompt_bytes = prompt.len(), "Sending analysis prompt");
        let call = self.gateway.complete_once(prompt);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout),
            },
            None => call.await,
        };

        result.map_err(|e| {
            warn!("Analysis call failed: {}", e);
            AnalysisError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::generation_gateway::{GenerationRequest, StreamHandle};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Gateway whose single-shot replies come from a queue.
    struct CannedGateway {
        replies: Mutex<Vec<Result<String, GatewayError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGateway {
        fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerationGateway for CannedGateway {
        async fn stream_reply(
            &self,
            _request: GenerationRequest,
        ) -> Result<StreamHandle, GatewayError> {
            Err(GatewayError::Other("streaming not scripted".to_string()))
        }

        async fn complete_once(&self, prompt: &str) -> Result<String, GatewayError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies.lock().unwrap().remove(0)
        }
    }

    /// Gateway that never answers.
    struct SilentGateway;

    #[async_trait]
    impl GenerationGateway for SilentGateway {
        async fn stream_reply(
            &self,
            _request: GenerationRequest,
        ) -> Result<StreamHandle, GatewayError> {
            std::future::pending().await
        }

        async fn complete_once(&self, _prompt: &str) -> Result<String, GatewayError> {
            std::future::pending().await
        }
    }

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(Duration::from_secs(600)))
    }

    async fn session_with_exchange(registry: &Arc<SessionRegistry>) -> String {
        let id = registry
            .create("owner", "landlord", "You are a grumpy landlord.")
            .await
            .unwrap();
        let slot = registry.try_acquire_stream(&id).await.unwrap().unwrap();
        registry
            .commit_turn(
                &slot,
                Message::user("The heating is broken."),
                Message::ai("Have you tried a sweater?"),
            )
            .await;
        id
    }

    #[tokio::test]
    async fn test_realtime_feedback_parses_json() {
        let gateway = Arc::new(CannedGateway::new(vec![Ok(
            r#"{"summary":"Clear request.","strengths":["direct"],"improvements":["add detail"],"score":7}"#
                .to_string(),
        )]));
        let analyzer = TurnAnalyzer::new(registry(), gateway.clone());

        let feedback = analyzer
            .realtime_feedback("The heating is broken.", "Have you tried a sweater?")
            .await
            .unwrap();
        assert_eq!(feedback.summary, "Clear request.");
        assert_eq!(feedback.score, Some(7));
        assert!(gateway.last_prompt().contains("The heating is broken."));
    }

    #[tokio::test]
    async fn test_realtime_feedback_falls_back_to_plain_text() {
        let gateway = Arc::new(CannedGateway::new(vec![Ok("Good job overall.".to_string())]));
        let analyzer = TurnAnalyzer::new(registry(), gateway);

        let feedback = analyzer.realtime_feedback("hi", "hello").await.unwrap();
        assert_eq!(feedback, FeedbackResult::from_summary("Good job overall."));
    }

    #[tokio::test]
    async fn test_realtime_feedback_requires_both_messages() {
        let gateway = Arc::new(CannedGateway::new(vec![]));
        let analyzer = TurnAnalyzer::new(registry(), gateway.clone());

        let err = analyzer.realtime_feedback("hi", " ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidArgument(_)));
        assert!(gateway.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_unavailable() {
        let gateway = Arc::new(CannedGateway::new(vec![Err(GatewayError::ConnectionError(
            "refused".to_string(),
        ))]));
        let analyzer = TurnAnalyzer::new(registry(), gateway);

        let err = analyzer.realtime_feedback("hi", "hello").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_reply_is_unavailable() {
        let gateway = Arc::new(CannedGateway::new(vec![Ok("   ".to_string())]));
        let analyzer = TurnAnalyzer::new(registry(), gateway);

        let err = analyzer.realtime_feedback("hi", "hello").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_coach_suggestion_with_empty_history() {
        let gateway = Arc::new(CannedGateway::new(vec![Ok(
            r#"{"suggestion":"Say hello first.","rationale":"Opens politely."}"#.to_string(),
        )]));
        let analyzer = TurnAnalyzer::new(registry(), gateway.clone());
        let persona = PersonaContext {
            persona_id: "barista".to_string(),
            system_instruction: "You are a barista.".to_string(),
        };

        let suggestion = analyzer.coach_suggestion(&[], &persona).await.unwrap();
        assert_eq!(
            suggestion,
            SuggestionResult::new("Say hello first.").with_rationale("Opens politely.")
        );
        assert!(gateway.last_prompt().contains("(no messages yet)"));
    }

    #[tokio::test]
    async fn test_feedback_for_session_uses_last_exchange() {
        let registry = registry();
        let id = session_with_exchange(&registry).await;
        let gateway = Arc::new(CannedGateway::new(vec![Ok("Be more specific.".to_string())]));
        let analyzer = TurnAnalyzer::new(registry.clone(), gateway.clone());

        let feedback = analyzer.feedback_for_session(&id).await.unwrap();
        assert_eq!(feedback.summary, "Be more specific.");
        let prompt = gateway.last_prompt();
        assert!(prompt.contains("The heating is broken."));
        assert!(prompt.contains("Have you tried a sweater?"));

        // Read-only
        assert_eq!(registry.get(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_analysis_runs_while_turn_is_streaming() {
        let registry = registry();
        let id = session_with_exchange(&registry).await;
        let _slot = registry.try_acquire_stream(&id).await.unwrap().unwrap();

        let gateway = Arc::new(CannedGateway::new(vec![
            Ok(r#"{"summary":"Polite but vague."}"#.to_string()),
            Ok(r#"{"suggestion":"Ask when it will be fixed."}"#.to_string()),
        ]));
        let analyzer = TurnAnalyzer::new(registry.clone(), gateway);

        let feedback = analyzer.feedback_for_session(&id).await.unwrap();
        assert_eq!(feedback.summary, "Polite but vague.");
        let suggestion = analyzer.suggestion_for_session(&id).await.unwrap();
        assert_eq!(suggestion.suggestion, "Ask when it will be fixed.");

        assert!(registry.is_streaming(&id).await.unwrap());
        assert_eq!(registry.get(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_feedback_for_session_without_exchange() {
        let registry = registry();
        let id = registry.create("owner", "p", "x").await.unwrap();
        let analyzer = TurnAnalyzer::new(registry, Arc::new(CannedGateway::new(vec![])));

        let err = analyzer.feedback_for_session(&id).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidArgument(_)));

        let err = analyzer.feedback_for_session("missing").await.unwrap_err();
        assert_eq!(err, AnalysisError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_suggestion_for_session_includes_persona_and_history() {
        let registry = registry();
        let id = session_with_exchange(&registry).await;
        let gateway = Arc::new(CannedGateway::new(vec![Ok("Ask for a repair date.".to_string())]));
        let analyzer = TurnAnalyzer::new(registry, gateway.clone());

        let suggestion = analyzer.suggestion_for_session(&id).await.unwrap();
        assert_eq!(suggestion.suggestion, "Ask for a repair date.");
        let prompt = gateway.last_prompt();
        assert!(prompt.contains("grumpy landlord"));
        assert!(prompt.contains("Learner: The heating is broken."));
        assert!(prompt.contains("Persona: Have you tried a sweater?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_unavailable() {
        let analyzer = TurnAnalyzer::new(registry(), Arc::new(SilentGateway))
            .with_timeout(Some(Duration::from_secs(5)));

        let err = analyzer.realtime_feedback("hi", "hello").await.unwrap_err();
        assert_eq!(err, AnalysisError::Unavailable("Timeout".to_string()));
    }
}
