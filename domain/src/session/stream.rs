//! Streaming events for generation provider communication.
//!
//! [`StreamEvent`] represents individual events in a streaming reply,
//! enabling real-time display of model output as it's generated.

/// An event in a streaming reply.
///
/// Used to bridge infrastructure-level streaming (e.g., SSE chunks from an
/// HTTP provider) to the application layer. A well-formed stream is zero or
/// more `Delta`s followed by exactly one terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text chunk from the model. Each delta appends to the text so far;
    /// it never replaces earlier content.
    Delta(String),
    /// The complete response text (signals stream end).
    Completed(String),
    /// The provider or transport failed mid-stream.
    Error(String),
    /// No chunk arrived within the provider's idle window.
    TimedOut,
}

impl StreamEvent {
    /// Returns the text content if this is a Delta or Completed event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) | StreamEvent::Completed(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Delta(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_text_returns_content() {
        let event = StreamEvent::Delta("hello".to_string());
        assert_eq!(event.text(), Some("hello"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn completed_text_returns_content_and_is_terminal() {
        let event = StreamEvent::Completed("full response".to_string());
        assert_eq!(event.text(), Some("full response"));
        assert!(event.is_terminal());
    }

    #[test]
    fn failures_are_terminal_without_text() {
        for event in [StreamEvent::Error("oops".to_string()), StreamEvent::TimedOut] {
            assert_eq!(event.text(), None);
            assert!(event.is_terminal());
        }
    }
}
