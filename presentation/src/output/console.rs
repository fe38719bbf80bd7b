//! Console output formatter for analysis results and transcripts

use colored::Colorize;
use parley_domain::{ConfigIssue, FeedbackResult, Message, Sender, Severity, SuggestionResult};

/// Formats chat output for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format realtime feedback on the last exchange
    pub fn format_feedback(feedback: &FeedbackResult) -> String {
        let mut output = Self::section_header("Feedback");

        if let Some(score) = feedback.score {
            output.push_str(&format!("{} {}/10\n", "Score:".cyan().bold(), score));
        }
        output.push_str(&format!("{}\n", feedback.summary));

        if !feedback.strengths.is_empty() {
            output.push_str(&format!("\n{}\n", "Strengths:".green().bold()));
            for point in &feedback.strengths {
                output.push_str(&format!("  + {}\n", point));
            }
        }

        if !feedback.improvements.is_empty() {
            output.push_str(&format!("\n{}\n", "To improve:".yellow().bold()));
            for point in &feedback.improvements {
                output.push_str(&format!("  * {}\n", point));
            }
        }

        output
    }

    /// Format a coaching suggestion
    pub fn format_suggestion(suggestion: &SuggestionResult) -> String {
        let mut output = Self::section_header("Try saying");
        output.push_str(&format!("{}\n", suggestion.suggestion.bold()));
        if let Some(rationale) = &suggestion.rationale {
            output.push_str(&format!("\n{}\n", Self::indent(rationale, "  ").dimmed()));
        }
        output
    }

    /// Format the committed conversation so far
    pub fn format_history(persona_id: &str, messages: &[Message]) -> String {
        let mut output = Self::section_header(&format!("Conversation with {}", persona_id));
        if messages.is_empty() {
            output.push_str(&format!("{}\n", "(no messages yet)".dimmed()));
            return output;
        }

        for message in messages {
            let label = match message.sender {
                Sender::User => "you".green().bold(),
                Sender::Ai => persona_id.cyan().bold(),
            };
            output.push_str(&format!(
                "{} {}\n{}\n",
                label,
                message.created_at.format("%H:%M:%S").to_string().dimmed(),
                Self::indent(&message.text, "  ")
            ));
        }
        output
    }

    /// Format one configuration issue as a single line
    pub fn format_issue(issue: &ConfigIssue) -> String {
        match issue.severity {
            Severity::Error => format!("{} {}", "error:".red().bold(), issue.message),
            Severity::Warning => format!("{} {}", "warning:".yellow().bold(), issue.message),
        }
    }

    /// Prefix the persona's name before a streamed reply
    pub fn reply_prefix(persona_id: &str) -> String {
        format!("{} ", format!("{}>", persona_id).cyan().bold())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_feedback_sections() {
        plain();
        let feedback = FeedbackResult {
            summary: "Polite and clear.".to_string(),
            strengths: vec!["greeting".to_string()],
            improvements: vec!["ask a question".to_string()],
            score: Some(8),
        };

        let output = ConsoleFormatter::format_feedback(&feedback);
        assert!(output.contains("Score: 8/10"));
        assert!(output.contains("Polite and clear."));
        assert!(output.contains("  + greeting"));
        assert!(output.contains("  * ask a question"));
    }

    #[test]
    fn test_format_feedback_summary_only() {
        plain();
        let output = ConsoleFormatter::format_feedback(&FeedbackResult::from_summary("Fine."));
        assert!(!output.contains("Score"));
        assert!(!output.contains("Strengths"));
    }

    #[test]
    fn test_format_history() {
        plain();
        let output = ConsoleFormatter::format_history(
            "barista",
            &[Message::user("hi"), Message::ai("hello\nwhat can I get you?")],
        );
        assert!(output.contains("you "));
        assert!(output.contains("barista "));
        assert!(output.contains("  what can I get you?"));
        assert!(ConsoleFormatter::format_history("barista", &[]).contains("(no messages yet)"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
