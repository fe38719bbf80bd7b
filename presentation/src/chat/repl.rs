//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use parley_application::{
    SessionError, StreamOrchestrator, TurnAnalyzer, TurnError, TurnEvent,
    TurnRequest,
};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

const LOCAL_OWNER: &str = "local";

/// Interactive chat REPL bound to one session
pub struct ChatRepl {
    orchestrator: StreamOrchestrator,
    analyzer: TurnAnalyzer,
    session_id: String,
    persona_id: String,
    show_progress: bool,
}

impl ChatRepl {
    /// Open a new session with the persona and bind the REPL to it.
    pub async fn start(
        orchestrator: StreamOrchestrator,
        analyzer: TurnAnalyzer,
        persona_id: &str,
        system_instruction: &str,
    ) -> Result<Self, SessionError> {
        let session_id = orchestrator
            .registry()
            .create(LOCAL_OWNER, persona_id, system_instruction)
            .await?;

        Ok(Self {
            orchestrator,
            analyzer,
            session_id,
            persona_id: persona_id.to_string(),
            show_progress: true,
        })
    }

    /// Set whether to show the waiting spinner
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("parley").join("history.txt"));
        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            match rl.readline("you> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);

                    if line.starts_with('/') {
                        if self.handle_command(line).await {
                            break;
                        }
                        continue;
                    }

                    self.process_turn(TurnRequest::new(&self.session_id, line))
                        .await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        if let Err(e) = self.orchestrator.registry().close(&self.session_id).await {
            tracing::debug!("Session close on exit failed: {}", e);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│               Parley - Chat Mode            │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Persona: {}", self.persona_id.cyan().bold());
        println!();
        Self::print_help();
    }

    fn print_help() {
        println!("Commands:");
        println!("  /feedback       - Feedback on your last exchange");
        println!("  /suggest        - Suggest your next message");
        println!("  /coach <msg>    - Ask the coach instead of the persona");
        println!("  /history        - Show the conversation so far");
        println!("  /help, /h, /?   - Show this help");
        println!("  /quit, /exit, /q - Exit chat");
        println!();
    }

    /// Handle slash commands. Returns true if should exit.
    async fn handle_command(&self, line: &str) -> bool {
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match cmd {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                return true;
            }
            "/help" | "/h" | "/?" => {
                println!();
                Self::print_help();
            }
            "/feedback" => {
                let spinner = self.spinner("Analyzing your last exchange...");
                let result = self.analyzer.feedback_for_session(&self.session_id).await;
                Self::finish(spinner);
                match result {
                    Ok(feedback) => println!("{}", ConsoleFormatter::format_feedback(&feedback)),
                    Err(e) => eprintln!("{} {}", "Feedback unavailable:".red(), e),
                }
            }
            "/suggest" => {
                let spinner = self.spinner("Thinking of a next message...");
                let result = self.analyzer.suggestion_for_session(&self.session_id).await;
                Self::finish(spinner);
                match result {
                    Ok(suggestion) => {
                        println!("{}", ConsoleFormatter::format_suggestion(&suggestion))
                    }
                    Err(e) => eprintln!("{} {}", "Suggestion unavailable:".red(), e),
                }
            }
            "/coach" => {
                if rest.is_empty() {
                    println!("Usage: /coach <message>");
                } else {
                    self.process_turn(TurnRequest::new(&self.session_id, rest).coaching())
                        .await;
                }
            }
            "/history" => match self.orchestrator.registry().get(&self.session_id).await {
                Ok(log) => println!(
                    "{}",
                    ConsoleFormatter::format_history(&self.persona_id, log.messages())
                ),
                Err(e) => eprintln!("Error: {}", e),
            },
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
            }
        }
        println!();
        false
    }

    /// Stream one turn to the terminal. Ctrl-C abandons it.
    async fn process_turn(&self, request: TurnRequest) {
        let (tx, mut rx) = mpsc::channel(self.orchestrator.config().chunk_buffer);

        let orchestrator = self.orchestrator.clone();
        let turn = tokio::spawn(async move { orchestrator.open_turn(request, tx).await });

        let mut spinner = self.spinner("...");
        let prefix = ConsoleFormatter::reply_prefix(&self.persona_id);
        let mut replying = false;

        loop {
            let received = tokio::select! {
                event = rx.recv() => Some(event),
                _ = tokio::signal::ctrl_c() => None,
            };

            let Some(event) = received else {
                Self::finish(spinner.take());
                println!("\n{}", "(reply abandoned)".dimmed());
                // Closing the receiver makes the turn abort
                drop(rx);
                let _ = turn.await;
                return;
            };
            let Some(event) = event else {
                break;
            };
            Self::finish(spinner.take());

            match event {
                TurnEvent::Chunk(chunk) => {
                    if !replying {
                        print!("{}", prefix);
                        replying = true;
                    }
                    print!("{}", chunk);
                    let _ = std::io::stdout().flush();
                }
                TurnEvent::Done(_) => println!("\n"),
                TurnEvent::Failed(message) => {
                    eprintln!("\n{} {}\n", "Error:".red().bold(), message);
                }
            }
        }

        match turn.await {
            Ok(Err(TurnError::SessionBusy(_))) => {
                eprintln!("{}", "A reply is still streaming.".yellow());
            }
            Ok(_) => {}
            Err(e) => eprintln!("Turn task failed: {}", e),
        }
    }

    fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn finish(spinner: Option<ProgressBar>) {
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
    }
}
