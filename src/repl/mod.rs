//! Interactive REPL for vcon-chat
//!
//! Thin readline shell over the orchestration loop: slash commands for
//! model selection and conversation reset, everything else goes to the
//! model. Chrome only; all interesting behavior lives in `chat` and
//! `tools`.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::chat::{run_turn, ConversationSession, TurnOptions, TurnOutcome};
use crate::provider::{Provider, Role};
use crate::semantic::SemanticSearch;
use crate::tools::{tool_summary, ToolDeps, ToolRegistry};

/// Default system prompt for the vCon assistant
pub const SYSTEM_PROMPT: &str = "You are an assistant for exploring a store of vCon \
conversation records (call and chat transcripts with participants and metadata). Use the \
provided tools to look up conversations by participant, creation date, uuid, or meaning \
before answering, and cite vCon uuids when you reference specific conversations.";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: ConversationSession,
    registry: ToolRegistry,
    provider: Box<dyn Provider>,
    db: SqlitePool,
    semantic: SemanticSearch,
    opts: TurnOptions,
    search_limit: usize,
    history_path: PathBuf,
}

impl Repl {
    pub fn new(
        provider: Box<dyn Provider>,
        model: String,
        db: SqlitePool,
        semantic: SemanticSearch,
        search_limit: usize,
    ) -> Result<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs::home_dir()
            .unwrap_or_default()
            .join(".vcon-chat")
            .join("history");

        Ok(Self {
            editor,
            session: ConversationSession::new(SYSTEM_PROMPT),
            registry: ToolRegistry::new(),
            provider,
            db,
            semantic,
            opts: TurnOptions::new(model),
            search_limit,
            history_path,
        })
    }

    /// Run the interactive loop until /quit or EOF
    pub async fn run(&mut self) -> Result<()> {
        let _ = self.editor.load_history(&self.history_path);

        println!("vcon-chat v{}", env!("CARGO_PKG_VERSION"));
        println!("Model: {} ({})", self.opts.model, self.provider.name());
        println!("Type /help for commands.\n");

        loop {
            match self.editor.readline("> ") {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);

                    if line.starts_with('/') {
                        if !self.handle_command(&line).await {
                            break;
                        }
                    } else if let Err(e) = self.handle_query(&line).await {
                        // Transport failure: this turn is lost, history is not
                        eprintln!("Error: {:#}", e);
                        eprintln!("(conversation preserved - you can retry)");
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Readline error: {}", e);
                    break;
                }
            }
        }

        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = self.editor.save_history(&self.history_path);
        Ok(())
    }

    /// Handle a slash command; returns false to exit
    async fn handle_command(&mut self, cmd: &str) -> bool {
        let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
        let command = parts[0];
        let arg = parts.get(1).copied().unwrap_or("").trim();

        match command {
            "/help" => {
                println!("Commands:");
                println!("  /help           - Show this help");
                println!("  /models         - List models on the active backend");
                println!("  /model <name>   - Switch model");
                println!("  /clear          - Clear conversation history");
                println!("  /quit           - Exit");
            }
            "/models" => {
                for model in self.provider.list_models().await {
                    let marker = if model == self.opts.model { "*" } else { " " };
                    println!(" {} {}", marker, model);
                }
            }
            "/model" => {
                if arg.is_empty() {
                    println!("Current model: {}", self.opts.model);
                } else {
                    self.opts.model = arg.to_string();
                    println!("Switched to {}", self.opts.model);
                }
            }
            "/clear" => {
                self.session.clear();
                println!("Conversation cleared.");
            }
            "/quit" | "/exit" => return false,
            _ => println!("Unknown command: {} (try /help)", command),
        }

        true
    }

    /// Send a query through the orchestration loop and render the result
    async fn handle_query(&mut self, input: &str) -> Result<()> {
        let deps = ToolDeps {
            db: &self.db,
            semantic: &self.semantic,
            search_limit: self.search_limit,
        };

        let before = self.session.history().len();
        let result = run_turn(
            input,
            &mut self.session,
            self.provider.as_ref(),
            &self.registry,
            &deps,
            &self.opts,
        )
        .await?;

        // Show what the model looked up this turn
        for turn in &self.session.history()[before..] {
            if turn.role == Role::Assistant {
                for call in &turn.tool_calls {
                    println!("  [{}] {}", call.tool_name, tool_summary(&call.tool_name, &call.arguments));
                }
            }
        }

        if result.answer.is_empty() {
            println!("(no answer)");
        } else {
            println!("{}", result.answer);
        }
        if result.outcome == TurnOutcome::IterationCapReached {
            if let Some(advisory) = result.advisory {
                println!("! {}", advisory);
            }
        }

        Ok(())
    }
}
