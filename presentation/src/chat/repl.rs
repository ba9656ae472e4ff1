//! REPL (Read-Eval-Print Loop) for an interactive consultation

use crate::config::{OutputConfig, ReplConfig};
use crate::output::formatter::{JsonFormatter, OutputFormatter};
use crate::{ConsoleFormatter, OutputFormat};
use ckm_application::{AssessmentProvider, ConsultationSession, SynthesisProvider, TurnOutput};
use ckm_domain::IntakeState;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};

/// What a slash command asks the loop to do
#[derive(Debug, PartialEq, Eq)]
enum CommandOutcome {
    Continue,
    Quit,
}

/// Interactive consultation REPL
pub struct ConsultRepl<A: AssessmentProvider + 'static, S: SynthesisProvider + 'static> {
    session: ConsultationSession<A, S>,
    output: OutputConfig,
    config: ReplConfig,
}

impl<A: AssessmentProvider + 'static, S: SynthesisProvider + 'static> ConsultRepl<A, S> {
    /// Create a new ConsultRepl
    pub fn new(session: ConsultationSession<A, S>) -> Self {
        Self {
            session,
            output: OutputConfig::default(),
            config: ReplConfig::default(),
        }
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    pub fn with_config(mut self, config: ReplConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        if let Some(path) = &self.config.history_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();
        let greeting = TurnOutput::Prompt(self.session.greeting());
        self.print_turn(&greeting);

        loop {
            let readline = rl.readline(">>> ");

            match readline {
                Ok(line) => {
                    let line = line.trim();

                    // Skip empty lines
                    if line.is_empty() {
                        continue;
                    }

                    // Handle commands
                    if line.starts_with('/') {
                        if self.handle_command(line) == CommandOutcome::Quit {
                            break;
                        }
                        continue;
                    }

                    let input = if self.session.intake().state() == IntakeState::AwaitingPaste {
                        Self::read_paste(&mut rl, line)
                    } else {
                        line.to_string()
                    };

                    let _ = rl.add_history_entry(line);
                    self.process_input(&input).await;
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

        if let Some(path) = &self.config.history_file {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    /// Collect a multi-line paste; a blank line ends it
    fn read_paste(rl: &mut DefaultEditor, first: &str) -> String {
        let mut lines = vec![first.to_string()];
        while let Ok(next) = rl.readline("... ") {
            if next.trim().is_empty() {
                break;
            }
            lines.push(next);
        }
        lines.join("\n")
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│        CKM Consultation Board               │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!(
            "Roles: {}",
            self.session
                .config()
                .roles
                .iter()
                .map(|r| r.role.display_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();
        Self::print_help();
    }

    fn print_help() {
        println!("Commands:");
        println!("  /help, /h, /?     - Show this help");
        println!("  /case             - Show the case collected so far");
        println!("  /reset            - Discard this consultation and start over");
        println!("  /quit, /exit, /q  - Exit");
        println!();
        println!("In paste mode, end the pasted case with a blank line.");
        println!("Press Ctrl-C while the board is working to cancel the submission.");
        println!();
    }

    fn handle_command(&mut self, cmd: &str) -> CommandOutcome {
        match cmd {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                CommandOutcome::Quit
            }
            "/help" | "/h" | "/?" => {
                println!();
                Self::print_help();
                CommandOutcome::Continue
            }
            "/case" => {
                let summary = self.session.intake().case().summary();
                if summary.is_empty() {
                    println!("No case details yet.");
                } else {
                    println!("{}", summary);
                }
                CommandOutcome::Continue
            }
            "/reset" => {
                let prompt = self.session.reset();
                println!("{}", "Consultation reset.".yellow());
                self.print_turn(&TurnOutput::Prompt(prompt));
                CommandOutcome::Continue
            }
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
                CommandOutcome::Continue
            }
        }
    }

    async fn process_input(&mut self, input: &str) {
        println!();

        // Ctrl-C during a submission resets the session instead of exiting
        let reset = self.session.reset_handle();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                reset.reset();
            }
        });

        let result = self.session.handle_turn(input).await;
        watcher.abort();

        match result {
            Ok(TurnOutput::Cancelled) => {
                self.print_turn(&TurnOutput::Cancelled);
                let greeting = TurnOutput::Prompt(self.session.greeting());
                self.print_turn(&greeting);
            }
            Ok(output) => self.print_turn(&output),
            Err(e) => {
                eprintln!("{} {}", "Internal error:".red().bold(), e);
            }
        }
    }

    fn print_turn(&self, output: &TurnOutput) {
        let text = match self.output.format {
            OutputFormat::Text => ConsoleFormatter.format_turn(output),
            OutputFormat::Json => JsonFormatter.format_turn(output),
        };
        println!("{}", text);
    }
}
