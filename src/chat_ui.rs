use crate::chat::{ReplyView, TYPING_MARKER};
use crate::error::{Error, Result};
use crate::message::{Role, Transcript};
use crate::toolkit::{ToolKind, ToolSelection};
use chrono::Local;
use colored::*;
use console::{measure_text_width, Term};
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const TITLE: &str = "Stu Customer Service AI Assistant";

const DESCRIPTION: &str = "This app demonstrates function calling with the local Llama3 model using Ollama.\n\
Select tools with /tools and ask relevant questions!";

/// Terminal rendering of the chat page
///
/// Prints the banner, tool panel and history, and reads prompts and tool
/// selections from the user.
pub struct ChatUI {
    term: Term,
}

impl Default for ChatUI {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatUI {
    /// Create a UI writing to stdout
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Clear the screen and print the banner, description and commands
    pub fn print_welcome(&self) {
        let _ = self.term.clear_screen();
        let rule = "═".repeat(60);
        println!("{}", rule.bright_blue());
        println!("{}", format!("  📷 {}", TITLE).bright_blue().bold());
        println!("{}", rule.bright_blue());
        println!();
        println!("{}", DESCRIPTION.dimmed());
        println!();
        self.print_help();
    }

    /// List the available commands
    pub fn print_help(&self) {
        println!("{}", "Commands:".yellow());
        println!("  • {} - Choose which tools are enabled", "/tools".cyan());
        println!("  • {} - Show the current tools", "/status".cyan());
        println!("  • {} - Show the conversation so far", "/history".cyan());
        println!("  • {} - Show this help message", "/help".cyan());
        println!(
            "  • {} or {} - Exit the assistant",
            "exit".cyan(),
            "quit".cyan()
        );
        println!("{}", "─".repeat(60).dimmed());
        println!();
    }

    /// The tool panel: one status line per toolkit
    pub fn print_tool_status(&self, selection: &ToolSelection) {
        println!("{}", "Current Tools:".yellow().bold());
        for line in tool_status_lines(selection) {
            println!("  {}", line);
        }
        println!();
    }

    /// Totals of the tool calls made by the current assistant
    pub fn print_tool_calls(&self, (completed, failed): (usize, usize)) {
        println!("  {}", tool_call_summary(completed, failed).dimmed());
        println!();
    }

    /// Print one transcript entry with a timestamp and role tag
    pub fn print_message(&self, role: Role, content: &str) {
        let timestamp = Local::now().format("%H:%M:%S");
        let tag = match role {
            Role::User => "You:".green().bold(),
            Role::Assistant => "Assistant:".blue().bold(),
        };
        println!("{} {} {}", format!("[{}]", timestamp).dimmed(), tag, content);
    }

    /// Print the transcript, or a note when there is none yet
    pub fn print_history(&self, transcript: Option<&Transcript>) {
        let transcript = match transcript {
            Some(transcript) if !transcript.is_empty() => transcript,
            _ => {
                println!("{}", "No messages yet.".dimmed());
                return;
            }
        };
        for message in transcript.messages() {
            self.print_message(message.role, &message.content);
        }
        println!("{}", history_summary(transcript).dimmed());
        println!();
    }

    /// Informational line
    pub fn print_notice(&self, notice: &str) {
        println!("{} {}", "ℹ".blue(), notice);
    }

    /// Error line
    pub fn print_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error);
    }

    /// Read one line from the prompt; empty input is allowed
    pub fn read_prompt(&self) -> Result<String> {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Ask a question based on the enabled tools")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Other(format!("Failed to read input: {}", e)))
    }

    /// Show the tool checkboxes, pre-ticked from `current`
    pub fn select_tools(&self, current: &ToolSelection) -> Result<ToolSelection> {
        let labels: Vec<&str> = ToolKind::ALL.iter().map(|kind| kind.label()).collect();
        let defaults: Vec<bool> = ToolKind::ALL
            .iter()
            .map(|kind| current.is_enabled(*kind))
            .collect();

        let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Tool Selection (space to toggle, enter to confirm)")
            .items(&labels)
            .defaults(&defaults)
            .interact()
            .map_err(|e| Error::Other(format!("Failed to read tool selection: {}", e)))?;

        let kinds: Vec<ToolKind> = chosen.into_iter().map(|idx| ToolKind::ALL[idx]).collect();
        Ok(ToolSelection::from_kinds(&kinds))
    }

    /// A view that streams one reply onto the terminal
    pub fn reply_view(&self) -> TerminalReplyView {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
            spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        spinner.set_message("Assistant is thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        TerminalReplyView {
            term: self.term.clone(),
            spinner: Some(spinner),
            printed: 0,
            marker_shown: false,
            started: false,
        }
    }
}

/// `4 messages (2 from you, 2 from the assistant)` line under the history
pub fn history_summary(transcript: &Transcript) -> String {
    format!(
        "{} messages ({} from you, {} from the assistant)",
        transcript.len(),
        transcript.count(Role::User),
        transcript.count(Role::Assistant)
    )
}

/// `Tool calls: 3 (1 failed)` line for the status panel
pub fn tool_call_summary(completed: usize, failed: usize) -> String {
    let total = completed + failed;
    if failed == 0 {
        format!("Tool calls: {}", total)
    } else {
        format!("Tool calls: {} ({} failed)", total, failed)
    }
}

/// `- YFinance: Enabled` style lines for the tool panel
pub fn tool_status_lines(selection: &ToolSelection) -> Vec<String> {
    ToolKind::ALL
        .iter()
        .map(|kind| {
            let state = if selection.is_enabled(*kind) {
                "Enabled".green()
            } else {
                "Disabled".red()
            };
            format!("- {}: {}", kind.short_name(), state)
        })
        .collect()
}

/// Streams a reply in place: prints only new text and keeps the typing
/// marker at the end until the reply completes
pub struct TerminalReplyView {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Bytes of the reply already written
    printed: usize,
    marker_shown: bool,
    started: bool,
}

impl TerminalReplyView {
    fn begin(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        if !self.started {
            self.started = true;
            let timestamp = Local::now().format("%H:%M:%S");
            let _ = self.term.write_str(&format!(
                "{} {} ",
                format!("[{}]", timestamp).dimmed(),
                "Assistant:".blue().bold()
            ));
        }
    }

    fn erase_marker(&mut self) {
        if self.marker_shown {
            let _ = self.term.clear_chars(measure_text_width(TYPING_MARKER));
            self.marker_shown = false;
        }
    }

    fn write_new(&mut self, text: &str) {
        if let Some(fresh) = text.get(self.printed..) {
            let _ = self.term.write_str(fresh);
            self.printed = text.len();
        }
    }
}

impl ReplyView for TerminalReplyView {
    fn partial(&mut self, text: &str) {
        self.begin();
        self.erase_marker();
        let body = text.strip_suffix(TYPING_MARKER).unwrap_or(text);
        self.write_new(body);
        let _ = self.term.write_str(TYPING_MARKER);
        self.marker_shown = true;
        let _ = self.term.flush();
    }

    fn complete(&mut self, text: &str) {
        self.begin();
        self.erase_marker();
        self.write_new(text);
        let _ = self.term.write_line("");
        let _ = self.term.flush();
    }

    fn fail(&mut self, error: &Error) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.erase_marker();
        if self.started {
            let _ = self.term.write_line("");
        }
        println!("{} {}", "Error:".red().bold(), error);
        if matches!(error, Error::Unavailable(_)) {
            println!("{}", "Start the model backend and submit the prompt again.".dimmed());
        } else {
            println!("{}", "Submit the prompt again to retry.".dimmed());
        }
    }
}

impl Drop for TerminalReplyView {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
