use clap::Parser;
use colored::*;
use std::sync::Arc;
use stu::chat_ui::ChatUI;
use stu::{
    chat, AssistantFactory, Error, Ollama, ReplyView, Result, Session, Settings, SyncOutcome,
    ToolSelection,
};
use tracing::warn;

/// Chat with a local Llama3 model that can look up stock data and search the web
#[derive(Parser, Debug)]
#[command(name = "stu", version, about)]
struct Cli {
    /// Model to use (overrides STU_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Ollama server address (overrides OLLAMA_HOST)
    #[arg(long)]
    ollama_url: Option<String>,

    /// Start with the stock-data tool disabled
    #[arg(long)]
    no_stock_data: bool,

    /// Start with the web-search tool disabled
    #[arg(long)]
    no_web_search: bool,

    /// Replay at most this many transcript messages to the model
    #[arg(long)]
    history_limit: Option<usize>,

    /// Tool-call rounds allowed per prompt
    #[arg(long)]
    max_tool_rounds: Option<usize>,

    /// Sampling temperature (overrides STU_TEMPERATURE)
    #[arg(long)]
    temperature: Option<f32>,

    /// Increase log output (-v for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    if verbose > 0 {
        if let Ok(directive) = "stu=debug".parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(url) = &cli.ollama_url {
        settings.ollama_url = url.trim_end_matches('/').to_string();
    }
    if cli.history_limit.is_some() {
        settings.history_limit = cli.history_limit;
    }
    if let Some(rounds) = cli.max_tool_rounds {
        settings.max_tool_rounds = rounds;
    }
    if cli.temperature.is_some() {
        settings.temperature = cli.temperature;
    }
    settings.validate()?;
    Ok(settings)
}

/// Rebuild the session for `selection`, reporting what happened
fn apply_selection(
    ui: &ChatUI,
    session: &mut Session,
    selection: ToolSelection,
    factory: &AssistantFactory,
) {
    match session.sync(selection, factory) {
        Ok(SyncOutcome::Unchanged) => ui.print_notice("Tools unchanged."),
        Ok(SyncOutcome::Created) => ui.print_tool_status(&selection),
        Ok(SyncOutcome::Rebuilt) => {
            ui.print_notice("Tools changed: started a new conversation.");
            ui.print_tool_status(&selection);
        }
        Err(e) => ui.print_error(&format!("Could not build the assistant: {}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if e.is_config() {
                eprintln!("Please add your SerpApi key, for example:");
                eprintln!("  echo 'SERPAPI_API_KEY=your-api-key-here' >> ~/.stu.env");
            }
            std::process::exit(1);
        }
    };

    let ollama = Ollama::new(settings.ollama_url.clone());
    match ollama.list_models().await {
        Ok(models) => {
            let pulled = models.iter().any(|m| {
                *m == settings.model || m.split(':').next() == Some(settings.model.as_str())
            });
            if !pulled {
                warn!(
                    model = %settings.model,
                    "model not pulled yet; run 'ollama pull {}'",
                    settings.model
                );
            }
        }
        Err(e) => warn!(error = %e, "model backend check failed"),
    }

    let factory = AssistantFactory::new(
        Arc::new(ollama),
        settings.model.clone(),
        settings.tool_settings(),
    )
    .with_history_limit(settings.history_limit)
    .with_max_tool_rounds(settings.max_tool_rounds)
    .with_options(settings.model_options());

    let ui = ChatUI::new();
    ui.print_welcome();
    println!("{} Using model: {}\n", "✓".green(), settings.model.cyan());

    let mut session = Session::new();
    let mut requested = ToolSelection {
        stock_data: !cli.no_stock_data,
        web_search: !cli.no_web_search,
    };
    apply_selection(&ui, &mut session, requested, &factory);

    loop {
        let input = match ui.read_prompt() {
            Ok(input) => input,
            Err(e) => {
                ui.print_error(&e.to_string());
                break;
            }
        };

        let command = input.trim();
        if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
            println!("\n{}", "👋 Goodbye!".yellow());
            break;
        } else if command.eq_ignore_ascii_case("/tools") {
            let current = session.selection().unwrap_or(requested);
            match ui.select_tools(&current) {
                Ok(selection) => {
                    requested = selection;
                    apply_selection(&ui, &mut session, selection, &factory);
                }
                Err(e) => ui.print_error(&e.to_string()),
            }
            continue;
        } else if command.eq_ignore_ascii_case("/status") {
            match session.active() {
                Some(active) => {
                    ui.print_tool_status(&active.selection());
                    ui.print_tool_calls(active.assistant().registry().execution_stats());
                }
                None => ui.print_notice("No assistant yet. Use /tools to select tools."),
            }
            continue;
        } else if command.eq_ignore_ascii_case("/history") {
            ui.print_history(session.active().map(|active| active.transcript()));
            continue;
        } else if command.eq_ignore_ascii_case("/help") {
            ui.print_help();
            continue;
        }

        if !session.is_active() {
            // A previous build failed; retry with the last requested tools.
            apply_selection(&ui, &mut session, requested, &factory);
            if !session.is_active() {
                continue;
            }
        }

        let mut view = ui.reply_view();
        let outcome = tokio::select! {
            outcome = chat::submit(&mut session, &input, &mut view) => outcome,
            _ = tokio::signal::ctrl_c() => Err(Error::Cancelled),
        };
        if let Err(Error::Cancelled) = outcome {
            view.fail(&Error::Cancelled);
        }
        println!();
    }

    Ok(())
}
