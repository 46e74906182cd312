use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::{ColoredString, Colorize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use digestigo_core::{
    CategorizationOrchestrator, Category, ChatAssistant, CommandClassifier, Config,
    DigestigoError, EntryStore, FileStore, HealthInsights, OrchestrationResult, OverrideOutcome,
    Result, Store,
};

mod args;
mod report;
use args::{Cli, Commands, ConfigAction, Shell};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let base_dir = resolve_base_dir(cli.base_dir);

    let result = match cli.command {
        Some(Commands::Track { message, json }) => {
            handle_track(&base_dir, &message.join(" "), json).await
        }
        Some(Commands::Chat { reset }) => handle_chat(&base_dir, reset).await,
        Some(Commands::Recategorize { category, message }) => {
            handle_recategorize(&base_dir, &message.join(" "), category).await
        }
        Some(Commands::Entries {
            category,
            limit,
            json,
        }) => handle_entries(&base_dir, category, limit, json).await,
        Some(Commands::Summary { json }) => handle_summary(&base_dir, json).await,
        Some(Commands::Insights { refresh }) => handle_insights(&base_dir, refresh).await,
        Some(Commands::Report { notes }) => handle_report(&base_dir, notes.as_deref()).await,
        Some(Commands::Clear { force }) => handle_clear(&base_dir, force).await,
        Some(Commands::Check) => handle_check(&base_dir).await,
        Some(Commands::Config { action }) => handle_config(action, &base_dir),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            Ok(())
        }
        None => {
            Cli::command().print_help().ok();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "digestigo", &mut io::stdout());
}

fn resolve_base_dir(cli_base: Option<PathBuf>) -> PathBuf {
    if let Some(base) = cli_base {
        return base;
    }

    if let Ok(base) = std::env::var("DIGESTIGO_BASE") {
        return PathBuf::from(base);
    }

    dirs::home_dir()
        .map(|h| h.join(".digestigo"))
        .unwrap_or_else(|| PathBuf::from(".digestigo"))
}

// ============================================================================
// Wiring
// ============================================================================

struct App {
    config: Config,
    classifier: Arc<CommandClassifier>,
    entries: Arc<EntryStore>,
    orchestrator: CategorizationOrchestrator,
    insights: HealthInsights,
    assistant: ChatAssistant,
}

impl App {
    fn load(base_dir: &Path) -> Result<Self> {
        let config = Config::load(base_dir)?;
        let store: Arc<dyn Store> = Arc::new(FileStore::new(config.data_dir(base_dir)));
        let classifier = Arc::new(CommandClassifier::new(
            config.classifier.command.clone(),
            config.classifier.args.clone(),
        ));

        let entries = Arc::new(EntryStore::new(Arc::clone(&store)));
        let orchestrator = CategorizationOrchestrator::new(classifier.clone(), Arc::clone(&entries))
            .with_builder(config.classifier.request_builder())
            .with_timeout(config.classifier.timeout());
        let insights = HealthInsights::new(classifier.clone(), Arc::clone(&store));
        let assistant = ChatAssistant::new(classifier.clone(), store)
            .with_timeout(config.classifier.timeout());

        Ok(Self {
            config,
            classifier,
            entries,
            orchestrator,
            insights,
            assistant,
        })
    }
}

// ============================================================================
// Tracking commands
// ============================================================================

async fn handle_track(base_dir: &Path, message: &str, json: bool) -> Result<()> {
    let app = App::load(base_dir)?;
    let result = app.orchestrator.process(message).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

async fn handle_chat(base_dir: &Path, reset: bool) -> Result<()> {
    let app = App::load(base_dir)?;
    if reset {
        app.assistant.clear().await?;
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{} Type a message and press Enter. Ctrl-D to quit.",
        "digestigo".cyan().bold()
    );
    if let Some(last) = app.assistant.history().await.last() {
        if !last.is_user {
            println!("{}", last.text);
        }
    }
    loop {
        print!("{} ", ">".cyan());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let reply = app.assistant.reply(message).await;
        if reply.failed {
            println!("{}", reply.message.text.red());
        } else {
            println!("{}", reply.message.text);
        }

        // 保存に失敗しても会話は続ける
        match app.orchestrator.process(message).await {
            Ok(result) => print_result(&result),
            Err(e) => eprintln!("{} {}", "[WARN]".yellow().bold(), e),
        }
    }

    println!();
    Ok(())
}

async fn handle_recategorize(base_dir: &Path, message: &str, category: Category) -> Result<()> {
    let app = App::load(base_dir)?;

    match app.orchestrator.recategorize(message, category).await? {
        OverrideOutcome::Accepted { entry, .. } => {
            println!("{} {}", "Changed to".green(), badge(category));
            match entry {
                Some(entry) => println!("  {} {}", "Saved:".green(), entry.summary),
                None if category.is_trackable() => {
                    println!("  {}", "Already tracked".dimmed())
                }
                None => println!("  {}", "Not saved".dimmed()),
            }
        }
        OverrideOutcome::Rejected { requested, kept } => {
            println!(
                "{} This message doesn't fit the \"{}\" category. Keeping as \"{}\".",
                "Invalid Category:".yellow(),
                requested,
                kept
            );
        }
    }
    Ok(())
}

async fn handle_entries(
    base_dir: &Path,
    category: Option<Category>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let app = App::load(base_dir)?;
    let mut entries: Vec<_> = app
        .entries
        .all()
        .await
        .into_iter()
        .filter(|e| category.map_or(true, |c| e.category == c))
        .collect();

    if let Some(limit) = limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries tracked yet.");
        return Ok(());
    }

    println!();
    for entry in &entries {
        let food = entry
            .food_category
            .map(|f| format!(" ({})", f.label()))
            .unwrap_or_default();
        println!(
            "{}  {:<10} {}{}",
            entry
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed(),
            badge(entry.category),
            entry.summary,
            food.dimmed()
        );
    }
    println!();
    println!("Total: {}", entries.len());
    Ok(())
}

async fn handle_summary(base_dir: &Path, json: bool) -> Result<()> {
    let app = App::load(base_dir)?;
    let summary = app.entries.summary().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "Total entries:".bold(), summary.total_entries);

    println!();
    println!("{}", "Symptoms".red().bold());
    if summary.symptoms.is_empty() {
        println!("  No symptoms tracked yet");
    }
    for item in &summary.symptoms {
        println!("  • {}", item.summary);
    }

    println!();
    println!("{}", "Dietary Intake".green().bold());
    if summary.dietary.total() == 0 {
        println!("  No dietary data yet");
    } else {
        let pct = summary.dietary.percentages();
        for (label, count, percent) in [
            ("Carbs", summary.dietary.carbs, pct.carbs),
            ("Proteins", summary.dietary.proteins, pct.proteins),
            ("Dairy", summary.dietary.dairy, pct.dairy),
            ("Fibre", summary.dietary.fibre, pct.fibre),
        ] {
            if count > 0 {
                println!("  {} ({}) - {}%", label, count, percent);
            }
        }
    }

    println!();
    println!("{}", "Triggers".yellow().bold());
    if summary.triggers.is_empty() {
        println!("  No triggers identified yet");
    }
    for item in &summary.triggers {
        println!("  • {}", item.summary);
    }
    println!();
    Ok(())
}

async fn handle_insights(base_dir: &Path, refresh: bool) -> Result<()> {
    let app = App::load(base_dir)?;
    let summary = app.entries.summary().await;

    let text = if refresh {
        app.insights.regenerate(&summary).await?
    } else {
        app.insights.current(&summary).await?
    };
    println!("{}", text);
    Ok(())
}

async fn handle_report(base_dir: &Path, notes: Option<&str>) -> Result<()> {
    let app = App::load(base_dir)?;
    let summary = app.entries.summary().await;
    let insight = app.insights.cached().await;

    let today = Local::now().format("%B %-d, %Y").to_string();
    let report = report::Report {
        summary: &summary,
        insight: insight.as_deref(),
        notes,
        date: &today,
    };
    print!("{report}");
    Ok(())
}

async fn handle_clear(base_dir: &Path, force: bool) -> Result<()> {
    let app = App::load(base_dir)?;

    if !force {
        let count = app.entries.all().await.len();
        println!();
        println!(
            "Delete all tracking data? This will remove {} entries and the cached insight.",
            count.to_string().yellow()
        );
        println!();
        print!("Type 'yes' to confirm: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim() != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    app.entries.clear().await?;
    app.insights.clear().await?;
    println!("{}", "Cleared all tracking data.".red());
    Ok(())
}

async fn handle_check(base_dir: &Path) -> Result<()> {
    let app = App::load(base_dir)?;
    let command = &app.config.classifier.command;

    if app.classifier.is_available().await {
        println!("{} {}", "Available:".green(), command);
        Ok(())
    } else {
        Err(DigestigoError::ClassifierUnavailable {
            message: format!("'{} --version' failed", command),
        })
    }
}

fn handle_config(action: ConfigAction, base_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(base_dir)?;
            match config.get(&key) {
                Some(value) => {
                    println!("{}", value);
                }
                None => {
                    return Err(DigestigoError::ConfigKeyNotFound { key });
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(base_dir)?;
            config.set(&key, &value)?;
            config.save(base_dir)?;
            println!("{} {} = {}", "Set:".green(), key, value);
        }
        ConfigAction::List => {
            let config = Config::load(base_dir)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            let path = Config::path(base_dir);
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            let path = Config::init(base_dir)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
    }

    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn badge(category: Category) -> ColoredString {
    let text = format!("[{}]", category.label());
    match category {
        Category::Symptom => text.red(),
        Category::Dietary => text.green(),
        Category::Trigger => text.yellow(),
        Category::General => text.dimmed(),
    }
}

fn print_result(result: &OrchestrationResult) {
    let badges: Vec<String> = result
        .categories
        .iter()
        .map(|c| badge(*c).to_string())
        .collect();

    let status = if result.cancelled {
        "Cancelled".yellow()
    } else if result.saved {
        "Saved".green()
    } else if result.duplicates > 0 {
        "Already tracked".dimmed()
    } else {
        "Not saved".dimmed()
    };
    println!("{} {}", badges.join(" "), status);

    if result.categories.iter().any(|c| c.is_trackable()) {
        for (category, summary) in &result.summaries {
            println!("  {} {}", format!("{}:", category).dimmed(), summary);
        }
    }

    for entry in result
        .written
        .iter()
        .filter(|e| !result.categories.contains(&e.category))
    {
        println!("  {} {}", "Also tracked:".dimmed(), entry.summary);
    }
}
