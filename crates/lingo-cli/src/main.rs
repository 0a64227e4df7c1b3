//! Lingo CLI
//!
//! Interactive terminal front end for practicing a language with the AI tutor.

mod commands;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use lingo_export::{CalendarGenerator, CalendarPlan, PlannedDay};
use lingo_tutor::{
    ClaudeOracle, Config, ConfigChange, Day, FeedbackEvent, Language, Level, Mode, Oracle,
    PracticeScheduler, Rejection, ScriptedOracle, SessionEvent, SessionManager, SubmitOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::commands::{parse_input, Command, Input, HELP};

/// Lingo - AI Language Tutor
///
/// Chat with a tutor that corrects your grammar, answers in the language you
/// are learning and keeps track of your weekly practice plan.
#[derive(Parser, Debug)]
#[command(name = "lingo")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: lingo.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Language to practice (overrides the config file)
    #[arg(short, long)]
    language: Option<Language>,

    /// Proficiency level, A1 to C2 (overrides the config file)
    #[arg(long)]
    level: Option<Level>,

    /// Conversation mode: casual or structured (overrides the config file)
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Run without contacting the language model; every turn uses fallbacks
    #[arg(long)]
    offline: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, offline = args.offline, "Lingo starting");

    match run_tutor(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the interactive session until `/quit` or end of input.
async fn run_tutor(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(level) = args.level {
        config.level = level;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }

    // Re-validate after overrides
    config.validate()?;

    let oracle = create_oracle(&config, args.offline)?;
    print_config(&config, args.offline);

    let session = SessionManager::new(oracle, &config);
    let mut scheduler = PracticeScheduler::new();

    let event_logger = tokio::spawn(log_events(session.subscribe()));

    if let Some(greeting) = session.transcript().await.first() {
        println!();
        println!("Tutor: {}", greeting.text);
    }
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match input {
            Input::Empty => {}
            Input::Utterance(text) => run_turn(&session, &text).await,
            Input::Command(Command::Quit) => break,
            Input::Command(command) => run_command(&session, &mut scheduler, command).await,
        }
    }

    print_summary(&session).await;
    event_logger.abort();
    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Picks the language oracle: the Messages API, or nothing when offline.
fn create_oracle(config: &Config, offline: bool) -> anyhow::Result<Arc<dyn Oracle>> {
    if offline {
        tracing::info!("Offline mode: replies use built-in fallbacks");
        return Ok(Arc::new(ScriptedOracle::unavailable()));
    }

    let oracle = ClaudeOracle::from_env(&config.oracle).map_err(|e| {
        anyhow::anyhow!("{e}\n\nSuggestion: Export the key or run with --offline to try Lingo without it")
    })?;
    tracing::info!(model = oracle.model(), "Using language model");
    Ok(Arc::new(oracle))
}

/// Logs every session event at debug level.
async fn log_events(mut receiver: broadcast::Receiver<SessionEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                tracing::debug!(event = event.event_name(), %payload, "Session event");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Submits one utterance and prints the reply and feedback.
async fn run_turn(session: &SessionManager, text: &str) {
    match session.submit(text).await {
        SubmitOutcome::Completed(report) => {
            println!();
            println!("Tutor: {}", report.tutor_message.text);
            print_feedback(&report.feedback);
        }
        SubmitOutcome::Rejected(reason) => println!("({reason})"),
    }
}

async fn run_command(session: &SessionManager, scheduler: &mut PracticeScheduler, command: Command) {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Stats => {
            let stats = session.stats().await;
            println!("Messages: {}", stats.message_count);
            println!("Grammar corrections: {}", stats.grammar_correction_count);
            println!("Duration: {} min", stats.duration_minutes);
            println!("Streak: {} days", scheduler.current_streak());
        }
        Command::Feedback => print_feedback(&session.feedback().await),
        Command::Goals => {
            for goal in session.goals().await {
                let mark = if goal.completed { "x" } else { " " };
                println!("[{mark}] {:>3}%  {}", goal.progress_percent(), goal.text);
            }
        }
        Command::Week => print_week(scheduler),
        Command::Toggle {
            day,
            index,
            completed,
        } => match scheduler.toggle_task(day, index, completed) {
            Ok(true) => println!("{day} complete!"),
            Ok(false) => print_day(scheduler, day),
            Err(e) => println!("{e}"),
        },
        Command::Practice(kind) => match session.start_quick_practice(kind).await {
            Ok(message) => println!("Tutor: {}", message.text),
            Err(reason) => println!("({reason})"),
        },
        Command::Language(language) => {
            print_config_change(session.set_language(language).await);
        }
        Command::Level(level) => print_config_change(session.set_level(level).await),
        Command::Mode(None) => println!("Mode: {}", session.toggle_mode().await),
        Command::Mode(Some(mode)) => {
            session.set_mode(mode).await;
            println!("Mode: {mode}");
        }
        Command::Export(path) => {
            let language = session.language().await;
            match export_calendar(scheduler, language, &path) {
                Ok(()) => println!("Calendar written to {}", path.display()),
                Err(e) => println!("Export failed: {e}"),
            }
        }
        // Handled by the input loop
        Command::Quit => {}
    }
}

/// Writes the weekly plan as an iCalendar file.
fn export_calendar(
    scheduler: &PracticeScheduler,
    language: Language,
    path: &Path,
) -> anyhow::Result<()> {
    let plan = scheduler
        .week()
        .iter()
        .fold(CalendarPlan::new(language.name()), |plan, (day, schedule)| {
            plan.day(PlannedDay::new(
                day.weekday(),
                schedule.activity.as_str(),
                schedule.tasks.iter().map(String::as_str),
            ))
        });

    let anchor = chrono::Local::now().date_naive();
    CalendarGenerator::new(&plan).write_to_file(path, anchor, chrono::Utc::now())?;
    tracing::info!(path = %path.display(), "Calendar exported");
    Ok(())
}

fn print_prompt() {
    use std::io::Write;

    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_config(config: &Config, offline: bool) {
    println!("Lingo - AI Language Tutor");
    println!("  Language: {}", config.language);
    println!("  Level: {}", config.level);
    println!("  Mode: {}", config.mode);
    if offline {
        println!("  Oracle: offline");
    } else {
        println!("  Oracle: {}", config.oracle.model);
    }
}

fn print_feedback(feedback: &[FeedbackEvent]) {
    for event in feedback {
        match event {
            FeedbackEvent::Correction {
                message,
                explanation,
            } => println!("  ✗ {message}  ({explanation})"),
            FeedbackEvent::Positive { message } => println!("  ✓ {message}"),
        }
    }
}

fn print_config_change(change: ConfigChange) {
    match change {
        ConfigChange::Applied(greeting) => {
            println!();
            println!("Tutor: {}", greeting.text);
        }
        ConfigChange::Unchanged => println!("(already set)"),
        ConfigChange::Rejected(Rejection::Busy) => println!("(wait for the tutor to finish)"),
        ConfigChange::Rejected(reason) => println!("({reason})"),
    }
}

fn print_week(scheduler: &PracticeScheduler) {
    let today = PracticeScheduler::today();
    for day in Day::ALL {
        let marker = if day == today { " (today)" } else { "" };
        println!();
        println!("{day}{marker}");
        print_day(scheduler, day);
    }
}

fn print_day(scheduler: &PracticeScheduler, day: Day) {
    let schedule = scheduler.day(day);
    let status = if schedule.completed { "done" } else { "open" };
    println!("  {} [{status}]", schedule.activity);
    for (i, task) in schedule.tasks.iter().enumerate() {
        let mark = if scheduler.is_task_checked(day, i) { "x" } else { " " };
        println!("  [{mark}] {}. {task}", i + 1);
    }
}

async fn print_summary(session: &SessionManager) {
    let stats = session.stats().await;
    println!();
    println!("Session summary:");
    println!("  Messages: {}", stats.message_count);
    println!("  Grammar corrections: {}", stats.grammar_correction_count);
    println!("  Duration: {} min", stats.duration_minutes);
}
