//! pdf-bot: terminal Q&A over a single PDF, answered by Gemini.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pdf_bot::app::App;
use pdf_bot::config::Config;
use pdf_bot::extractor;
use pdf_bot::gemini::GeminiClient;
use pdf_bot::handler;
use pdf_bot::history::{self, InteractionLog};
use pdf_bot::prompt::Tone;
use pdf_bot::session::{plain_reply, Session};
use pdf_bot::speech::SpeechSynthesizer;
use pdf_bot::tui::{self, EventHandler};
use pdf_bot::ui;

#[derive(Parser, Debug)]
#[command(name = "pdf-bot", about = "Ask questions about a PDF document")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PDF to answer questions about (overrides document.path)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question and exit
    Ask {
        question: String,
        /// formal/professional or friendly/conversational
        #[arg(short, long, default_value = "formal")]
        tone: String,
    },
    /// Print the interaction log
    History,
}

fn init_logging(verbose: bool, trace_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if verbose {
        EnvFilter::new("debug,ort=info,hyper=info,reqwest=info")
    } else {
        EnvFilter::new("info,ort=warn,hyper=warn,reqwest=warn")
    };
    // The TUI owns the terminal, so logs go to a file
    let file = OpenOptions::new().create(true).append(true).open(trace_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let (mut config, config_problem) = Config::load_or_default(args.config.as_deref());
    if let Some(document) = &args.document {
        config.document.path = document.clone();
    }
    init_logging(args.verbose, &config.log.trace_file)?;
    info!("pdf-bot starting");

    match (&config_problem, &config.source) {
        (Some(e), _) => {
            warn!("{e}, using defaults");
            // Shown before the TUI takes the terminal
            eprintln!("⚠️ {e}, using defaults");
        }
        (None, Some(path)) => info!("Loaded config from {}", path.display()),
        (None, None) => info!("No config file found, using defaults"),
    }

    let log = InteractionLog::new(&config.log.history_file);
    if let Some(Command::History) = args.command {
        println!("{}", history::render_table(&log.load_all()?));
        return Ok(());
    }

    let document = match extractor::load_document(&config.document.path) {
        Ok(document) => document,
        Err(e) => {
            error!("Cannot load {}: {e}", config.document.path.display());
            return Err(format!("{}: {e}", config.document.path.display()).into());
        }
    };

    let gemini = GeminiClient::new(config.gemini.clone(), config.gemini.api_key())?;
    let speech = SpeechSynthesizer::new(config.speech.clone());
    let session = Session::new(document, gemini, speech, log);

    match args.command {
        Some(Command::Ask { question, tone }) => {
            let tone: Tone = tone.parse()?;
            ask_once(&session, &question, tone).await
        }
        _ => run_tui(session, &config).await,
    }
}

async fn ask_once(session: &Session, question: &str, tone: Tone) -> Result<(), Box<dyn std::error::Error>> {
    let exchange = session.ask(question, tone).await;
    println!("{}", plain_reply(&exchange.reply_text()));

    if let Ok(Some(path)) = &exchange.effects.audio {
        println!("\n🔊 {}", path.display());
    }
    for notice in exchange.effects.notices() {
        eprintln!("{notice}");
    }

    // One-shot audio is meant to be played afterwards
    if let Ok(Some(path)) = exchange.effects.audio {
        path.keep()?;
    }
    Ok(())
}

async fn run_tui(session: Session, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(session, &config.ui);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(Duration::from_millis(config.ui.tick_ms.max(50)));
    let tx = events.sender();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event, &tx),
                None => break,
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    }
    .await;

    tui::restore()?;

    for path in app.finish() {
        println!("Kept audio: {}", path.display());
    }
    info!("pdf-bot exiting");
    result
}
