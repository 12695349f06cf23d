use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tourguide::config::Config;
use tourguide::dom::{Document, ElementId, MemoryDocument, PageFixture};
use tourguide::logging;
use tourguide::tour::refresh::REFRESH_FRAME_DELAY;
use tourguide::tour::{
    CompletionReason, StepDefinition, StepManifest, TokioFrameClock, TourListener, TourSession,
    TourState, TourStep,
};

#[derive(Parser)]
#[command(name = "tourguide")]
#[command(about = "Headless runner for guided page tours")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved step sequence for a page
    Steps {
        #[command(flatten)]
        source: TourSource,
    },

    /// Walk a tour from the first step to completion
    Walk {
        #[command(flatten)]
        source: TourSource,

        /// Walk back to the start from the last step before finishing
        #[arg(short, long)]
        back: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write it to .tourguide/config.toml
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct TourSource {
    /// Page fixture (JSON)
    #[arg(short, long)]
    page: PathBuf,

    /// Step manifest (JSON); without it steps are read from the page markup
    #[arg(short, long)]
    steps: Option<PathBuf>,

    /// Only collect markup steps from this data-intro-group
    #[arg(short, long)]
    group: Option<String>,

    /// Selector of the element to scan for markup steps
    #[arg(long)]
    root: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let mut config = Config::load(cli.config.as_deref())?;

    let logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Steps { source } => {
            apply_source_overrides(&mut config, &source);
            cmd_steps(&config, &source).await?;
        }
        Commands::Walk { source, back } => {
            apply_source_overrides(&mut config, &source);
            cmd_walk(&config, &source, back).await?;
        }
        Commands::Config { save } => {
            cmd_config(&config, save)?;
        }
    }

    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.metadata().is_ok_and(|metadata| metadata.len() > 0) {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    Ok(())
}

fn apply_source_overrides(config: &mut Config, source: &TourSource) {
    if let Some(ref group) = source.group {
        config.tour.group = Some(group.clone());
    }
    if let Some(ref root) = source.root {
        config.tour.root = Some(root.clone());
    }
}

/// Mount the page and compile the manifest (if any) against it
fn load_tour(source: &TourSource) -> Result<(Arc<MemoryDocument>, Vec<StepDefinition>)> {
    let fixture = PageFixture::load(&source.page)?;
    let memory = Arc::new(MemoryDocument::from_fixture(&fixture));
    let document: Arc<dyn Document> = memory.clone();

    let definitions = match source.steps {
        Some(ref path) => StepManifest::load(path)?.into_definitions(&document),
        None => Vec::new(),
    };
    tracing::debug!(
        page = %source.page.display(),
        definitions = definitions.len(),
        "Loaded tour source"
    );

    Ok((memory, definitions))
}

fn new_session(config: &Config, memory: &Arc<MemoryDocument>) -> TourSession {
    let frames = Arc::new(TokioFrameClock::new(config.frames.interval()));
    TourSession::new(config.tour.clone(), memory.clone(), frames)
}

async fn cmd_steps(config: &Config, source: &TourSource) -> Result<()> {
    let (memory, definitions) = load_tour(source)?;
    let steps = tourguide::tour::fetch_steps(&config.tour, memory.as_ref(), &definitions)
        .context("Failed to resolve tour steps")?;

    if steps.is_empty() {
        println!("No tour steps found in {}", source.page.display());
        return Ok(());
    }

    println!("Tour ({} steps)", steps.len());
    println!("{}", "─".repeat(60));
    for step in &steps {
        println!("{}", step_line(step, steps.len(), &memory));
        if !step.intro.is_empty() {
            println!("    {}", step.intro);
        }
        if step.skip_if.is_some() {
            println!("    (conditional)");
        }
    }

    Ok(())
}

async fn cmd_walk(config: &Config, source: &TourSource, back: bool) -> Result<()> {
    let (memory, definitions) = load_tour(source)?;
    let mut session = new_session(config, &memory).with_listener(Arc::new(ConsoleListener));
    let mut refresh = session.refresh_signal().subscribe();
    // Long enough for the deferred refresh to land
    let settle = config.frames.interval() * (REFRESH_FRAME_DELAY as u32 + 2);

    if !session.start(&definitions).await? {
        if session.state() == TourState::Idle {
            println!("No tour steps found in {}", source.page.display());
        }
        return Ok(());
    }

    let mut rewound = !back;
    while session.is_active() {
        show_current(&session, &memory, &mut refresh, settle).await;

        if !rewound && session.is_last_step() {
            rewound = true;
            while session.previous_step().await? {
                show_current(&session, &memory, &mut refresh, settle).await;
            }
        }

        session.next_step().await?;
    }

    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
    print!("{rendered}");

    if save {
        config.save()?;
        println!();
        println!("Saved to {}", Config::project_config_path().display());
    }

    Ok(())
}

async fn show_current(
    session: &TourSession,
    memory: &MemoryDocument,
    refresh: &mut watch::Receiver<u64>,
    settle: Duration,
) {
    let Some(step) = session.current() else {
        return;
    };
    // A timeout just means layout has not caught up yet; the counter is still printed
    let _ = tokio::time::timeout(settle, refresh.changed()).await;
    let counter = *refresh.borrow_and_update();

    println!("{}  [refresh {counter}]", step_line(step, session.steps().len(), memory));
    if !step.intro.is_empty() {
        println!("    {}", step.intro);
    }
}

fn step_line(step: &TourStep, total: usize, memory: &MemoryDocument) -> String {
    let anchor = match step.element {
        _ if step.is_floating() => "(floating)".to_string(),
        Some(element) => anchor_label(element, memory),
        None => "-".to_string(),
    };
    let title = if step.title.is_empty() {
        "(untitled)"
    } else {
        step.title.as_str()
    };
    format!(
        "[{}/{}] {} @ {} ({})",
        step.step, total, title, anchor, step.position
    )
}

fn anchor_label(element: ElementId, memory: &MemoryDocument) -> String {
    memory
        .describe(element)
        .split('.')
        .next()
        .map(str::to_string)
        .unwrap_or_default()
}

struct ConsoleListener;

#[async_trait]
impl TourListener for ConsoleListener {
    async fn on_complete(&self, final_index: usize, reason: CompletionReason) -> Result<()> {
        println!("Tour complete after step {} ({reason})", final_index + 1);
        Ok(())
    }

    async fn on_exit(&self) -> Result<()> {
        tracing::debug!("Tour torn down");
        Ok(())
    }
}
