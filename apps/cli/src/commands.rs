//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use narrator_content::Wikipedia;
use narrator_core::pipeline::{Pipeline, ProgressReporter, RunReport, Stage, Timeouts};
use narrator_keywords::WatsonNlu;
use narrator_shared::{AppConfig, Document, api_key, init_config, load_config};
use narrator_storage::{DocumentStore, JsonFileStore};
use narrator_text::RuleBasedBoundary;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Narrator: turn an encyclopedia article into keyword-annotated sentences.
#[derive(Parser)]
#[command(
    name = "narrator",
    version,
    about = "Fetch, clean, split, and keyword-annotate encyclopedia text for narrated video.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Write a new input document for a search term.
    Init {
        /// Term to look up (e.g. "Formula 1").
        #[arg(short, long)]
        term: String,

        /// Maximum number of sentences to keep (defaults to config).
        #[arg(short, long, allow_negative_numbers = true)]
        max_sentences: Option<i64>,

        /// Document path (defaults to config `document_path`).
        #[arg(short, long)]
        document: Option<String>,

        /// Overwrite an existing document.
        #[arg(long)]
        force: bool,
    },

    /// Run the text pipeline on an existing document.
    Run {
        /// Document path (defaults to config `document_path`).
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Print a document as JSON.
    Show {
        /// Document path (defaults to config `document_path`).
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "narrator=info",
        1 => "narrator=debug",
        _ => "narrator=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init {
            term,
            max_sentences,
            document,
            force,
        } => cmd_init(&term, max_sentences, document.as_deref(), force).await,
        Command::Run { document } => cmd_run(document.as_deref()).await,
        Command::Show { document } => cmd_show(document.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Documents are keyed by path relative to the working directory.
fn open_store() -> Result<JsonFileStore> {
    let cwd =
        std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    Ok(JsonFileStore::new(cwd))
}

fn document_key(config: &AppConfig, document: Option<&str>) -> String {
    document
        .map(String::from)
        .unwrap_or_else(|| config.defaults.document_path.clone())
}

async fn cmd_init(
    term: &str,
    max_sentences: Option<i64>,
    document: Option<&str>,
    force: bool,
) -> Result<()> {
    let config = load_config()?;
    let key = document_key(&config, document);
    let store = open_store()?;

    let path = store.path_for(&key);
    if path.exists() && !force {
        return Err(eyre!(
            "document already exists at '{}' (use --force to overwrite)",
            path.display()
        ));
    }

    let term = term.trim();
    if term.is_empty() {
        return Err(eyre!("search term must not be empty"));
    }

    let maximum = max_sentences.unwrap_or(config.defaults.maximum_sentences);
    store.save(&key, &Document::new(term, maximum))?;

    info!(term, maximum, path = %path.display(), "document initialized");
    println!("Document written to: {}", path.display());
    Ok(())
}

async fn cmd_run(document: Option<&str>) -> Result<()> {
    // Resolve credentials before doing anything
    let config = load_config()?;
    let key_value = api_key(&config)?;
    let key = document_key(&config, document);

    let store = open_store()?;
    let content = Wikipedia::new(config.content.endpoint.clone())?;
    let keywords = WatsonNlu::new(&config.keywords, key_value)?;

    let pipeline = Pipeline {
        store: &store,
        content: &content,
        boundary: &RuleBasedBoundary,
        keywords: &keywords,
        timeouts: Timeouts {
            content: config.content.timeout(),
            keywords: config.keywords.timeout(),
        },
    };

    info!(document = %key, "running text pipeline");

    let reporter = CliProgress::new();
    let result = pipeline.run(&key, &reporter).await;
    if result.is_err() {
        reporter.spinner.abandon_with_message("Pipeline failed; document left unchanged");
    }
    let report = result?;

    println!();
    println!("  Document updated!");
    println!("  Run:       {}", report.run_id);
    println!("  Path:      {}", store.path_for(&report.document_key).display());
    println!("  Sentences: {}", report.sentence_count);
    println!("  Keywords:  {}", report.keyword_count);
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_show(document: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let key = document_key(&config, document);
    let doc = open_store()?.load(&key)?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        let message = match stage {
            Stage::FetchContent => "Fetching article text",
            Stage::Sanitize => "Sanitizing content",
            Stage::Segment => "Breaking content into sentences",
            Stage::Limit => "Limiting sentences",
            Stage::Annotate => "Fetching keywords",
        };
        self.spinner.set_message(message);
    }

    fn sentence_annotated(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching keywords [{current}/{total}]"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
