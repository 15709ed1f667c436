//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rfcpub_convert::ProcessConverter;
use rfcpub_core::pipeline::{
    BatchReport, BuildOptions, FileOutcome, ProgressReporter, Project, SilentProgress,
};
use rfcpub_core::scaffold::NewDraft;
use rfcpub_core::status::DraftState;
use rfcpub_core::sync::SyncOptions;
use rfcpub_shared::{
    AppConfig, ConverterRuntime, RfcPubError, init_config, load_config, load_config_from,
};
use serde::Serialize;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rfcpub: publish RFC drafts as wiki pages.
#[derive(Parser)]
#[command(
    name = "rfcpub",
    version,
    about = "Convert RFC markdown drafts into wiki-ready pages and keep them committed.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Corpus root containing the drafts and published directories.
    #[arg(long, default_value = ".", global = true, env = "RFCPUB_ROOT")]
    pub root: PathBuf,

    /// Config file (defaults to <root>/rfcpub.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Convert every draft into the published directory.
    Build {
        /// Skip drafts whose output is newer than the draft.
        #[arg(long)]
        incremental: bool,

        /// Delete published files whose draft no longer exists.
        #[arg(long)]
        prune: bool,

        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Convert a single draft.
    Convert {
        /// Draft file to convert.
        draft: PathBuf,

        /// Output file (defaults to the draft's slot in the published directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which drafts are missing, stale, or current, and any orphans.
    Status {
        /// Print the status report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete published files whose draft no longer exists.
    Prune {
        /// List what would be removed without removing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Rebuild, then commit and push changed output (for CI).
    Sync {
        /// Commit but do not push.
        #[arg(long)]
        no_push: bool,

        /// Override the configured commit message.
        #[arg(short, long)]
        message: Option<String>,

        /// Delete orphaned outputs as part of the commit.
        #[arg(long)]
        prune: bool,
    },

    /// Create a new draft from the RFC outline.
    New {
        /// Draft slug, e.g. `pipe-operator`.
        slug: String,

        /// Title (defaults to the slug in title case).
        #[arg(long)]
        title: Option<String>,

        /// Author line.
        #[arg(long)]
        author: Option<String>,
    },

    /// Check that the configured converter can be run.
    Check,

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
    /// Write rfcpub.toml with defaults into the root.
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
        0 => "rfcpub=info",
        1 => "rfcpub=debug",
        _ => "rfcpub=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let root = cli.root;
    let config_path = cli.config;
    let project = || open_project(&root, config_path.as_deref());

    match cli.command {
        Command::Build {
            incremental,
            prune,
            json,
        } => cmd_build(&project()?, incremental, prune, json).await,
        Command::Convert { draft, output } => {
            cmd_convert(&project()?, &draft, output.as_deref()).await
        }
        Command::Status { json } => cmd_status(&project()?, json),
        Command::Prune { dry_run } => cmd_prune(&project()?, dry_run),
        Command::Sync {
            no_push,
            message,
            prune,
        } => cmd_sync(&project()?, no_push, message, prune).await,
        Command::New {
            slug,
            title,
            author,
        } => cmd_new(&project()?, slug, title, author),
        Command::Check => cmd_check(&project()?).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&root),
            ConfigAction::Show => cmd_config_show(&project()?),
        },
    }
}

/// The converter's or git's own exit status behind `report`, if any, so CI
/// sees the same code the failing tool returned.
pub(crate) fn exit_code(report: &color_eyre::eyre::Report) -> Option<i32> {
    report
        .downcast_ref::<RfcPubError>()
        .and_then(RfcPubError::exit_code)
}

/// Load config for `root` (or the explicit file) into a project.
fn open_project(root: &Path, config_path: Option<&Path>) -> Result<Project> {
    let config: AppConfig = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config(root)?,
    };
    Ok(Project::new(root, config))
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn draft_done(&self, slug: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {slug}"));
    }

    fn done(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clears the spinner on the error path too.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

fn print_json<T: Serialize>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn print_batch_summary(report: &BatchReport) {
    println!();
    println!("  Drafts:    {}", report.files.len());
    println!("  Written:   {}", report.count(FileOutcome::Written));
    println!("  Unchanged: {}", report.count(FileOutcome::Unchanged));
    println!("  Skipped:   {}", report.count(FileOutcome::UpToDate));
    println!("  Pruned:    {}", report.pruned.len());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(project: &Project, incremental: bool, prune: bool, json: bool) -> Result<()> {
    let mut options = BuildOptions::from(&project.config);
    options.incremental |= incremental;
    options.prune |= prune;

    let converter = ProcessConverter::from_config(&project.config.converter);
    info!(
        root = %project.root.display(),
        incremental = options.incremental,
        prune = options.prune,
        "building published output"
    );

    let report = if json {
        rfcpub_core::pipeline::build_all(project, &converter, options, &SilentProgress).await?
    } else {
        let progress = CliProgress::new();
        rfcpub_core::pipeline::build_all(project, &converter, options, &progress).await?
    };

    if json {
        print_json(&report)
    } else {
        print_batch_summary(&report);
        Ok(())
    }
}

async fn cmd_convert(project: &Project, draft: &Path, output: Option<&Path>) -> Result<()> {
    let output = match output {
        Some(p) => p.to_path_buf(),
        None => rfcpub_shared::DraftRef::from_path(draft)?
            .target(&project.published_dir(), &project.config.paths.published_ext)
            .published,
    };

    let converter = ProcessConverter::from_config(&project.config.converter);
    let outcome =
        rfcpub_core::pipeline::convert_file(&converter, project.passes(), draft, &output).await?;

    match outcome {
        FileOutcome::Unchanged => println!("unchanged {}", output.display()),
        _ => println!("wrote {}", output.display()),
    }
    Ok(())
}

fn cmd_status(project: &Project, json: bool) -> Result<()> {
    let report = rfcpub_core::status::status(project)?;

    if json {
        return print_json(&report);
    }

    for d in &report.drafts {
        let label = match d.state {
            DraftState::Missing => "missing",
            DraftState::Stale => "stale",
            DraftState::Current => "current",
        };
        println!("{label:<8}\t{}", d.slug);
    }
    for orphan in &report.orphans {
        println!("{:<8}\t{}", "orphan", orphan.display());
    }
    if report.is_clean() {
        println!("all {} drafts published", report.drafts.len());
    }
    Ok(())
}

fn cmd_prune(project: &Project, dry_run: bool) -> Result<()> {
    let paths = rfcpub_core::status::prune_orphans(project, dry_run)?;
    let verb = if dry_run { "would remove" } else { "removed" };
    for p in &paths {
        println!("{verb} {}", p.display());
    }
    if paths.is_empty() {
        println!("no orphaned outputs");
    }
    Ok(())
}

async fn cmd_sync(
    project: &Project,
    no_push: bool,
    message: Option<String>,
    prune: bool,
) -> Result<()> {
    let mut build = BuildOptions::from(&project.config);
    build.prune |= prune;

    let mut options = SyncOptions::new(build, &project.config.sync);
    if let Some(message) = message {
        options.commit_message = message;
    }
    if no_push {
        options.push = false;
    }

    let converter = ProcessConverter::from_config(&project.config.converter);
    let progress = CliProgress::new();
    let outcome = rfcpub_core::sync::sync(project, &converter, &options, &progress)
        .await
        .wrap_err("sync failed")?;

    print_batch_summary(&outcome.report);
    match (outcome.committed, outcome.pushed) {
        (false, _) => println!("nothing to commit"),
        (true, false) => println!("committed: {}", options.commit_message),
        (true, true) => println!(
            "committed and pushed to {}: {}",
            options.remote, options.commit_message
        ),
    }
    Ok(())
}

fn cmd_new(
    project: &Project,
    slug: String,
    title: Option<String>,
    author: Option<String>,
) -> Result<()> {
    let draft = NewDraft {
        slug,
        title,
        author,
        date: chrono::Local::now().date_naive(),
    };
    let path = rfcpub_core::scaffold::new_draft(project, &draft)?;
    println!("created {}", path.display());
    Ok(())
}

async fn cmd_check(project: &Project) -> Result<()> {
    let config = &project.config.converter;
    let converter = ProcessConverter::from_config(config);

    let version = converter.version().await.wrap_err_with(|| match config.runtime {
        ConverterRuntime::Native => format!(
            "could not run `{}`. Install pandoc: https://pandoc.org/installing.html",
            config.program
        ),
        ConverterRuntime::Docker => format!(
            "could not run image `{}` with `{}`. Is the container engine running?",
            config.image, config.engine
        ),
    })?;

    if version.is_empty() {
        return Err(eyre!("converter printed no version banner"));
    }

    println!("converter: {version}");
    for pass in &config.passes {
        println!("pass:      {pass}");
    }
    Ok(())
}

fn cmd_config_init(root: &Path) -> Result<()> {
    let path = init_config(root)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(project: &Project) -> Result<()> {
    let toml_str = toml::to_string_pretty(&project.config)?;
    println!("{toml_str}");
    Ok(())
}
