//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use webcard_core::{
    FieldFormat, Orchestrator, OrchestratorState, ProgressReporter, Resolver, ecash_view,
    field_view, send_access_request,
};
use webcard_shared::{
    AppConfig, Domain, FieldSpec, Resolution, ResolutionOutcome, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// webcard — resolve a domain into its decentralized identity profile.
#[derive(Parser)]
#[command(
    name = "webcard",
    version,
    about = "Resolve a domain's _adp record into a reconciled identity profile.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.webcard/webcard.toml).
    #[arg(long, global = true, env = "WEBCARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// DNS-over-HTTPS JSON endpoint, overriding the config file.
    #[arg(long, global = true, env = "WEBCARD_DOH")]
    pub doh: Option<String>,

    /// IPFS gateway base URL, overriding the config file.
    #[arg(long, global = true, env = "WEBCARD_GATEWAY")]
    pub gateway: Option<String>,

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

/// Single-field output format.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Json,
    Turtle,
}

impl From<OutputFormat> for FieldFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => FieldFormat::Json,
            OutputFormat::Turtle => FieldFormat::Turtle,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve a domain and print its profile.
    Lookup {
        /// Domain to resolve, e.g. `example.com`.
        domain: String,

        /// Print only this property, as `prefix:property` (e.g. `schema:description`).
        #[arg(long, conflicts_with_all = ["ecash", "raw"])]
        field: Option<String>,

        /// Output format for `--field`.
        #[arg(long, value_enum, default_value = "json", requires = "field")]
        format: OutputFormat,

        /// Print only the eCash address as JSON.
        #[arg(long, conflicts_with = "raw")]
        ecash: bool,

        /// Print the primary document exactly as fetched.
        #[arg(long)]
        raw: bool,

        /// Print the full resolution as JSON.
        #[arg(long, conflicts_with_all = ["field", "ecash", "raw"])]
        json: bool,
    },

    /// Ask the domain's WebID owner for read access via their inbox.
    Notify {
        /// Domain whose WebID profile receives the request.
        domain: String,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "webcard=info",
        1 => "webcard=debug",
        _ => "webcard=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    // Writing defaults must not depend on the current file being valid.
    if matches!(
        cli.command,
        Command::Config {
            action: ConfigAction::Init
        }
    ) {
        return cmd_config_init().await;
    }

    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Lookup {
            domain,
            field,
            format,
            ecash,
            raw,
            json,
        } => {
            let view = if let Some(field) = field {
                View::Field(field.parse()?, format.into())
            } else if ecash {
                View::Ecash
            } else if raw {
                View::Raw
            } else if json {
                View::Json
            } else {
                View::Summary
            };
            cmd_lookup(&config, &domain, view).await
        }
        Command::Notify { domain } => cmd_notify(&config, &domain).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// File (or defaults), then CLI overrides, then validation.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(doh) = &cli.doh {
        config.resolver.doh_endpoint = doh.clone();
    }
    if let Some(gateway) = &cli.gateway {
        config.resolver.ipfs_gateway = gateway.clone();
    }
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// What `lookup` prints on success.
enum View {
    Summary,
    Json,
    Raw,
    Ecash,
    Field(FieldSpec, FieldFormat),
}

async fn cmd_lookup(config: &AppConfig, domain: &str, view: View) -> Result<()> {
    let domain = Domain::parse(domain)?;
    let field = match &view {
        View::Field(spec, _) => Some(spec.clone()),
        _ => None,
    };

    info!(%domain, field = ?field, "looking up profile");

    let resolution = resolve(config, domain, field).await?;

    match view {
        View::Summary => print_summary(&resolution),
        View::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
        View::Raw => print!("{}", resolution.profile.raw_document),
        View::Ecash => println!("{}", ecash_view(&resolution.profile)),
        View::Field(spec, format) => println!("{}", field_view(&spec, &resolution.profile, format)),
    }

    Ok(())
}

async fn cmd_notify(config: &AppConfig, domain: &str) -> Result<()> {
    let domain = Domain::parse(domain)?;
    let resolver = Resolver::new(config)?;
    let progress = CliProgress::new();

    let result = resolver
        .resolve_with_progress(&domain, None, &progress)
        .await;
    progress.finish();
    let resolution = result?;

    let inbox = resolution
        .secondary
        .as_ref()
        .and_then(|s| s.inbox.clone())
        .unwrap_or_default();
    let status = send_access_request(resolver.fetcher(), &config.notify.agent, &resolution).await?;

    println!("Access request sent to {inbox} (HTTP {status}).");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

/// Run one resolution through the orchestrator and wait for its outcome.
async fn resolve(config: &AppConfig, domain: Domain, field: Option<FieldSpec>) -> Result<Resolution> {
    let progress = Arc::new(CliProgress::new());
    let orchestrator = Orchestrator::with_progress(Resolver::new(config)?, progress.clone());

    orchestrator.request(domain, field);
    let state = orchestrator.wait().await;
    progress.finish();

    match state {
        OrchestratorState::Active {
            outcome: ResolutionOutcome::Found(resolution),
            ..
        } => Ok(*resolution),
        OrchestratorState::Active {
            outcome: ResolutionOutcome::Failed { kind, message },
            domain,
            ..
        } => Err(eyre!("could not resolve {domain} ({kind}): {message}")),
        other => Err(eyre!("resolution ended without an outcome: {other:?}")),
    }
}

fn print_summary(resolution: &Resolution) {
    let profile = &resolution.profile;

    println!();
    println!("  {}", profile.name);
    println!("  Domain:  {}", resolution.domain);
    println!("  CID:     {}", resolution.pointer.cid);
    println!("  Source:  {}", resolution.pointer.resolved_uri);
    if let Some(image) = &profile.image {
        println!("  Image:   {image}");
    }
    println!();

    let width = resolution
        .merged
        .fields
        .iter()
        .map(|f| f.field_name.len())
        .max()
        .unwrap_or(0);

    for field in &resolution.merged.fields {
        let primary = field.primary_value.as_deref().unwrap_or("-");
        let marker = if field.has_conflict { "  ≠" } else { "" };
        match field.secondary_value.as_deref() {
            Some(secondary) if secondary != primary => println!(
                "  {:<width$}  {primary}  |  {secondary}{marker}",
                field.field_name
            ),
            _ => println!("  {:<width$}  {primary}", field.field_name),
        }
    }

    let pages: Vec<_> = profile
        .social_links
        .iter()
        .filter(|l| l.is_generic_page())
        .collect();
    if !pages.is_empty() {
        println!();
        for page in pages {
            println!("  {:<width$}  {}", page.service_name, page.url);
        }
    }

    if let Some(error) = &resolution.secondary_error {
        println!();
        println!("  WebID profile unavailable: {error}");
    }

    let conflicts = resolution.merged.conflicts().count();
    if conflicts > 0 {
        println!();
        println!("  {conflicts} field(s) differ between the profile and its WebID.");
    }
    println!();
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

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _resolution: &Resolution) {
        self.spinner.finish_and_clear();
    }
}
