use advisory_index::{
    config::{Config, SourceKind},
    index::AdvisoryIndex,
    logging::init_logging,
    mcp::McpServer,
    model::{ListParams, SearchParams},
    output::{print_advisories, print_advisory, print_stats, OutputFormat},
    server,
    source::{self, AdvisorySource},
};
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Exit codes for scripting
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const NOT_FOUND: u8 = 2;
}

#[derive(Parser)]
#[command(name = "advisory-index")]
#[command(
    author,
    version,
    about = "Index and query GitHub-reviewed security advisories from a local OSV database"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the advisory-database clone (overrides config)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API and MCP over HTTP
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve MCP over stdio
    Mcp,

    /// List advisories
    List {
        #[command(flatten)]
        filters: ListArgs,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show a single advisory
    Get {
        /// GHSA identifier
        ghsa_id: String,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Search advisory ids, CVEs, summaries and descriptions
    Search {
        /// Text to search for
        query: String,

        /// Filter by ecosystem (npm, pip, maven, rust, go, ...)
        #[arg(short, long)]
        ecosystem: Option<String>,

        /// Filter by severity (low, medium, high, critical, unknown)
        #[arg(short, long)]
        severity: Option<String>,

        /// Maximum number of results (1-100)
        #[arg(long)]
        per_page: Option<usize>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Build the local index and show statistics
    Stats {
        /// Discard any cached build first
        #[arg(long)]
        refresh: bool,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Exact GHSA identifier
    #[arg(long)]
    ghsa_id: Option<String>,

    /// Exact CVE identifier
    #[arg(long)]
    cve_id: Option<String>,

    /// Filter by ecosystem (npm, pip, maven, rust, go, ...)
    #[arg(short, long)]
    ecosystem: Option<String>,

    /// Filter by severity (low, medium, high, critical, unknown)
    #[arg(short, long)]
    severity: Option<String>,

    /// Comma-separated CWE ids
    #[arg(long)]
    cwes: Option<String>,

    /// Only withdrawn (true) or only active (false) advisories
    #[arg(long)]
    is_withdrawn: Option<bool>,

    /// Substring of an affected package name
    #[arg(long)]
    affects: Option<String>,

    /// Published date or range: YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD
    #[arg(long)]
    published: Option<String>,

    /// Updated date or range: YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD
    #[arg(long)]
    updated: Option<String>,

    /// Sort field (published, updated)
    #[arg(long)]
    sort: Option<String>,

    /// Sort direction (asc, desc)
    #[arg(long)]
    direction: Option<String>,

    /// Results per page (1-100)
    #[arg(long)]
    per_page: Option<usize>,

    /// Page number, starting at 1
    #[arg(long)]
    page: Option<usize>,
}

impl From<ListArgs> for ListParams {
    fn from(args: ListArgs) -> Self {
        ListParams {
            ghsa_id: args.ghsa_id,
            cve_id: args.cve_id,
            ecosystem: args.ecosystem,
            severity: args.severity,
            cwes: args.cwes,
            is_withdrawn: args.is_withdrawn,
            affects: args.affects,
            published: args.published,
            updated: args.updated,
            per_page: args.per_page,
            page: args.page,
            sort: args.sort,
            direction: args.direction,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring unreadable config file: {}", e);
            Config::default()
        }
    };
    if let Some(path) = cli.db_path {
        config.database_path = path;
    }

    match cli.command {
        Commands::Serve { bind, port } => {
            let bind = bind.unwrap_or_else(|| config.bind_address.clone());
            let port = port.unwrap_or(config.port);
            server::serve(source::from_config(&config), &bind, port).await?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Mcp => {
            McpServer::new(source::from_config(&config))
                .run_stdio()
                .await?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::List { filters, format } => {
            let format = parse_format(format, &config)?;
            let options = ListParams::from(filters).validate()?;
            let source = source::from_config(&config);

            let progress = spinner(format, source.as_ref())?;
            let advisories = source.list_advisories(&options).await;
            finish(progress);

            print_advisories(&advisories?, format)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Get { ghsa_id, format } => {
            let format = parse_format(format, &config)?;
            let source = source::from_config(&config);

            let progress = spinner(format, source.as_ref())?;
            let advisory = source.get_advisory(ghsa_id.trim()).await;
            finish(progress);

            match advisory? {
                Some(advisory) => {
                    print_advisory(&advisory, format)?;
                    Ok(exit_codes::SUCCESS)
                }
                None => {
                    eprintln!("Advisory {} not found", ghsa_id);
                    Ok(exit_codes::NOT_FOUND)
                }
            }
        }
        Commands::Search {
            query,
            ecosystem,
            severity,
            per_page,
            format,
        } => {
            let format = parse_format(format, &config)?;
            let params = SearchParams {
                query: Some(query),
                ecosystem,
                severity,
                per_page,
            };
            let (query, options) = params.validate()?;
            let source = source::from_config(&config);

            let progress = spinner(format, source.as_ref())?;
            let advisories = source.search_advisories(&query, &options).await;
            finish(progress);

            print_advisories(&advisories?, format)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Stats { refresh, format } => {
            let format = parse_format(format, &config)?;
            if config.source != SourceKind::Local {
                bail!("stats is only available for the local source");
            }

            let index = AdvisoryIndex::new(config.advisories_root());
            let progress = if format == OutputFormat::Table {
                Some(new_spinner("Indexing advisories...")?)
            } else {
                None
            };
            let stats = if refresh {
                index.rebuild().await
            } else {
                index.stats().await
            };
            finish(progress);

            print_stats(&stats, format)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn parse_format(format: Option<String>, config: &Config) -> Result<OutputFormat> {
    let format = format.unwrap_or_else(|| config.default_format.clone());
    OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))
}

/// A spinner for the first query against the local index, which pays for
/// the tree walk. Remote sources and JSON output get none.
fn spinner(format: OutputFormat, source: &dyn AdvisorySource) -> Result<Option<ProgressBar>> {
    if format != OutputFormat::Table || source.kind() != "local" {
        return Ok(None);
    }
    Ok(Some(new_spinner("Indexing advisories...")?))
}

fn new_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn finish(progress: Option<ProgressBar>) {
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'advisory-index config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
