use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use automudo_core::{
    load_config, validate_config, Compression, Config, Resolution, Resolver, SanitizedConfig,
    SelectionConfig, TorrentRecord,
};

/// Find music releases on Discogs and fetch their torrents.
#[derive(Debug, Parser)]
#[command(name = "automudo", version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "AUTOMUDO_CONFIG", default_value = "automudo.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve descriptions to torrents and save the .torrent files
    Resolve(ResolveArgs),
    /// Print the effective configuration with secrets redacted
    Config,
}

#[derive(Debug, clap::Args)]
struct ResolveArgs {
    /// Release descriptions, e.g. "Radiohead - OK Computer (Full Album)"
    descriptions: Vec<String>,

    /// Read descriptions from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Look for discography torrents
    #[arg(long)]
    discography: bool,

    /// Accept high-resolution, surround and vinyl-rip releases
    #[arg(long)]
    allow_fancy: bool,

    /// Accept remastered releases
    #[arg(long)]
    allow_remaster: bool,

    /// Only accept categories holding this compression type
    #[arg(long, value_enum)]
    compression: Option<CompressionArg>,

    /// Directory the .torrent files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Resolve only, do not download
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    Lossy,
    Lossless,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Lossy => Compression::Lossy,
            CompressionArg::Lossless => Compression::Lossless,
        }
    }
}

impl ResolveArgs {
    /// Flags only ever widen the configured selection.
    fn apply(&self, selection: &SelectionConfig) -> SelectionConfig {
        let mut selection = selection.clone();
        selection.discography |= self.discography;
        selection.allow_fancy |= self.allow_fancy;
        selection.allow_remaster |= self.allow_remaster;
        if let Some(compression) = self.compression {
            selection.compression = Some(compression.into());
        }
        selection
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command {
        Command::Config => print_config(&config),
        Command::Resolve(args) => resolve(&config, args).await,
    }
}

fn print_config(config: &Config) -> Result<()> {
    let sanitized = SanitizedConfig::from(config);
    let json = serde_json::to_string_pretty(&sanitized).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

async fn resolve(config: &Config, args: ResolveArgs) -> Result<()> {
    let mut descriptions = args.descriptions.clone();
    if let Some(file) = &args.file {
        descriptions.extend(read_descriptions(file)?);
    }
    if descriptions.is_empty() {
        anyhow::bail!("No descriptions given");
    }

    let mut resolver = Resolver::from_config(config).context("Failed to create clients")?;
    resolver.set_selection(args.apply(&config.selection));

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.torrents_dir.clone());
    if !args.dry_run {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {:?}", output_dir))?;
    }

    let mut saved = 0;
    for description in &descriptions {
        let resolution = match resolver.resolve(description).await {
            Ok(resolution) => resolution,
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("Stopped at {:?}", description));
            }
            Err(e) => {
                warn!(description = %description, error = %e, "Skipping description");
                continue;
            }
        };

        match resolution {
            Resolution::NoAlbumMatch => println!("{}: no album match", description),
            Resolution::NoTorrent { album, candidates } => println!(
                "{}: {} - {}: no suitable torrent ({} found)",
                description,
                album.candidate.primary_name,
                album.candidate.secondary_name,
                candidates
            ),
            Resolution::Found { album, torrent } => {
                let name = torrent_file_name(
                    &album.candidate.primary_name,
                    &album.candidate.secondary_name,
                    &torrent,
                );
                if args.dry_run {
                    println!("{}: {} ({})", description, torrent.title, name);
                    continue;
                }

                match resolver.download(&torrent).await {
                    Ok(bytes) => {
                        let path = write_torrent(&output_dir, &name, &bytes)?;
                        println!("{}: saved {}", description, path.display());
                        saved += 1;
                    }
                    Err(e) if e.is_fatal() => {
                        return Err(e).with_context(|| format!("Stopped at {:?}", description));
                    }
                    Err(e) => warn!(description = %description, error = %e, "Download failed"),
                }
            }
        }
    }

    info!(total = descriptions.len(), saved, "Done");
    Ok(())
}

/// Non-empty, trimmed lines of a description file.
fn read_descriptions(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptions from {:?}", path))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// `"<artist> - <title> [<id>].torrent"` with characters that are unsafe in
/// file names replaced by `_`.
fn torrent_file_name(artist: &str, title: &str, torrent: &TorrentRecord) -> String {
    let name = format!("{} - {} [{}].torrent", artist, title, torrent.torrent_id);
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn write_torrent(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
