// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use subcue::app_config::{self, Config};
use subcue::cue::{Track, format_timestamp};
use subcue::dispatcher::{HttpFetcher, SubtitleParserDispatcher};
use subcue::orchestrator::ProviderOrchestrator;
use subcue::providers::SearchRequest;
use subcue::synchronizer::active_cues;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a subtitle file or URL and print its cues
    Parse {
        /// Local path or http(s) URL
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Format hint: extension or MIME type
        #[arg(short, long)]
        format: Option<String>,

        /// Character encoding of the source
        #[arg(short, long)]
        encoding: Option<String>,

        /// Only print a summary line
        #[arg(long)]
        summary: bool,
    },

    /// Print the cues visible at a playback position
    Cues {
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Position as milliseconds or HH:MM:SS.mmm
        #[arg(long, value_parser = parse_position)]
        at: u64,

        /// Offset in milliseconds; positive values delay subtitles
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,

        #[arg(short, long)]
        format: Option<String>,
    },

    /// Search the configured providers
    Search {
        /// Movie or show title
        #[arg(short, long)]
        title: String,

        /// Language codes, repeat or separate with commas
        #[arg(short, long = "language", value_delimiter = ',', required = true)]
        languages: Vec<String>,

        #[arg(short, long)]
        year: Option<u16>,

        /// Season number; requires --episode
        #[arg(long, requires = "episode")]
        season: Option<u32>,

        #[arg(long, requires = "season")]
        episode: Option<u32>,

        #[arg(long)]
        imdb_id: Option<String>,

        /// Maximum results to print
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe providers and print their health
    TestConnection {
        /// Provider id; all providers when omitted
        provider: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions for subcue
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Subtitle parsing, provider search and cue timing", long_about = None)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, env = "SUBCUE_CONFIG")]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @returns: Milliseconds from `1500` or `00:00:01.500` style input
fn parse_position(value: &str) -> Result<u64, String> {
    if let Ok(ms) = value.parse::<u64>() {
        return Ok(ms);
    }
    let (clock, millis) = match value.split_once(['.', ',']) {
        Some((clock, frac)) => {
            let digits: String = frac.chars().chain("000".chars()).take(3).collect();
            (clock, digits.parse::<u64>().map_err(|_| format!("invalid milliseconds in {}", value))?)
        }
        None => (value, 0),
    };

    let mut seconds = 0u64;
    for part in clock.split(':') {
        let n = part.parse::<u64>().map_err(|_| format!("invalid position: {}", value))?;
        seconds = seconds * 60 + n;
    }
    Ok(seconds * 1000 + millis)
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.or_else(Config::default_path);
    match path {
        Some(path) if path.exists() => {
            debug!("Loading configuration from {}", path.display());
            Config::from_file(&path)
        }
        Some(path) => {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

fn dispatcher_for(config: &Config) -> SubtitleParserDispatcher {
    SubtitleParserDispatcher::new(Arc::new(HttpFetcher::new(Duration::from_secs(30))))
        .with_default_encoding(&config.default_encoding)
}

async fn load_track(config: &Config, source: &str, format: Option<&str>, encoding: Option<&str>) -> Result<Track> {
    dispatcher_for(config)
        .load(source, format, encoding)
        .await
        .into_result()
        .with_context(|| format!("Failed to load subtitles from {}", source))
}

fn print_cues(cues: &[subcue::Cue]) {
    let mut stdout = std::io::stdout().lock();
    for cue in cues {
        let _ = writeln!(
            stdout,
            "{} --> {}  {}",
            format_timestamp(cue.start_ms()),
            format_timestamp(cue.end_ms()),
            cue.text().replace('\n', " | ")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    if let Some(level) = &cli.log_level {
        log::set_max_level(level_filter(level.clone().into()));
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subcue", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::InitConfig { force } = cli.command {
        let path = cli
            .config_path
            .or_else(Config::default_path)
            .ok_or_else(|| anyhow!("No configuration directory available; pass --config-path"))?;
        if path.exists() && !force {
            return Err(anyhow!("{} already exists, use --force to overwrite", path.display()));
        }
        Config::default().save(&path)?;
        info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config_path)?;
    if cli.log_level.is_none() {
        log::set_max_level(level_filter(config.log_level));
    }

    match cli.command {
        Commands::Parse { source, format, encoding, summary } => {
            let track = load_track(&config, &source, format.as_deref(), encoding.as_deref()).await?;
            info!(
                "{}: {} cues, format {}, encoding {}, duration {}",
                source,
                track.len(),
                track.format(),
                track.encoding(),
                format_timestamp(track.duration_ms())
            );
            if !summary {
                print_cues(track.cues());
            }
        }
        Commands::Cues { source, at, offset, format } => {
            let track = load_track(&config, &source, format.as_deref(), None).await?;
            let cues = active_cues(&track, at, offset);
            if cues.is_empty() {
                info!("No cues at {}", format_timestamp(at));
            }
            print_cues(&cues);
        }
        Commands::Search { title, languages, year, season, episode, imdb_id, limit, json } => {
            if config.providers.is_empty() {
                warn!("No providers configured; add some to the configuration file");
            }
            let mut request = match (season, episode) {
                (Some(season), Some(episode)) => SearchRequest::episode(title, season, episode, languages),
                _ => SearchRequest::movie(title, languages),
            };
            if let Some(year) = year {
                request = request.with_year(year);
            }
            if let Some(imdb_id) = imdb_id {
                request = request.with_imdb_id(imdb_id);
            }

            let orchestrator = ProviderOrchestrator::from_config(&config);
            let results = orchestrator.search(&request).await?;
            let shown = &results[..results.len().min(limit)];
            if json {
                println!("{}", serde_json::to_string_pretty(shown)?);
            } else {
                for result in shown {
                    println!(
                        "{:<12} {:<4} {:>5.2} {:<12?} {}",
                        result.provider, result.language, result.match_score, result.match_type, result.file_name
                    );
                }
                info!("{} results ({} shown)", results.len(), shown.len());
            }
        }
        Commands::TestConnection { provider } => {
            let orchestrator = ProviderOrchestrator::from_config(&config);
            let ids = match provider {
                Some(id) => vec![id],
                None => orchestrator.provider_ids(),
            };
            if ids.is_empty() {
                warn!("No providers configured");
            }
            for id in ids {
                let ok = orchestrator.test_connection(&id).await;
                println!("{:<16} {}", id, if ok { "ok" } else { "unreachable" });
            }
        }
        Commands::InitConfig { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}
