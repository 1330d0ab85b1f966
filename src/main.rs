// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use ocrsrt::app_config::{self, Config};
use ocrsrt::app_controller::Controller;

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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for ocrsrt
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// ocrsrt - subtitles from frame captures
///
/// Extracts the text of every frame capture with Google Drive OCR and writes
/// it as an SRT file, optionally proofread by Gemini.
#[derive(Parser, Debug)]
#[command(name = "ocrsrt")]
#[command(version)]
#[command(about = "Build SRT subtitles from time-coded frame captures")]
#[command(long_about = "ocrsrt runs OCR on frame captures named <start>__<end>.<ext> \
(e.g. 00_00_01_000__00_00_03_500.png) and assembles the texts into an SRT file.

EXAMPLES:
    ocrsrt                                  # OCR RGBImages/ into TXTImages/, write subtitle.srt
    ocrsrt --use-gemini                     # Also proofread the texts with Gemini
    ocrsrt --skip-extraction -o movie.srt   # Rebuild the SRT from existing text files
    ocrsrt completions bash > ocrsrt.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. GEMINI_API_KEY is used when no key is configured.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable text correction with Gemini
    #[arg(long)]
    use_gemini: bool,

    /// Directory with the frame captures
    #[arg(short, long)]
    images_dir: Option<String>,

    /// Directory for the extracted text files
    #[arg(short, long)]
    texts_dir: Option<String>,

    /// SRT file to write
    #[arg(short, long)]
    output: Option<String>,

    /// Maximum number of concurrent OCR requests
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Only build the SRT from the existing text files
    #[arg(long)]
    skip_extraction: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Crates whose records are only shown from this level up
const QUIET_TARGETS: [(&str, Level); 3] = [
    ("hyper", Level::Warn),
    ("reqwest", Level::Warn),
    ("rustls", Level::Warn),
];

// @struct: Colored stderr logger
struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    // @initializes: Global logger; the effective level is set afterwards with set_max_level
    fn install(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(StderrLogger { level }))?;
        log::set_max_level(level);
        Ok(())
    }

    fn style(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "❌"),
            Level::Warn => ("\x1B[1;33m", "🚧"),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "🔍"),
            Level::Trace => ("\x1B[1;35m", "📋"),
        }
    }

    fn is_quiet(metadata: &Metadata) -> bool {
        QUIET_TARGETS.iter().any(|(prefix, min_level)| {
            metadata.target().starts_with(prefix) && metadata.level() > *min_level
        })
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && !Self::is_quiet(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let (color, symbol) = Self::style(record.level());
        let mut stderr = std::io::stderr().lock();

        if record.level() >= Level::Debug {
            let _ = writeln!(stderr, "{}{} {} [{}] {}\x1B[0m", color, now, symbol, record.target(), record.args());
        } else {
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, symbol, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    StderrLogger::install(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "ocrsrt", &mut std::io::stdout());
        return Ok(());
    }

    run(cli).await
}

async fn run(options: CommandLineOptions) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    // Override config with CLI options if provided
    if options.use_gemini {
        config.correction.enabled = true;
    }
    if let Some(images_dir) = &options.images_dir {
        config.images_dir = images_dir.clone();
    }
    if let Some(texts_dir) = &options.texts_dir {
        config.texts_dir = texts_dir.clone();
    }
    if let Some(output) = &options.output {
        config.output_file = output.clone();
    }
    if let Some(concurrency) = options.concurrency {
        config.extraction.concurrent_requests = concurrency;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    info!("ocrsrt version {}", env!("CARGO_PKG_VERSION"));
    let controller = Controller::with_config(config)?;

    if options.skip_extraction {
        let corrector = controller.build_corrector();
        controller.run_assembly_only(corrector).await?;
    } else {
        controller.run().await?;
    }

    info!("===== DONE =====");
    Ok(())
}
