//! Command-line interface for term-autolog.
//!
//! `run` (the default) hands control back to `main` with [`RuntimeOptions`];
//! the other subcommands do their work here and exit.

use crate::boundary::{
    BoundaryState, CommandBoundaryFilter, FilterState, LineClassifier, LineVerdict, buffer_text,
};
use crate::identity::IdentityRegistry;
use crate::menu::MenuEntry;
use crate::session::TerminalSession;
use crate::surface::SurfaceHost;
use crate::surface::memory::MemorySurface;
use crate::surface::tmux::TmuxHost;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use term_autolog_config::{Config, LogLevel};

/// term-autolog - Log completed shell commands from every tmux pane
#[derive(Parser)]
#[command(name = "term-autolog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: ~/.config/term-autolog/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for session logs, overriding the configuration
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Diagnostic log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Write raw logs only; skip the external sanitizer
    #[arg(long, global = true)]
    pub no_sanitize: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor terminals and log commands until interrupted (default)
    Run {
        /// Exit after the specified number of seconds
        #[arg(long, value_name = "SECONDS")]
        exit_after: Option<f64>,
    },
    /// Show the log files each current terminal would write to
    List,
    /// Run a captured transcript through the command boundary filter
    Filter {
        /// Transcript file (stdin when omitted)
        file: Option<PathBuf>,

        /// Print every line with the decision made for it
        #[arg(long)]
        explain: bool,
    },
    /// Print the effective configuration
    Config,
}

/// Runtime options passed from CLI to the application
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    pub config_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    /// Level chosen on the command line, if any
    pub log_level: Option<log::LevelFilter>,
    pub no_sanitize: bool,
    /// Exit after this many seconds
    pub exit_after: Option<f64>,
}

impl RuntimeOptions {
    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Config::load().context("loading default configuration")?,
        };
        if let Some(dir) = &self.log_dir {
            config.log_directory = dir.to_string_lossy().into_owned();
        }
        if self.no_sanitize {
            config.sanitizer.enabled = false;
        }
        Ok(config)
    }
}

/// Result of CLI processing
pub enum CliResult {
    /// Start monitoring with these options
    Continue(RuntimeOptions),
    /// Exit with the given code (subcommand completed)
    Exit(i32),
}

/// Process CLI arguments and handle subcommands
pub fn process_cli() -> CliResult {
    let cli = Cli::parse();

    let mut options = RuntimeOptions {
        config_path: cli.config,
        log_dir: cli.log_dir,
        log_level: cli.log_level.map(LogLevel::to_level_filter),
        no_sanitize: cli.no_sanitize,
        exit_after: None,
    };

    let result = match cli.command {
        None => return CliResult::Continue(options),
        Some(Commands::Run { exit_after }) => {
            options.exit_after = exit_after;
            return CliResult::Continue(options);
        }
        Some(Commands::List) => list_terminals(&options),
        Some(Commands::Filter { file, explain }) => {
            filter_transcript(&options, file.as_deref(), explain)
        }
        Some(Commands::Config) => print_config(&options),
    };

    match result {
        Ok(()) => CliResult::Exit(0),
        Err(e) => {
            eprintln!("term-autolog: error: {e:#}");
            CliResult::Exit(1)
        }
    }
}

fn list_terminals(options: &RuntimeOptions) -> anyhow::Result<()> {
    let config = options.load_config()?;
    let host = TmuxHost::new(&config.tmux_path);
    if let Err(e) = host.version() {
        anyhow::bail!("tmux is not available: {e}");
    }

    let surfaces = host.list_active_surfaces();
    if surfaces.is_empty() {
        println!("No terminals found.");
        return Ok(());
    }

    let identities = IdentityRegistry::new();
    let log_dir = config.logs_dir();
    for surface in surfaces {
        let id = identities.resolve(surface.as_ref());
        let surface_id = surface.surface_id();
        let session = TerminalSession::new(id, surface, &log_dir, 0);
        println!("{}\t{}", surface_id, MenuEntry::for_session(&session));
    }
    Ok(())
}

fn filter_transcript(
    options: &RuntimeOptions,
    file: Option<&Path>,
    explain: bool,
) -> anyhow::Result<()> {
    let config = options.load_config()?;
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let classifier = LineClassifier::new(&config.prompt).context("invalid prompt configuration")?;

    // Both modes read the same rows the live snapshot would
    let surface = MemorySurface::from_transcript("transcript", &text);
    let buffer = buffer_text(&surface)?;

    if explain {
        let mut state = FilterState::Scanning;
        for (line, verdict) in classifier.explain(&buffer, &mut state) {
            match verdict {
                LineVerdict::Keep(_) => println!("keep            | {line}"),
                LineVerdict::Drop(reason) => {
                    println!("{:<15} | {line}", format!("{reason:?}"))
                }
            }
        }
        return Ok(());
    }

    let filter = CommandBoundaryFilter::new(classifier);
    let mut state = BoundaryState::default();
    if let Some(chunk) = filter.snapshot(&surface, &mut state)? {
        print!("{chunk}");
    }
    Ok(())
}

fn print_config(options: &RuntimeOptions) -> anyhow::Result<()> {
    let config = options.load_config()?;
    print!("{}", serde_yaml_ng::to_string(&config)?);
    Ok(())
}
