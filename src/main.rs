//! # itpl - Issue Template Composer
//!
//! A command-line tool for defining structured issue templates and composing
//! issue descriptions from the values a reporter fills in.
//!
//! ## Key Features
//!
//! - **Structured Templates**: Each template holds ordered section groups, each
//!   holding ordered, typed sections (text field, checkbox, text area, date,
//!   select, instruction)
//! - **Two Markups**: Textile for rich trackers, plain text for everything else,
//!   with an optional value-only mode that drops titles and labels
//! - **Dense Ordering**: Groups and sections always sit at positions `0..N-1`;
//!   inserts, moves and deletes renumber their siblings
//! - **Local File Storage**: One JSON store, written atomically and guarded by a
//!   file lock so concurrent invocations don't lose edits
//! - **Previewer**: A terminal UI that shows the rendered description while you
//!   fill in values
//!
//! ## Quick Start
//!
//! ```bash
//! itpl template create "Crash report" --tracker Bug
//! itpl group add 1 Summary
//! itpl section add 1 field --title Priority
//! itpl section add 1 select --title Browsers --text "Firefox;Chrome"
//! itpl render 1 --set 1=High --set 2=0 --set 2=1
//! itpl ui 1
//! ```
//!
//! The store lives in the platform data directory
//! (`~/.local/share/issue-templates/templates.json` on Linux) unless `--db` or
//! the `store` config key says otherwise.

use std::fs::{File, OpenOptions};
use std::path::Path;

use clap::Parser;
use log::LevelFilter;

pub mod cli;
pub mod cmd;
pub mod compose;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod ordering;
pub mod render;
pub mod template;
pub mod values;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::Config;

/// Open `path` for appending, creating its directory first.
fn open_log_file(path: &Path) -> std::result::Result<File, String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Cannot create log directory {}: {}", parent.display(), e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Cannot open log file {}: {}", path.display(), e))
}

/// Set up env_logger from the `-v` count. RUST_LOG takes precedence.
/// While the TUI owns the terminal, log lines go to `log_file` instead of stderr.
fn init_logging(verbose: u8, log_file: Option<&Path>) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(msg) => {
                eprintln!("{}", msg);
                builder.filter_level(LevelFilter::Off);
            }
        }
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let store_path = cli.db.clone().unwrap_or_else(|| config.store_path());

    let log_file = match cli.command {
        Commands::Ui { .. } => Some(store_path.with_extension("log")),
        _ => None,
    };
    init_logging(cli.verbose, log_file.as_deref());
    log::debug!("Using store {}", store_path.display());

    match cli.command {
        Commands::Ui { template } => cmd_ui(&store_path, template, config.render_options()),

        Commands::Template { action } => cmd_template(&store_path, action),

        Commands::Group { action } => cmd_group(&store_path, action),

        Commands::Section { action } => cmd_section(&store_path, action),

        Commands::Render { template, values, set, plain, value_only } =>
            cmd_render(&store_path, config.render_options(), template, values, set, plain, value_only),

        Commands::Check => cmd_check(&store_path),

        Commands::Config { init } => cmd_config(cli.config.as_deref(), &config, init),

        Commands::Completions { shell } => cmd_completions(shell),
    }
}
