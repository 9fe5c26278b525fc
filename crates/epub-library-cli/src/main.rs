//! ePub Library CLI - inspect and edit a persisted library file.
//!
//! Containers are never opened here: the tool only reads and writes the
//! identifier-to-locator records, so it works without any ePub parser.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "epub-library")]
#[command(about = "Inspect and edit an ePub library file")]
struct Args {
    /// Library file (defaults to the platform data directory)
    #[arg(short, long, global = true)]
    library: Option<PathBuf>,

    /// Abort on malformed records instead of skipping them
    #[arg(long, global = true)]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered publications
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the container locator of a publication
    Locate { identifier: String },
    /// Print the epub3:// URL of a publication
    Url { identifier: String },
    /// Register publications hosted by a container
    Register {
        locator: String,
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Remove a container and its publications
    Forget { locator: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; stdout is reserved for command output
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let path = match args.library {
        Some(path) => path,
        None => epub_library::platform::default_library_path()?,
    };
    debug!("Library file: {}", path.display());

    let session = commands::Session::open(path, args.strict)?;
    let output = match args.command {
        Command::List { json } => session.list(json)?,
        Command::Locate { identifier } => session.locate(&identifier)?,
        Command::Url { identifier } => session.url(&identifier)?,
        Command::Register {
            locator,
            identifiers,
        } => session.register(&locator, identifiers)?,
        Command::Forget { locator } => session.forget(&locator)?,
    };

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
