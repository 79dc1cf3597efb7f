//! tocscan - EPUB table-of-contents diagnostics

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tocscan::batch::{self, FileReport};
use tocscan::config::{CliState, default_state_path};
use tocscan::{CopyrightLocator, KeywordScorer, check_copyright, check_single_chapter};

#[derive(Parser)]
#[command(name = "tocscan")]
#[command(version, about = "Diagnose EPUB tables of contents", long_about = None)]
#[command(after_help = "EXAMPLES:
    tocscan copyright ~/books              Copyright pages linked from a TOC
    tocscan single-chapter --debug books/  Degenerate or missing TOCs
    tocscan all --json -j 8 books/         Both checks, JSON, 8 threads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report whether the copyright page is linked from the NCX or a contents page
    Copyright(RunArgs),
    /// Flag EPUBs whose TOC is missing, empty, or points at a single file
    SingleChapter(RunArgs),
    /// Run both checks
    All(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Folder searched recursively for .epub files (prompted for if omitted)
    #[arg(value_name = "FOLDER")]
    folder: Option<String>,

    /// Print per-file TOC statistics and enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit one JSON object per file instead of text lines
    #[arg(long)]
    json: bool,

    /// Number of files analyzed in parallel
    #[arg(short, long, default_value_t = 1, value_name = "N")]
    jobs: usize,

    /// Where the last-used folder is remembered
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Never prompt; fall back to the last-used folder
    #[arg(long)]
    no_prompt: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Checks {
    Copyright,
    SingleChapter,
    All,
}

impl Checks {
    fn copyright(self) -> bool {
        matches!(self, Checks::Copyright | Checks::All)
    }

    fn single_chapter(self) -> bool {
        matches!(self, Checks::SingleChapter | Checks::All)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (checks, args) = match cli.command {
        Command::Copyright(args) => (Checks::Copyright, args),
        Command::SingleChapter(args) => (Checks::SingleChapter, args),
        Command::All(args) => (Checks::All, args),
    };
    init_tracing(args.debug);

    match run(checks, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "warn,tocscan=debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_filter(env_filter),
        )
        .init();
}

fn run(checks: Checks, args: &RunArgs) -> Result<()> {
    let state_path = args.state_file.clone().unwrap_or_else(default_state_path);
    let mut state = CliState::load(&state_path);
    let folder = match &args.folder {
        Some(folder) => folder.clone(),
        None if args.no_prompt => state.choose_folder(""),
        None => prompt_folder(&state)?,
    };
    state.last_folder = Some(folder.clone());
    state.save(&state_path);

    let mut out = io::stdout().lock();
    if checks.single_chapter() && !args.json {
        writeln!(out, "{}", batch::SINGLE_CHAPTER_HEADER)?;
    }

    let root = expand_home(&folder);
    let root = root.canonicalize().unwrap_or(root);
    let paths = batch::discover_epubs(&root)?;
    if paths.is_empty() {
        writeln!(out, "{}", batch::NO_EPUBS_FOUND)?;
        return Ok(());
    }
    info!(files = paths.len(), jobs = args.jobs, "starting analysis");

    if checks.copyright() {
        let locator = CopyrightLocator::default();
        let reports = batch::run(&paths, args.jobs, |path| {
            check_copyright(path, &KeywordScorer, &locator)
        });
        let lines = if args.json {
            batch::render_json(&reports)?
        } else {
            batch::render_copyright(&reports)
        };
        write_lines(&mut out, &lines)?;
    }

    if checks.single_chapter() {
        let reports: Vec<FileReport<_>> = batch::run(&paths, args.jobs, check_single_chapter);
        let lines = if args.json {
            batch::render_json(&reports)?
        } else {
            batch::render_single_chapter(&reports, args.debug)?
        };
        write_lines(&mut out, &lines)?;
    }

    info!(files = paths.len(), "analysis finished");
    Ok(())
}

fn prompt_folder(state: &CliState) -> Result<String> {
    let last = state.last_folder.as_deref().unwrap_or_default();
    let mut stdout = io::stdout().lock();
    write!(stdout, "Input folder ({last}): ")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read folder from stdin")?;
    Ok(state.choose_folder(&answer))
}

fn expand_home(folder: &str) -> PathBuf {
    if let Some(rest) = folder.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return Path::new(&home).join(rest);
    }
    PathBuf::from(folder)
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
