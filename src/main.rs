use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod build;
mod config;
mod engine;
mod merge;
mod outline;
mod passes;

#[derive(Parser)]
#[command(name = "bookgen", version, about = "Typeset a markdown manuscript into a print-ready PDF book")]
struct Cli {
    /// Path to the book config (optional; defaults apply when missing)
    #[arg(long, global = true, default_value = "book.json")]
    config: PathBuf,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the PDF (the default when no command is given)
    Build {
        /// Rebuild whenever the manuscript changes
        #[arg(long)]
        watch: bool,
    },

    /// Print the table of contents extracted from the manuscript
    Toc {
        /// Emit JSON instead of an indented list
        #[arg(long)]
        json: bool,
    },

    /// Write the whole book as a single HTML preview
    Html {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Build { watch: false }) {
        Commands::Build { watch: true } => {
            build::watch_and_rebuild(&config, cli.quiet)?;
        }
        Commands::Build { watch: false } => {
            let report = build::handle_build(&config, cli.quiet)?;
            report.print_summary();
        }
        Commands::Toc { json } => {
            handle_toc(&config, json)?;
        }
        Commands::Html { out } => {
            handle_html(&config, out.as_deref(), cli.quiet)?;
        }
    }

    Ok(())
}

fn render(config: &config::BookConfig) -> Result<book_markup::RenderedBody> {
    let content = std::fs::read_to_string(&config.manuscript).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read manuscript '{}': {}",
            config.manuscript.display(),
            e
        )
    })?;
    let body = book_markup::render_manuscript(&content);
    build::print_diagnostics(&config.manuscript, &body.diagnostics);
    Ok(body)
}

fn handle_toc(config: &config::BookConfig, json: bool) -> Result<()> {
    let body = render(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&body.toc)?);
        return Ok(());
    }

    for entry in &body.toc {
        if entry.kind.is_top_level() {
            println!("{}", entry.display_title().bold());
        } else {
            println!("  {}", entry.display_title());
        }
    }
    Ok(())
}

fn handle_html(config: &config::BookConfig, out: Option<&std::path::Path>, quiet: bool) -> Result<()> {
    let body = render(config)?;
    let html = book_markup::assemble::full_html(&config.book, &body);

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| anyhow::anyhow!("Failed to create '{}': {}", parent.display(), e))?;
            }
            std::fs::write(path, &html)
                .map_err(|e| anyhow::anyhow!("Failed to write '{}': {}", path.display(), e))?;
            if !quiet {
                println!("{} {}", "Wrote".green().bold(), path.display());
            }
        }
        None => print!("{html}"),
    }
    Ok(())
}
