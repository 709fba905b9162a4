//! Amana CLI - maintenance commands for the catalogue data files

use amana_core::{Catalogue, IntegrityReport, TOP_RATED_LIMIT};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "amana")]
#[command(about = "Amana Bookstore - catalogue maintenance tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding books.json and reviews.json
    #[arg(short, long, global = true, env = "AMANA_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the data files for inconsistencies
    Validate,

    /// Recompute every book's rating and review count from its reviews
    Recompute {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the highest-scoring books
    Top {
        /// Number of books to show
        #[arg(short, long, default_value_t = TOP_RATED_LIMIT)]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("amana=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Validate => validate_command(&cli.data_dir),
        Commands::Recompute { dry_run } => recompute_command(&cli.data_dir, dry_run),
        Commands::Top { limit, format } => top_command(&cli.data_dir, limit, format),
    }
}

fn open(data_dir: &Path) -> Result<Catalogue> {
    debug!("Opening catalogue in {}", data_dir.display());
    Catalogue::open(data_dir)
        .with_context(|| format!("Failed to load catalogue from {}", data_dir.display()))
}

fn validate_command(data_dir: &Path) -> Result<ExitCode> {
    println!("{} Validating {}...", "→".blue(), data_dir.display());

    let catalogue = open(data_dir)?;
    let report = IntegrityReport::check(&catalogue.snapshot());

    println!("  Books: {}", catalogue.book_count());
    println!("  Reviews: {}", catalogue.review_count());

    if report.is_clean() {
        println!("{} Catalogue is consistent", "✓".green());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} Found {} problem(s):", "✗".red(), report.problem_count());
    for id in &report.duplicate_book_ids {
        println!("  duplicate book id: {}", id);
    }
    for id in &report.duplicate_review_ids {
        println!("  duplicate review id: {}", id);
    }
    for id in &report.orphan_reviews {
        println!("  review {} points at a missing book", id);
    }
    for id in &report.invalid_ratings {
        println!("  review {} has a rating outside 1-5", id);
    }
    for stale in &report.stale_aggregates {
        println!(
            "  book {} has rating {} / {} reviews, expected {} / {}",
            stale.book_id,
            stale.stored_rating,
            stale.stored_review_count,
            stale.expected_rating,
            stale.expected_review_count
        );
    }
    if !report.stale_aggregates.is_empty() {
        println!("{} Run `amana recompute` to fix stale aggregates", "→".blue());
    }

    Ok(ExitCode::FAILURE)
}

fn recompute_command(data_dir: &Path, dry_run: bool) -> Result<ExitCode> {
    let catalogue = open(data_dir)?;

    let changed = if dry_run {
        catalogue.snapshot().recomputed_books().1
    } else {
        catalogue
            .recompute_aggregates()
            .context("Failed to write recomputed books")?
    };

    if changed.is_empty() {
        println!("{} All aggregates are up to date", "✓".green());
        return Ok(ExitCode::SUCCESS);
    }

    let verb = if dry_run { "Would update" } else { "Updated" };
    println!("{} {} {} book(s):", "✓".green(), verb, changed.len());
    for id in &changed {
        println!("  {}", id);
    }

    Ok(ExitCode::SUCCESS)
}

fn top_command(data_dir: &Path, limit: usize, format: Format) -> Result<ExitCode> {
    let catalogue = open(data_dir)?;
    let top = catalogue.snapshot().top_rated(limit);

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&top)?);
        }
        Format::Text => {
            println!("\n{} Top Rated Books", "═".blue().bold());
            for (rank, entry) in top.iter().enumerate() {
                println!(
                    "{} {:>2}. {} by {} (score {}, {} from {} reviews)",
                    "▸".blue(),
                    rank + 1,
                    entry.book.title.bold(),
                    entry.book.author,
                    entry.score,
                    entry.book.rating,
                    entry.book.review_count
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
