mod corpus;
mod db;
mod fetcher;
mod parser;
mod search;
mod settings;
mod stitch;

use std::time::Instant;

use clap::{Parser, Subcommand};

use parser::PageExtraction;
use settings::Settings;
use stitch::StitchReport;

#[derive(Parser)]
#[command(name = "nanshan_scraper", about = "Nanshan vinaya transcript harvester and search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a range of pages for fetching
    Init {
        /// First page (default: first_page setting)
        #[arg(long)]
        from: Option<u32>,
        /// Last page, inclusive (default: last_page setting)
        #[arg(long)]
        to: Option<u32>,
    },
    /// Fetch unvisited pages into the local cache
    Fetch {
        /// Max pages to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract and stitch every cached page into the corpus file
    Process,
    /// Fetch + process in one go
    Run {
        /// Max pages to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show what the extractor finds on a single page
    Inspect {
        page: u32,
    },
    /// Rank corpus passages against a query
    Search {
        query: String,
        /// Max results (default: search_limit setting)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print the best explanation for a passage
    Explain {
        query: String,
    },
    /// Show cache and corpus statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Init { from, to } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let from = from.unwrap_or(settings.first_page);
            let to = to.unwrap_or(settings.last_page);
            let pages = settings.page_range(from, to);
            let inserted = db::enqueue_pages(&conn, &pages)?;
            println!("Queued {} new pages ({} in range {}-{})", inserted, pages.len(), from, to);
            Ok(())
        }
        Commands::Fetch { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first or all pages are fetched.");
                return Ok(());
            }
            println!("Fetching {} pages (streaming to cache)...", pages.len());
            let stats = fetcher::fetch_pages_streaming(&conn, pages, &settings).await?;
            println!(
                "Done: {} fetched ({} ok, {} unavailable).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_cached(&conn)?;
            if pages.is_empty() {
                println!("No cached pages. Run 'fetch' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            process_pages(&pages, &settings)?.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;

            // Phase 1: Fetch (streaming to cache)
            if pages.is_empty() {
                println!("No unvisited pages, processing the existing cache.");
            } else {
                let t_fetch = Instant::now();
                println!("Pipeline: fetching {} pages...", pages.len());
                let stats = fetcher::fetch_pages_streaming(&conn, pages, &settings).await?;
                println!(
                    "Fetched {} pages ({} ok, {} unavailable) in {:.1}s",
                    stats.total,
                    stats.ok,
                    stats.errors,
                    t_fetch.elapsed().as_secs_f64()
                );
            }

            // Phase 2: Extract + stitch
            let t_process = Instant::now();
            let cached = db::fetch_cached(&conn)?;
            if cached.is_empty() {
                println!("Nothing to process (every fetch failed).");
                return Ok(());
            }
            println!("Processing {} pages...", cached.len());
            let summary = process_pages(&cached, &settings)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            summary.print();
            Ok(())
        }
        Commands::Inspect { page } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let raw = match db::fetch_cached_page(&conn, page)? {
                Some(raw) => raw,
                None => {
                    let url = settings.page_url(page);
                    println!("Page {} not cached, fetching {}", page, url);
                    let client = fetcher::build_client(&settings)?;
                    let (html, _) = fetcher::fetch_html(&client, &url).await?;
                    db::RawPage { page, url, html }
                }
            };
            print_extraction(&parser::process_page(&raw, &settings.series_name));
            Ok(())
        }
        Commands::Search { query, limit } => {
            let records = corpus::load(&settings.corpus_path)?;
            let engine = search::SearchEngine::new(&records);
            if engine.is_empty() {
                println!("Corpus has no passages. Run 'process' first.");
                return Ok(());
            }
            let limit = limit.unwrap_or(settings.search_limit);
            let ranked = engine.ranked(&query);
            if ranked.is_empty() {
                println!("No matches.");
                return Ok(());
            }
            for (i, (entry, score)) in ranked.iter().take(limit).enumerate() {
                println!(
                    "{:>2}. [{:.3}] p.{:03} {}",
                    i + 1,
                    score,
                    entry.page,
                    entry.title
                );
                println!("    原文: {}", truncate(&entry.original, 60));
                println!("    解釋: {}", truncate(&entry.explanation, 120));
                println!("    {}", entry.url);
            }
            println!("\n{} of {} candidates shown", ranked.len().min(limit), ranked.len());
            Ok(())
        }
        Commands::Explain { query } => {
            let records = corpus::load(&settings.corpus_path)?;
            let engine = search::SearchEngine::new(&records);
            println!("{}", engine.get_explanation(&query));
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Queued:      {}", s.total);
            println!("Visited:     {}", s.visited);
            println!("Unvisited:   {}", s.unvisited);
            println!("Fetched:     {}", s.fetched);
            println!("Unavailable: {}", s.errors);
            if settings.corpus_path.exists() {
                let records = corpus::load(&settings.corpus_path)?;
                println!("Corpus:      {} pages, {} pairs", records.len(), corpus::total_pairs(&records));
                for r in records.iter().filter(|r| r.items.is_empty()) {
                    println!("  page {:03} has no pairs", r.page);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessSummary {
    pages: usize,
    pairs: usize,
    report: StitchReport,
}

impl ProcessSummary {
    fn print(&self) {
        println!(
            "Saved {} pages, {} pairs ({} carried across pages, {} merged, {} continued).",
            self.pages, self.pairs, self.report.finalized, self.report.merged, self.report.continued,
        );
        if self.report.empty_dropped > 0 {
            println!("Dropped {} incomplete pairs.", self.report.empty_dropped);
        }
        if self.report.unattached_commentary > 0 {
            println!(
                "Dropped leading commentary on {} pages with nothing to continue.",
                self.report.unattached_commentary
            );
        }
        if !self.report.lapses.is_empty() {
            println!("Lost {} carried fragments:", self.report.lapses.len());
            for lapse in &self.report.lapses {
                println!(
                    "  from page {:03} at page {:03}: {}",
                    lapse.origin_page,
                    lapse.at_page,
                    truncate(&lapse.original, 40)
                );
            }
        }
    }
}

fn process_pages(pages: &[db::RawPage], settings: &Settings) -> anyhow::Result<ProcessSummary> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    // Extraction is per page; stitching below needs them back in page order.
    let mut extractions: Vec<PageExtraction> = Vec::with_capacity(pages.len());
    for chunk in pages.chunks(50) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|p| parser::process_page(p, &settings.series_name))
            .collect();
        extractions.extend(results);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let (records, report) = stitch::stitch(extractions);
    corpus::save(&settings.corpus_path, &records)?;

    Ok(ProcessSummary {
        pages: records.len(),
        pairs: corpus::total_pairs(&records),
        report,
    })
}

fn print_extraction(page: &PageExtraction) {
    println!("Page:     {:03}", page.page_number);
    println!("URL:      {}", page.url);
    println!("Title:    {}", page.title);
    println!("Strategy: {:?}", page.strategy);
    println!("Pairs:    {}", page.pairs.len());
    for (i, pair) in page.pairs.iter().enumerate() {
        println!("\n  {}. 原文: {}", i + 1, truncate(&pair.original, 100));
        println!("     解釋: {}", truncate(&pair.explanation, 100));
    }
    if let Some(pending) = &page.pending {
        println!("\nPending (may continue on the next page):");
        println!("  原文: {}", truncate(&pending.original, 100));
        println!("  解釋: {}", truncate(&pending.explanation, 100));
    }
    if let Some(text) = &page.continuation {
        println!("\nLeading commentary: {}", truncate(text, 100));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
