use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use chapter_fetch::config::DEFAULT_CONFIG_FILE;
use chapter_fetch::utils::format_elapsed;
use chapter_fetch::{ChapterFetcher, Config, Outcome, cache, logger};

/// Fetch a chapter page and cache the urls of its images.
#[derive(Debug, Parser)]
#[command(name = "chapter-fetch", version)]
struct Cli {
    /// Chapter identifier, substituted into the url template.
    chapter: String,

    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print the cached urls to stdout.
    #[arg(long)]
    print: bool,

    /// Download every cached image into DIR.
    #[arg(long, value_name = "DIR")]
    download: Option<PathBuf>,

    /// Remember this chapter in the cache dir's last_chap.txt.
    #[arg(long)]
    bookmark: bool,
}

fn print_urls<W: Write>(out: &mut W, urls: &[String]) -> io::Result<()> {
    for url in urls {
        writeln!(out, "{}", url)?;
    }
    out.flush()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init();

    let config = Config::load(&cli.config)?;
    let fetcher = ChapterFetcher::new(config)?;

    let start = Instant::now();
    let outcome = fetcher.fetch(&cli.chapter).await?;
    if let Outcome::Written { path, count } = &outcome {
        info!(
            "cached {} urls in {} ({})",
            count,
            path.display(),
            format_elapsed(start.elapsed())
        );
    }

    if cli.print || cli.download.is_some() {
        let urls = cache::read_urls(outcome.path()).await?;

        if cli.print {
            print_urls(&mut io::stdout().lock(), &urls)?;
        }

        if let Some(dir) = &cli.download {
            let report = fetcher.download_images(&cli.chapter, &urls, dir).await?;
            if !report.is_complete() {
                anyhow::bail!(
                    "{} of {} images failed to download",
                    report.failed.len(),
                    urls.len()
                );
            }
        }
    }

    if cli.bookmark {
        if let Some(previous) = fetcher.last_chapter().await? {
            info!("previous bookmark: chapter {}", previous);
        }
        fetcher.save_bookmark(&cli.chapter).await?;
    }

    Ok(())
}
