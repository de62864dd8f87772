pub mod downloader;
pub mod parser;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

use crate::cache::{self, CacheGate, CacheState};
use crate::config::Config;

pub use downloader::Downloader;
pub use parser::{ImageSrc, Parser};

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    AlreadyCached { path: PathBuf },
    Written { path: PathBuf, count: usize },
}

impl Outcome {
    pub fn path(&self) -> &Path {
        match self {
            Outcome::AlreadyCached { path } | Outcome::Written { path, .. } => path,
        }
    }
}

/// Result of [`ChapterFetcher::download_images`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImageReport {
    pub saved: Vec<PathBuf>,
    /// Cached entries that could not be resolved or downloaded.
    pub failed: Vec<String>,
}

impl ImageReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn resolve_image_url(base: &Url, src: &str) -> Result<Url> {
    if src.is_empty() {
        anyhow::bail!("empty src");
    }
    base.join(src)
        .with_context(|| format!("invalid image url '{}'", src))
}

fn image_file_name(index: usize, url: &Url) -> String {
    let extension = Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg");
    format!("{:03}.{}", index + 1, extension)
}

pub struct ChapterFetcher {
    config: Config,
    gate: CacheGate,
    parser: Parser,
    downloader: Downloader,
}

impl ChapterFetcher {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gate: CacheGate::new(&config.cache_dir),
            parser: Parser,
            downloader: Downloader::new(&config)?,
            config,
        })
    }

    pub fn page_url(&self, chapter: &str) -> String {
        self.config.page_url(chapter)
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, chapter: &str) -> Result<Outcome> {
        let path = match self.gate.check(chapter).await? {
            CacheState::Cached(path) => {
                info!("already cached: {}", path.display());
                return Ok(Outcome::AlreadyCached { path });
            }
            CacheState::Missing(path) => path,
        };

        let html = self.downloader.page(&self.page_url(chapter)).await?;
        let srcs = self.parser.image_srcs(&html);
        // Resolve every src before the file is opened so a bad page leaves no cache behind.
        let urls = self.parser.collect_srcs(srcs, self.config.missing_src)?;

        if self.config.atomic_write {
            cache::write_urls_atomic(&path, &urls).await?;
        } else {
            cache::write_urls(&path, &urls).await?;
        }

        Ok(Outcome::Written {
            path,
            count: urls.len(),
        })
    }

    /// Saves every cached url of `chapter` into `dir` as `001.<ext>`, `002.<ext>`, ...
    ///
    /// Relative srcs are resolved against the chapter page. A failed image is
    /// logged and recorded in the report; the rest are still downloaded.
    #[instrument(skip(self, urls, dir), fields(dir = %dir.display()))]
    pub async fn download_images(
        &self,
        chapter: &str,
        urls: &[String],
        dir: &Path,
    ) -> Result<ImageReport> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create image dir {}", dir.display()))?;

        let base = Url::parse(&self.page_url(chapter))?;
        let mut report = ImageReport::default();

        for (index, src) in urls.iter().enumerate() {
            let (url, image_bytes) = match resolve_image_url(&base, src) {
                Ok(url) => match self.downloader.image(url.as_str()).await {
                    Ok(image_bytes) => (url, image_bytes),
                    Err(e) => {
                        warn!("image #{} download failed: {:#}", index + 1, e);
                        report.failed.push(src.clone());
                        continue;
                    }
                },
                Err(e) => {
                    warn!("image #{} skipped: {:#}", index + 1, e);
                    report.failed.push(src.clone());
                    continue;
                }
            };

            let image_path = dir.join(image_file_name(index, &url));
            fs::write(&image_path, &image_bytes)
                .await
                .with_context(|| format!("failed to save {}", image_path.display()))?;
            report.saved.push(image_path);
        }

        info!(
            "saved {} of {} images to {}",
            report.saved.len(),
            urls.len(),
            dir.display()
        );
        Ok(report)
    }

    /// Chapter stored by [`save_bookmark`](Self::save_bookmark), if any.
    pub async fn last_chapter(&self) -> Result<Option<String>> {
        cache::read_last_chapter(self.gate.dir()).await
    }

    pub async fn save_bookmark(&self, chapter: &str) -> Result<()> {
        fs::create_dir_all(self.gate.dir())
            .await
            .with_context(|| format!("failed to create cache dir {}", self.gate.dir().display()))?;
        cache::save_last_chapter(self.gate.dir(), chapter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_src_resolves_against_page() {
        let base = Url::parse("https://example.com/manga/series-chapter-3/").unwrap();
        assert_eq!(
            resolve_image_url(&base, "/img/01.png").unwrap().as_str(),
            "https://example.com/img/01.png"
        );
        assert_eq!(
            resolve_image_url(&base, "https://cdn.example.com/a.webp").unwrap().as_str(),
            "https://cdn.example.com/a.webp"
        );
        assert!(resolve_image_url(&base, "").is_err());
    }

    #[test]
    fn file_names_are_numbered_by_position() {
        let url = Url::parse("https://cdn.example.com/pages/a.webp?w=800").unwrap();
        assert_eq!(image_file_name(0, &url), "001.webp");

        let no_ext = Url::parse("https://cdn.example.com/pages/raw").unwrap();
        assert_eq!(image_file_name(11, &no_ext), "012.jpg");
    }
}
