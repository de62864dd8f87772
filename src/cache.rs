use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, instrument};

#[derive(Debug, PartialEq, Eq)]
pub enum CacheState {
    /// The chapter was fetched before; nothing left to do.
    Cached(PathBuf),
    Missing(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CacheGate {
    dir: PathBuf,
}

impl CacheGate {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, chapter: &str) -> PathBuf {
        self.dir.join(format!("chap-{}.txt", chapter))
    }

    /// Creates the cache directory if needed and reports whether `chapter` is already cached.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn check(&self, chapter: &str) -> Result<CacheState> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create cache dir {}", self.dir.display()))?;

        let path = self.file_path(chapter);
        let exists = fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?;

        if exists {
            debug!("cache hit: {}", path.display());
            Ok(CacheState::Cached(path))
        } else {
            debug!("cache miss: {}", path.display());
            Ok(CacheState::Missing(path))
        }
    }
}

fn render(urls: &[String]) -> String {
    let mut content = String::with_capacity(urls.iter().map(|u| u.len() + 1).sum());
    for url in urls {
        content.push_str(url);
        content.push('\n');
    }
    content
}

/// Truncates `path` and writes one url per line, `\n` terminated.
pub async fn write_urls(path: &Path, urls: &[String]) -> Result<()> {
    fs::write(path, render(urls))
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} urls to {}", urls.len(), path.display());
    Ok(())
}

/// Like [`write_urls`], but `path` only appears once the whole list is on disk.
pub async fn write_urls_atomic(path: &Path, urls: &[String]) -> Result<()> {
    let part = part_path(path)?;

    let mut file = fs::File::create(&part)
        .await
        .with_context(|| format!("failed to create {}", part.display()))?;
    file.write_all(render(urls).as_bytes())
        .await
        .with_context(|| format!("failed to write {}", part.display()))?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&part, path)
        .await
        .with_context(|| format!("failed to move {} to {}", part.display(), path.display()))?;
    info!("wrote {} urls to {}", urls.len(), path.display());
    Ok(())
}

pub fn part_path(path: &Path) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))?
        .to_os_string();
    name.push(".part");
    Ok(path.with_file_name(name))
}

pub async fn read_urls(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    // Only `\n` separates entries; a `\r` inside a src is data.
    let mut urls: Vec<String> = content.split('\n').map(str::to_owned).collect();
    if urls.last().is_some_and(|last| last.is_empty()) {
        urls.pop();
    }
    Ok(urls)
}

pub fn bookmark_path(dir: &Path) -> PathBuf {
    dir.join("last_chap.txt")
}

/// Chapter recorded by the last `--bookmark` run, if any.
pub async fn read_last_chapter(dir: &Path) -> Result<Option<String>> {
    let path = bookmark_path(dir);
    if !fs::try_exists(&path)
        .await
        .with_context(|| format!("failed to stat {}", path.display()))?
    {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let chapter = content.trim();
    Ok((!chapter.is_empty()).then(|| chapter.to_string()))
}

pub async fn save_last_chapter(dir: &Path, chapter: &str) -> Result<()> {
    let path = bookmark_path(dir);
    fs::write(&path, chapter)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("saved last chapter {} to {}", chapter, path.display());
    Ok(())
}
