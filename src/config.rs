use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Result, anyhow};
use regex::{NoExpand, Regex};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://steel-ball-run.com/manga/jojos-bizarre-adventure-steel-ball-run-chapter-{id}/";

static ENV_PREFIX: &str = "CHAPTER_FETCH";

static ID_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{id\}").expect("placeholder regex"));

/// What to do with an `<img>` that has no `src` attribute.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingSrc {
    /// Abort the run before anything is written.
    #[default]
    Fail,
    /// Drop the element and keep going.
    Skip,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Ignore `HTTP_PROXY` and friends.
    #[serde(default)]
    pub disable_proxy: bool,
    /// Treat non-2xx responses as errors instead of parsing the body.
    #[serde(default)]
    pub check_status: bool,
    /// Write through a `.part` file and rename once complete.
    #[serde(default)]
    pub atomic_write: bool,
    #[serde(default)]
    pub missing_src: MissingSrc,
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            cache_dir: default_cache_dir(),
            user_agent: default_user_agent(),
            timeout_secs: None,
            disable_proxy: false,
            check_status: false,
            atomic_write: false,
            missing_src: MissingSrc::default(),
        }
    }
}

impl Config {
    /// Loads `path` if it exists, then applies `CHAPTER_FETCH_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!("failed to deserialize {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!("failed to deserialize config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !ID_PLACEHOLDER.is_match(&self.url_template) {
            anyhow::bail!(
                "url_template '{}' has no {{id}} placeholder",
                self.url_template
            );
        }
        let sample = self.page_url("1");
        url::Url::parse(&sample)
            .map_err(|e| anyhow!("url_template produces an invalid url '{}': {}", sample, e))?;
        Ok(())
    }

    pub fn page_url(&self, chapter: &str) -> String {
        ID_PLACEHOLDER
            .replace_all(&self.url_template, NoExpand(chapter))
            .to_string()
    }
}
