use std::sync::LazyLock;

use anyhow::Result;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

use crate::config::MissingSrc;

/// `src` of one `<img>`, `None` when the attribute is absent.
pub type ImageSrc = Option<String>;

static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector"));

#[derive(Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    /// Every `<img>` in document order.
    #[instrument(skip_all)]
    pub fn image_srcs(&self, html: &str) -> Vec<ImageSrc> {
        let document = Html::parse_document(html);

        let srcs: Vec<ImageSrc> = document
            .select(&IMG_SELECTOR)
            .map(|img| img.value().attr("src").map(str::to_owned))
            .collect();

        info!("found {} image elements", srcs.len());
        srcs
    }

    pub fn collect_srcs(&self, srcs: Vec<ImageSrc>, policy: MissingSrc) -> Result<Vec<String>> {
        let mut urls = Vec::with_capacity(srcs.len());

        for (index, src) in srcs.into_iter().enumerate() {
            match (src, policy) {
                (Some(src), _) => urls.push(src),
                (None, MissingSrc::Fail) => {
                    anyhow::bail!("image #{} has no src attribute", index + 1)
                }
                (None, MissingSrc::Skip) => {
                    warn!("skipping image #{} without src", index + 1);
                }
            }
        }
        Ok(urls)
    }
}
