pub mod cache;
pub mod config;
pub mod crawler;
pub mod logger;
pub mod utils;

pub use config::{Config, MissingSrc};
pub use crawler::{ChapterFetcher, ImageReport, Outcome};
