pub mod image_cache;
pub mod source_fetcher;

pub use image_cache::{ImageCache, ImageKey};
pub use source_fetcher::SourceFetcher;
