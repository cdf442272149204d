//! Feed text to feed document conversion.

mod parser;

pub use parser::parse_feed;

use crate::errors::AppResult;
use crate::models::FeedDocument;

/// Converter from raw feed text to a structured document.
pub trait FeedParser: Send + Sync {
    fn parse(&self, text: &str) -> AppResult<FeedDocument>;
}

/// RSS 2.0 parser backed by [`parse_feed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RssFeedParser;

impl FeedParser for RssFeedParser {
    fn parse(&self, text: &str) -> AppResult<FeedDocument> {
        parse_feed(text)
    }
}
