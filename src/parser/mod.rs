pub mod blocks;
pub mod inline_marker;
pub mod quote_block;

use scraper::Html;
use tracing::debug;

use crate::corpus::Pair;
use crate::db::RawPage;

/// Paragraphs this short are navigation or numbering noise.
const NOISE_MAX_CHARS: usize = 5;

/// Which page template the extractor recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Scripture sits in `<blockquote>`, commentary in the sibling paragraphs.
    QuoteBlock,
    /// Scripture is marked with `span.scripture-kai` inside the running text.
    InlineMarker,
}

/// Everything extracted from a single page, before stitching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub page_number: u32,
    pub url: String,
    pub title: String,
    pub strategy: Option<Strategy>,
    pub pairs: Vec<Pair>,
    /// Last anchor on the page; its commentary may continue on the next page.
    pub pending: Option<Pair>,
    /// Commentary found before the first anchor on the page.
    pub continuation: Option<String>,
}

impl PageExtraction {
    pub fn empty(page_number: u32, url: &str, title: String) -> Self {
        PageExtraction {
            page_number,
            url: url.to_string(),
            title,
            strategy: None,
            pairs: Vec::new(),
            pending: None,
            continuation: None,
        }
    }
}

/// markup → region → strategy → pairs.
pub fn process_page(page: &RawPage, series_name: &str) -> PageExtraction {
    extract(&page.html, page.page, &page.url, series_name)
}

/// Best-effort: markup the parser cannot make sense of yields an empty extraction.
pub fn extract(markup: &str, page_number: u32, url: &str, series_name: &str) -> PageExtraction {
    let doc = Html::parse_document(markup);
    let title = blocks::find_title(&doc)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{} - {:03}", series_name, page_number));
    let mut extraction = PageExtraction::empty(page_number, url, title);

    let Some(region) = blocks::main_region(&doc) else {
        debug!("page {}: no content region", page_number);
        return extraction;
    };

    let quotes = blocks::quote_blocks(region);
    let strategy = select_strategy(quotes.len());
    extraction.strategy = Some(strategy);

    match strategy {
        Strategy::QuoteBlock => {
            let units = blocks::quote_units(&quotes);
            let (pairs, pending) = quote_block::assemble(&units);
            extraction.pairs = pairs;
            extraction.pending = pending;
        }
        Strategy::InlineMarker => {
            let inline = blocks::inline_blocks(region);
            let (pairs, continuation) = inline_marker::assemble(&inline);
            extraction.pairs = pairs;
            extraction.continuation = continuation;
        }
    }

    debug!(
        "page {}: {:?}, {} pairs, pending={}",
        page_number,
        extraction.strategy,
        extraction.pairs.len(),
        extraction.pending.is_some()
    );
    extraction
}

fn select_strategy(quote_count: usize) -> Strategy {
    if quote_count > 0 {
        Strategy::QuoteBlock
    } else {
        Strategy::InlineMarker
    }
}

pub(crate) fn is_noise(text: &str) -> bool {
    text.chars().count() <= NOISE_MAX_CHARS
}
