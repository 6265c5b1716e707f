use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

const SCRIPTURE_CLASS: &str = "scripture-kai";

static MAIN_REGION: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse("div#lang_body_default").unwrap(),
        Selector::parse("main").unwrap(),
    ]
});
static TITLE: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse("h1").unwrap(),
        Selector::parse("h2.entry-title").unwrap(),
    ]
});
static BLOCKQUOTE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("blockquote").unwrap());

/// A scripture quote-block and the paragraphs that follow it as siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteUnit {
    pub original: String,
    pub paragraphs: Vec<String>,
}

/// Elements that matter to the inline-marker strategy, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A `span.scripture-kai` anywhere in the region.
    Scripture(String),
    Paragraph {
        text: String,
        /// The next sibling is a quote-block carrying a scripture span.
        /// Only set when a region is walked without strategy selection,
        /// since a region with any blockquote takes the quote-block path.
        closes_pair: bool,
    },
}

/// Trimmed text nodes concatenated without separators.
pub fn stripped_text(el: ElementRef) -> String {
    el.text().map(str::trim).filter(|t| !t.is_empty()).collect()
}

pub fn find_title(doc: &Html) -> Option<String> {
    TITLE
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .map(stripped_text)
}

pub fn main_region(doc: &Html) -> Option<ElementRef<'_>> {
    MAIN_REGION.iter().find_map(|sel| doc.select(sel).next())
}

pub fn quote_blocks(region: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    region.select(&BLOCKQUOTE).collect()
}

/// Pair every quote-block with the `p` siblings that follow it, up to the
/// next `blockquote` or `h2`.
pub fn quote_units(quotes: &[ElementRef]) -> Vec<QuoteUnit> {
    quotes
        .iter()
        .map(|quote| {
            let mut paragraphs = Vec::new();
            for sibling in quote.next_siblings().filter_map(ElementRef::wrap) {
                match sibling.value().name() {
                    "blockquote" | "h2" => break,
                    "p" => paragraphs.push(stripped_text(sibling)),
                    _ => {}
                }
            }
            QuoteUnit {
                original: stripped_text(*quote),
                paragraphs,
            }
        })
        .collect()
}

/// Flatten the region into the scripture spans and paragraphs the
/// inline-marker strategy walks over. A paragraph wrapping a span is
/// represented by the span alone.
pub fn inline_blocks(region: ElementRef) -> Vec<Block> {
    region
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter_map(|el| match el.value().name() {
            "span" if is_scripture(el) => Some(Block::Scripture(stripped_text(el))),
            "p" if !contains_scripture(el) => Some(Block::Paragraph {
                text: stripped_text(el),
                closes_pair: next_is_scripture_quote(el),
            }),
            _ => None,
        })
        .collect()
}

fn is_scripture(el: ElementRef) -> bool {
    el.value().classes().any(|c| c == SCRIPTURE_CLASS)
}

fn contains_scripture(el: ElementRef) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| d.value().name() == "span" && is_scripture(d))
}

fn next_is_scripture_quote(el: ElementRef) -> bool {
    el.next_siblings()
        .find_map(ElementRef::wrap)
        .filter(|next| next.value().name() == "blockquote")
        .is_some_and(contains_scripture)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_of(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn title_prefers_h1() {
        let doc = region_of("<h2 class=\"entry-title\">Second</h2><h1> First </h1>");
        assert_eq!(find_title(&doc).as_deref(), Some("First"));
    }

    #[test]
    fn title_falls_back_to_entry_title() {
        let doc = region_of("<h2>plain</h2><h2 class=\"entry-title\">Entry</h2>");
        assert_eq!(find_title(&doc).as_deref(), Some("Entry"));
    }

    #[test]
    fn no_title() {
        let doc = region_of("<p>nothing here</p>");
        assert!(find_title(&doc).is_none());
    }

    #[test]
    fn region_prefers_lang_body() {
        let doc = region_of(
            "<main><p>outer</p></main><div id=\"lang_body_default\"><p>inner</p></div>",
        );
        let region = main_region(&doc).unwrap();
        assert_eq!(stripped_text(region), "inner");
    }

    #[test]
    fn stripped_text_drops_whitespace_nodes() {
        let doc = region_of("<main><blockquote>\n  戒者 <b>防非</b>\n  止惡 </blockquote></main>");
        let region = main_region(&doc).unwrap();
        let quotes = quote_blocks(region);
        assert_eq!(stripped_text(quotes[0]), "戒者防非止惡");
    }

    #[test]
    fn quote_unit_stops_at_heading() {
        let doc = region_of(
            "<main><blockquote>原文一</blockquote><p>第一段解釋文字</p><div>skip</div>\
             <p>第二段解釋文字</p><h2>章</h2><p>不屬於此段落</p></main>",
        );
        let region = main_region(&doc).unwrap();
        let units = quote_units(&quote_blocks(region));
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].original, "原文一");
        assert_eq!(units[0].paragraphs, vec!["第一段解釋文字", "第二段解釋文字"]);
    }

    #[test]
    fn inline_blocks_mark_closing_paragraph() {
        let doc = region_of(
            "<main><p><span class=\"scripture-kai\">經文甲</span></p><p>解釋甲的文字內容</p>\
             <blockquote><span class=\"scripture-kai\">經文乙</span></blockquote></main>",
        );
        let region = main_region(&doc).unwrap();
        let blocks = inline_blocks(region);
        assert_eq!(
            blocks,
            vec![
                Block::Scripture("經文甲".into()),
                Block::Paragraph { text: "解釋甲的文字內容".into(), closes_pair: true },
                Block::Scripture("經文乙".into()),
            ]
        );
    }

    #[test]
    fn plain_spans_are_ignored() {
        let doc = region_of("<main><span class=\"note\">x</span></main>");
        let region = main_region(&doc).unwrap();
        assert!(inline_blocks(region).is_empty());
    }
}
