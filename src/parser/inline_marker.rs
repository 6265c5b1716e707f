use crate::corpus::Pair;

use super::blocks::Block;
use super::is_noise;

/// Walk scripture spans and paragraphs in order. Paragraphs seen before the
/// first span are returned as continuation text for the previous page.
pub fn assemble(blocks: &[Block]) -> (Vec<Pair>, Option<String>) {
    let mut pairs = Vec::new();
    let mut current: Option<Pair> = None;
    let mut leading: Vec<&str> = Vec::new();
    let mut seen_scripture = false;

    for block in blocks {
        match block {
            Block::Scripture(text) => {
                seen_scripture = true;
                flush(&mut pairs, current.take());
                // an empty marker closes the open pair without opening another
                if !text.is_empty() {
                    current = Some(Pair::new(text.clone(), String::new()));
                }
            }
            Block::Paragraph { text, closes_pair } => {
                if *closes_pair && current.is_some() {
                    flush(&mut pairs, current.take());
                } else if is_noise(text) {
                    continue;
                } else if let Some(pair) = current.as_mut() {
                    if !pair.explanation.is_empty() {
                        pair.explanation.push(' ');
                    }
                    pair.explanation.push_str(text);
                } else if !seen_scripture {
                    leading.push(text.as_str());
                }
            }
        }
    }
    flush(&mut pairs, current);

    let continuation = (!leading.is_empty()).then(|| leading.join(" "));
    (pairs, continuation)
}

fn flush(pairs: &mut Vec<Pair>, pair: Option<Pair>) {
    if let Some(pair) = pair.filter(|p| !p.explanation.is_empty()) {
        pairs.push(pair);
    }
}
