use crate::corpus::Pair;

use super::blocks::QuoteUnit;
use super::is_noise;

/// Turn quote units into complete pairs. The last unit on the page is held
/// back as pending because its commentary may run onto the next page.
pub fn assemble(units: &[QuoteUnit]) -> (Vec<Pair>, Option<Pair>) {
    let mut pairs = Vec::with_capacity(units.len().saturating_sub(1));
    let mut pending = None;
    let last = units.len().saturating_sub(1);

    for (idx, unit) in units.iter().enumerate() {
        if unit.original.is_empty() {
            continue;
        }
        let explanation = unit
            .paragraphs
            .iter()
            .filter(|p| !is_noise(p))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let pair = Pair::new(unit.original.clone(), explanation);
        if idx == last {
            pending = Some(pair);
        } else {
            pairs.push(pair);
        }
    }

    (pairs, pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(original: &str, paragraphs: &[&str]) -> QuoteUnit {
        QuoteUnit {
            original: original.to_string(),
            paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn emits_n_minus_one_pairs_and_one_pending() {
        for n in 1..5 {
            let units: Vec<_> = (0..n)
                .map(|i| unit(&format!("原文{}", i), &["這是一段足夠長的解釋"]))
                .collect();
            let (pairs, pending) = assemble(&units);
            assert_eq!(pairs.len(), n - 1);
            assert!(pending.is_some());
        }
    }

    #[test]
    fn empty_page() {
        let (pairs, pending) = assemble(&[]);
        assert!(pairs.is_empty());
        assert!(pending.is_none());
    }

    #[test]
    fn short_paragraphs_are_noise() {
        let units = vec![
            unit("原文甲", &["一二三四五", "一二三四五六", "第二段解釋內容"]),
            unit("原文乙", &[]),
        ];
        let (pairs, pending) = assemble(&units);
        assert_eq!(pairs[0].explanation, "一二三四五六 第二段解釋內容");
        assert_eq!(pending.unwrap().explanation, "");
    }

    #[test]
    fn empty_original_still_counts_as_position() {
        let units = vec![unit("原文甲", &["第一段解釋內容"]), unit("", &["孤立的解釋內容"])];
        let (pairs, pending) = assemble(&units);
        assert_eq!(pairs.len(), 1);
        assert!(pending.is_none());
    }
}
