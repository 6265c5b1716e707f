use std::sync::LazyLock;

use regex::Regex;

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[，。！？；：、《》「」『』【】〔〕〈〉()（）\s]+").unwrap()
});

const MIN_TOKEN_CHARS: usize = 2;

/// Split on East-Asian punctuation and whitespace, keeping tokens of two or
/// more characters. Queries and indexed text go through the same function.
pub fn tokenize(text: &str) -> Vec<String> {
    SEPARATOR_RE
        .split(text)
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn splits_on_punctuation_runs() {
        assert_eq!(
            tokenize("戒者，防非止惡。「律儀」  攝善法"),
            vec!["戒者", "防非止惡", "律儀", "攝善法"]
        );
    }

    #[test]
    fn single_characters_are_dropped() {
        assert!(tokenize("戒").is_empty());
        assert_eq!(tokenize("戒、定、慧學"), vec!["慧學"]);
    }

    #[test]
    fn empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("，。！？").is_empty());
    }

    #[test]
    fn idempotent_on_joined_tokens() {
        let first = tokenize("南山律（在家）備覽：略編，戒相。");
        let second = tokenize(&first.join(" "));
        let a: HashSet<_> = first.iter().collect();
        let b: HashSet<_> = second.iter().collect();
        assert_eq!(a, b);
    }
}
