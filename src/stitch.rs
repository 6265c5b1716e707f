//! Folds per-page extractions into the ordered corpus, carrying the last
//! anchor of each page forward until it is known to be complete.
//!
//! Each step may append to the record emitted by the step before it, and to
//! no other record.

use tracing::{debug, warn};

use crate::corpus::{CorpusRecord, Pair};
use crate::parser::PageExtraction;

/// A pending fragment travelling from one page to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carry {
    pub origin_page: u32,
    pub pair: Pair,
}

/// A carried fragment dropped because the next page had nothing to resolve it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lapse {
    pub origin_page: u32,
    pub at_page: u32,
    pub original: String,
}

/// Counters describing what the stitcher did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StitchReport {
    /// Carries appended to the preceding record.
    pub finalized: usize,
    /// Carries merged with the next page's pending fragment.
    pub merged: usize,
    /// Carries extended with a page's leading commentary.
    pub continued: usize,
    /// Leading commentary dropped because no fragment was carried into its page.
    pub unattached_commentary: usize,
    /// Pairs dropped because their original or explanation was empty.
    pub empty_dropped: usize,
    pub lapses: Vec<Lapse>,
}

/// The fold accumulator: the carry plus the corpus emitted so far.
#[derive(Debug, Default)]
pub struct StitchState {
    pub carry: Option<Carry>,
    pub records: Vec<CorpusRecord>,
    pub report: StitchReport,
}

/// Stitch pages into records. Pages are put in ascending page order first,
/// since resolution depends on what the following page holds.
pub fn stitch(mut pages: Vec<PageExtraction>) -> (Vec<CorpusRecord>, StitchReport) {
    pages.sort_by_key(|p| p.page_number);
    let total = pages.len();

    let state = pages
        .into_iter()
        .enumerate()
        .fold(StitchState::default(), |state, (idx, page)| {
            step(state, page, idx + 1 == total)
        });

    debug_assert!(state.carry.is_none());
    (state.records, state.report)
}

/// One fold step: `(carry, corpus_so_far, next_page) -> (new_carry, updated_corpus)`.
pub fn step(mut state: StitchState, page: PageExtraction, is_last: bool) -> StitchState {
    let PageExtraction {
        page_number,
        url,
        title,
        mut pairs,
        mut pending,
        mut continuation,
        ..
    } = page;

    let mut next_carry = None;
    if let Some(mut carry) = state.carry.take() {
        if !pairs.is_empty() {
            if let Some(text) = continuation.take() {
                join_explanation(&mut carry.pair.explanation, &text);
                state.report.continued += 1;
            }
            finalize_into_previous(&mut state, carry);
        } else if let Some(fragment) = pending.take() {
            join_explanation(&mut carry.pair.explanation, &fragment.explanation);
            state.report.merged += 1;
            next_carry = Some(carry);
        } else if let Some(text) = continuation.take() {
            join_explanation(&mut carry.pair.explanation, &text);
            state.report.continued += 1;
            finalize_into_previous(&mut state, carry);
        } else {
            warn!(
                "Page {}: dropping fragment carried from page {} ({} chars of commentary)",
                page_number,
                carry.origin_page,
                carry.pair.explanation.chars().count()
            );
            state.report.lapses.push(Lapse {
                origin_page: carry.origin_page,
                at_page: page_number,
                original: carry.pair.original,
            });
        }
    }

    if let Some(text) = continuation {
        warn!(
            "Page {}: no carried fragment to continue, dropping {} chars of leading commentary",
            page_number,
            text.chars().count()
        );
        state.report.unattached_commentary += 1;
    }

    if let Some(pair) = pending {
        next_carry = Some(Carry {
            origin_page: page_number,
            pair,
        });
    }

    if is_last {
        if let Some(carry) = next_carry.take() {
            debug!("Page {}: last page, keeping its pending fragment", page_number);
            pairs.push(carry.pair);
        }
    }

    let before = pairs.len();
    pairs.retain(is_complete);
    state.report.empty_dropped += before - pairs.len();

    state.records.push(CorpusRecord {
        page: page_number,
        title,
        url,
        items: pairs,
        pending_explanation: None,
    });
    state.carry = next_carry;
    state
}

fn finalize_into_previous(state: &mut StitchState, carry: Carry) {
    if !is_complete(&carry.pair) {
        state.report.empty_dropped += 1;
        return;
    }
    match state.records.last_mut() {
        Some(prev) => {
            prev.items.push(carry.pair);
            state.report.finalized += 1;
        }
        None => warn!("Carry from page {} has no record to attach to", carry.origin_page),
    }
}

fn is_complete(pair: &Pair) -> bool {
    !pair.original.is_empty() && !pair.explanation.is_empty()
}

fn join_explanation(target: &mut String, more: &str) {
    target.push(' ');
    target.push_str(more);
}
