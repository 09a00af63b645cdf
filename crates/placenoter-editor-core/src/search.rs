//! Search and replace.
//!
//! Matches live outside the document as [`Decoration`]s and are recomputed
//! after every committed transaction and every term change. Matching is
//! case-insensitive, per textblock, and never overlaps.

use crate::model::{Document, Element, Node, TextNode};
use crate::serialize::{NodeVisitor, walk};
use crate::transform::Transaction;
use crate::types::Decoration;

/// Class carried by every search-result decoration.
pub const SEARCH_RESULT_CLASS: &str = "search-result";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    search_term: String,
    replace_term: String,
    results: Vec<Decoration>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn replace_term(&self) -> &str {
        &self.replace_term
    }

    /// Current match decorations in document order.
    pub fn results(&self) -> &[Decoration] {
        &self.results
    }

    pub fn is_active(&self) -> bool {
        !self.search_term.is_empty()
    }

    pub fn set_search_term(&mut self, term: impl Into<String>, doc: &Document) {
        self.search_term = term.into();
        self.update(doc);
    }

    pub fn set_replace_term(&mut self, term: impl Into<String>) {
        self.replace_term = term.into();
    }

    /// Drop the term and every decoration.
    pub fn clear(&mut self) {
        self.search_term.clear();
        self.results.clear();
    }

    /// Recompute matches against the latest document.
    pub fn update(&mut self, doc: &Document) {
        self.results = find_matches(doc, &self.search_term)
            .into_iter()
            .map(|(from, to)| Decoration::new(from, to, SEARCH_RESULT_CLASS))
            .collect();
        tracing::trace!(
            target: "placenoter::search",
            term = %self.search_term,
            matches = self.results.len(),
            "search results recomputed"
        );
    }

    /// Replace the first match in document order.
    pub fn replace(&self, tr: &mut Transaction) -> bool {
        let Some(&(from, to)) = find_matches(tr.doc(), &self.search_term).first() else {
            return false;
        };
        replace_match(tr, from, to, &self.replace_term)
    }

    /// Replace every match, last to first, in one transaction.
    pub fn replace_all(&self, tr: &mut Transaction) -> bool {
        let matches = find_matches(tr.doc(), &self.search_term);
        let mut replaced = 0;
        for &(from, to) in matches.iter().rev() {
            if replace_match(tr, from, to, &self.replace_term) {
                replaced += 1;
            }
        }
        tracing::debug!(
            target: "placenoter::search",
            replaced,
            "replace all"
        );
        replaced > 0
    }
}

fn replace_match(tr: &mut Transaction, from: usize, to: usize, with: &str) -> bool {
    let marks = tr.doc().marks_at(from + 1);
    let slice = if with.is_empty() {
        Vec::new()
    } else {
        vec![Node::marked(with, marks)]
    };
    match tr.replace(from, to, slice) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target: "placenoter::search", error = %e, from, to, "replace rejected");
            false
        }
    }
}

/// Single-char lowercase so match offsets line up with document positions.
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Every match of `term` as `(from, to)` document positions.
pub fn find_matches(doc: &Document, term: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = term.chars().map(fold).collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut collector = MatchCollector {
        needle,
        block: Vec::new(),
        start: 0,
        matches: Vec::new(),
    };
    walk(doc, &mut collector);
    collector.matches
}

struct MatchCollector {
    needle: Vec<char>,
    block: Vec<char>,
    start: usize,
    matches: Vec<(usize, usize)>,
}

impl NodeVisitor for MatchCollector {
    fn enter(&mut self, el: &Element, pos: usize) -> bool {
        if el.is_textblock() {
            self.block.clear();
            self.start = pos + 1;
        }
        true
    }

    fn text(&mut self, text: &TextNode, _pos: usize) {
        self.block.extend(text.text.chars().map(fold));
    }

    fn leave(&mut self, el: &Element, _pos: usize) {
        if !el.is_textblock() {
            return;
        }
        let n = self.needle.len();
        let mut i = 0;
        while i + n <= self.block.len() {
            if self.block[i..i + n] == self.needle[..] {
                self.matches.push((self.start + i, self.start + i + n));
                i += n;
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mark;
    use crate::model::build::*;
    use crate::serialize::text_content;
    use crate::state::EditorState;

    #[test]
    fn test_matches_are_case_insensitive_and_per_block() {
        let d = doc(vec![p_text("Cat and cAT"), p_text("concat")]);
        assert_eq!(find_matches(&d, "cat"), vec![(2, 5), (10, 13), (20, 23)]);
    }

    #[test]
    fn test_matches_do_not_overlap() {
        let d = doc(vec![p_text("aaaa")]);
        assert_eq!(find_matches(&d, "aa"), vec![(2, 4), (4, 6)]);
    }

    #[test]
    fn test_empty_term_matches_nothing() {
        let d = doc(vec![p_text("anything")]);
        assert!(find_matches(&d, "").is_empty());
    }

    #[test]
    fn test_matches_span_marked_leaves() {
        let d = doc(vec![p(vec![
            Node::text("fo"),
            Node::marked("ob", vec![Mark::Bold]),
            Node::text("ar"),
        ])]);
        assert_eq!(find_matches(&d, "oba"), vec![(3, 6)]);
    }

    #[test]
    fn test_replace_first_then_next() {
        let state = EditorState::new(doc(vec![p_text("cat cat")]));
        let mut search = SearchState::new();
        search.set_search_term("cat", &state.doc);
        search.set_replace_term("dog");
        assert_eq!(search.results().len(), 2);

        let mut tr = state.transaction();
        assert!(search.replace(&mut tr));
        let state = state.apply(&tr);
        search.update(&state.doc);
        assert_eq!(text_content(&state.doc), "dog cat");
        assert_eq!(search.search_term(), "cat");
        assert_eq!(search.results(), &[Decoration::new(6, 9, SEARCH_RESULT_CLASS)]);
    }

    #[test]
    fn test_replace_all_with_longer_text() {
        let state = EditorState::new(doc(vec![p_text("a-a-a"), p_text("A")]));
        let mut search = SearchState::new();
        search.set_search_term("a", &state.doc);
        search.set_replace_term("xyz");
        let mut tr = state.transaction();
        assert!(search.replace_all(&mut tr));
        let state = state.apply(&tr);
        assert_eq!(text_content(&state.doc), "xyz-xyz-xyz\n\nxyz");
        assert!(state.selection.is_valid(&state.doc));
    }

    #[test]
    fn test_replace_all_without_matches_is_noop() {
        let state = EditorState::new(doc(vec![p_text("abc")]));
        let mut search = SearchState::new();
        search.set_search_term("zzz", &state.doc);
        let mut tr = state.transaction();
        assert!(!search.replace_all(&mut tr));
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_clear_drops_results() {
        let d = doc(vec![p_text("abc")]);
        let mut search = SearchState::new();
        search.set_search_term("b", &d);
        assert!(search.is_active());
        search.clear();
        assert!(!search.is_active());
        assert!(search.results().is_empty());
    }
}
