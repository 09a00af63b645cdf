//! Syntax highlighting for code blocks.
//!
//! Every code block is tokenized with syntect and its scopes flattened into
//! [`HighlightSpan`]s over document positions. Results are cached per block
//! by a hash of language and text, so a recompute only tokenizes blocks that
//! changed. Between recomputes the spans are mapped through each
//! transaction.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, LazyLock};

use smol_str::{SmolStr, format_smolstr};
use syntect::easy::ScopeRegionIterator;
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::languages::{grammar_for, resolve};
use crate::model::{Document, NodeKind};
use crate::transform::{Assoc, Transaction};
use crate::types::Decoration;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Prefix for token classes.
pub const CLASS_PREFIX: &str = "hljs-";

/// A highlighted run of code-block text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightSpan {
    pub from: usize,
    pub to: usize,
    pub classes: Vec<SmolStr>,
}

impl HighlightSpan {
    pub fn to_decoration(&self) -> Decoration {
        Decoration::new(self.from, self.to, self.classes.join(" "))
    }
}

/// Span relative to the start of its block, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalSpan {
    from: usize,
    to: usize,
    classes: Vec<SmolStr>,
}

/// Keyword hints for auto-detection when the first line says nothing.
const KEYWORD_HINTS: &[(&str, &[&str])] = &[
    ("rust", &["fn ", "let mut ", "impl ", "pub fn", "::", "-> "]),
    ("python", &["def ", "elif ", "import ", "self.", "print(", "None"]),
    ("javascript", &["function ", "const ", "=> ", "console.", "let ", "require("]),
    ("cpp", &["#include", "std::", "int main", "cout", "nullptr"]),
    ("java", &["public class", "public static", "System.out", "private ", "void "]),
    ("sql", &["SELECT ", "FROM ", "WHERE ", "INSERT INTO", "CREATE TABLE"]),
    ("go", &["func ", "package ", ":= ", "fmt."]),
    ("bash", &["#!/bin", "echo ", "fi\n", "done\n", "$("]),
    ("css", &["{\n", "px;", "color:", "margin:", "@media"]),
    ("xml", &["</", "/>", "<?xml"]),
];

/// Registered language guessed from keyword hits.
fn guess_language(text: &str) -> Option<&'static str> {
    KEYWORD_HINTS
        .iter()
        .map(|(name, hints)| (*name, hints.iter().filter(|h| text.contains(*h)).count()))
        .filter(|(_, hits)| *hits >= 2)
        .max_by_key(|(_, hits)| *hits)
        .map(|(name, _)| name)
}

fn named_syntax(language: &str) -> Option<&'static SyntaxReference> {
    let grammar = grammar_for(resolve(language)?)?;
    SYNTAX_SET.find_syntax_by_name(grammar)
}

/// Grammar for a block. Unknown or missing languages are auto-detected.
fn syntax_for(language: Option<&str>, text: &str) -> &'static SyntaxReference {
    language
        .and_then(named_syntax)
        .or_else(|| SYNTAX_SET.find_syntax_by_first_line(text))
        .or_else(|| guess_language(text).and_then(named_syntax))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

/// Name of the grammar a block would be highlighted with.
pub fn effective_grammar(language: Option<&str>, text: &str) -> &'static str {
    &syntax_for(language, text).name
}

fn classes_for(stack: &ScopeStack) -> Vec<SmolStr> {
    let mut classes: Vec<SmolStr> = Vec::new();
    // The outermost scope names the grammar itself.
    for scope in stack.as_slice().iter().skip(1) {
        let name = scope.build_string();
        let Some(atom) = name.split('.').next().filter(|a| !a.is_empty()) else {
            continue;
        };
        let class = format_smolstr!("{CLASS_PREFIX}{atom}");
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    classes
}

fn tokenize(language: Option<&str>, text: &str) -> Vec<LocalSpan> {
    let syntax = syntax_for(language, text);
    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut spans: Vec<LocalSpan> = Vec::new();
    let mut offset = 0;
    for line in LinesWithEndings::from(text) {
        let ops = match state.parse_line(line, &SYNTAX_SET) {
            Ok(ops) => ops,
            Err(e) => {
                tracing::warn!(target: "placenoter::highlight", error = %e, "tokenizer failed");
                return Vec::new();
            }
        };
        for (piece, op) in ScopeRegionIterator::new(&ops, line) {
            if let Err(e) = stack.apply(op) {
                tracing::warn!(target: "placenoter::highlight", error = ?e, "bad scope op");
                return Vec::new();
            }
            let len = piece.chars().count();
            if len == 0 {
                continue;
            }
            let (from, to) = (offset, offset + len);
            offset = to;
            if piece.trim().is_empty() {
                continue;
            }
            let classes = classes_for(&stack);
            if classes.is_empty() {
                continue;
            }
            match spans.last_mut() {
                Some(last) if last.to == from && last.classes == classes => last.to = to,
                _ => spans.push(LocalSpan { from, to, classes }),
            }
        }
    }
    spans
}

fn cache_key(language: Option<&str>, text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    language.hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}

/// A code block's position range in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockRange {
    before: usize,
    after: usize,
}

fn code_blocks(doc: &Document) -> Vec<BlockRange> {
    doc.textblocks()
        .into_iter()
        .filter(|tb| tb.is_code())
        .map(|tb| BlockRange {
            before: tb.before,
            after: tb.after(),
        })
        .collect()
}

fn in_code_block(doc: &Document, pos: usize) -> bool {
    doc.textblock_at(pos).is_some_and(|tb| tb.is_code())
}

/// Whether a transaction forces a recompute: the selection head was or is
/// in a code block, the number of code blocks changed, or a step touched or
/// enclosed a code block.
pub fn affects_highlighting(tr: &Transaction, head_before: usize, head_after: usize) -> bool {
    if !tr.doc_changed() {
        return false;
    }
    let before = tr.doc_before();
    let after = tr.doc();
    if in_code_block(before, head_before) || in_code_block(after, head_after) {
        return true;
    }
    let old_blocks = code_blocks(before);
    if old_blocks.len() != code_blocks(after).len() {
        return true;
    }
    let maps = tr.mapping().maps();
    tr.steps().iter().enumerate().any(|(i, step)| {
        old_blocks.iter().any(|block| {
            let mut before = block.before;
            let mut after = block.after;
            for map in &maps[..i] {
                before = map.map(before, Assoc::After);
                after = map.map(after, Assoc::Before);
            }
            step.from <= after && step.to >= before
        })
    })
}

/// Highlight state for one document.
#[derive(Debug, Clone, Default)]
pub struct CodeHighlighter {
    spans: Vec<HighlightSpan>,
    cache: HashMap<u64, Arc<Vec<LocalSpan>>>,
}

impl CodeHighlighter {
    pub fn new(doc: &Document) -> Self {
        let mut highlighter = Self::default();
        highlighter.recompute(doc);
        highlighter
    }

    /// Current spans in document order.
    pub fn spans(&self) -> &[HighlightSpan] {
        &self.spans
    }

    pub fn decorations(&self) -> Vec<Decoration> {
        self.spans.iter().map(HighlightSpan::to_decoration).collect()
    }

    /// Tokenize every code block, reusing cached results.
    pub fn recompute(&mut self, doc: &Document) {
        let mut spans = Vec::new();
        let mut cache = HashMap::new();
        let mut tokenized = 0;
        for tb in doc.textblocks() {
            let NodeKind::CodeBlock { language } = &tb.kind else {
                continue;
            };
            let Some(el) = doc.element_at(&tb.path) else {
                continue;
            };
            let text = el.text();
            let language = language.as_deref();
            let key = cache_key(language, &text);
            let local = match self.cache.get(&key) {
                Some(hit) => hit.clone(),
                None => {
                    tokenized += 1;
                    Arc::new(tokenize(language, &text))
                }
            };
            spans.extend(local.iter().map(|s| HighlightSpan {
                from: tb.start + s.from,
                to: tb.start + s.to,
                classes: s.classes.clone(),
            }));
            cache.insert(key, local);
        }
        tracing::trace!(
            target: "placenoter::highlight",
            blocks = cache.len(),
            tokenized,
            spans = spans.len(),
            "highlight recomputed"
        );
        self.spans = spans;
        self.cache = cache;
    }

    /// Shift spans through a transaction's mapping without tokenizing.
    pub fn map(&mut self, tr: &Transaction) {
        let mapping = tr.mapping();
        self.spans.retain_mut(|span| {
            span.from = mapping.map(span.from, Assoc::After);
            span.to = mapping.map(span.to, Assoc::Before);
            span.from < span.to
        });
    }

    /// Bring spans up to date after a committed transaction.
    pub fn apply(&mut self, tr: &Transaction, head_before: usize, head_after: usize) {
        if affects_highlighting(tr, head_before, head_after) {
            self.recompute(tr.doc());
        } else if tr.doc_changed() {
            self.map(tr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::model::build::*;
    use crate::state::EditorState;
    use crate::types::Selection;

    #[test]
    fn test_rust_keywords_are_classed() {
        let d = doc(vec![code(Some("rust"), "fn main() {}\n")]);
        let hl = CodeHighlighter::new(&d);
        assert!(!hl.spans().is_empty());
        let has_keyword = hl
            .spans()
            .iter()
            .any(|s| s.classes.iter().any(|c| c == "hljs-storage" || c == "hljs-keyword"));
        assert!(has_keyword);
        for span in hl.spans() {
            assert!(span.from >= 2 && span.to <= 15);
            assert!(span.classes.iter().all(|c| c.starts_with(CLASS_PREFIX)));
        }
    }

    #[test]
    fn test_aliases_and_fallback_grammars() {
        assert_eq!(effective_grammar(Some("py"), "x = 1"), "Python");
        assert_eq!(effective_grammar(Some("ts"), "let x = 1"), "JavaScript");
        assert_eq!(effective_grammar(Some("kotlin"), "val x = 1"), "Java");
    }

    #[test]
    fn test_auto_detection() {
        assert_eq!(effective_grammar(None, "#!/usr/bin/env python\nprint(1)\n"), "Python");
        assert_eq!(
            effective_grammar(Some("nonsense"), "fn main() -> u8 {\n    let mut x = 1;\n}\n"),
            "Rust"
        );
        assert_eq!(effective_grammar(None, "just some words"), "Plain Text");
    }

    #[test]
    fn test_whitespace_is_never_decorated() {
        let d = doc(vec![code(Some("rust"), "   \n\t\n")]);
        let hl = CodeHighlighter::new(&d);
        assert!(hl.spans().is_empty());
    }

    #[test]
    fn test_paragraph_edit_maps_spans() {
        let d = doc(vec![p_text("intro"), code(Some("rust"), "let x = 1;")]);
        let state = EditorState::new(d);
        let mut hl = CodeHighlighter::new(&state.doc);
        let before: Vec<_> = hl.spans().to_vec();

        let mut tr = state.transaction();
        tr.replace(2, 2, vec![Node::text("ab")]).unwrap();
        tr.set_selection(Selection::collapsed(4));
        assert!(!affects_highlighting(&tr, state.selection.head, 4));
        hl.apply(&tr, state.selection.head, 4);
        let shifted: Vec<_> = before.iter().map(|s| (s.from + 2, s.to + 2)).collect();
        let now: Vec<_> = hl.spans().iter().map(|s| (s.from, s.to)).collect();
        assert_eq!(now, shifted);
    }

    #[test]
    fn test_code_edit_forces_recompute() {
        let d = doc(vec![code(Some("rust"), "let x = 1;")]);
        let state = EditorState::new(d);
        let mut tr = state.transaction();
        tr.replace(2, 2, vec![Node::text("// ")]).unwrap();
        assert!(affects_highlighting(&tr, 2, 5));
        let mut hl = CodeHighlighter::new(&state.doc);
        hl.apply(&tr, 2, 5);
        assert_eq!(hl.spans(), CodeHighlighter::new(tr.doc()).spans());
    }
}
