//! Block-level commands: block types, lists, blockquotes, splitting and
//! joining textblocks, text input and the code-block keys.

use smol_str::SmolStr;

use crate::model::build::dblock;
use crate::model::{
    Document, Element, Mark, Node, NodeKind, NodeType, ResolvedPos, TextblockRef, char_slice,
    normalize_inline,
};
use crate::transform::Transaction;
use crate::types::{Selection, nearest_caret};

/// The three list flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

impl ListKind {
    pub fn list_kind(&self) -> NodeKind {
        match self {
            ListKind::Bullet => NodeKind::BulletList,
            ListKind::Ordered => NodeKind::OrderedList,
            ListKind::Task => NodeKind::TaskList,
        }
    }

    pub fn item_kind(&self) -> NodeKind {
        match self {
            ListKind::Task => NodeKind::TaskItem { checked: false },
            _ => NodeKind::ListItem,
        }
    }

    pub fn of(kind: &NodeKind) -> Option<Self> {
        match kind {
            NodeKind::BulletList => Some(ListKind::Bullet),
            NodeKind::OrderedList => Some(ListKind::Ordered),
            NodeKind::TaskList => Some(ListKind::Task),
            _ => None,
        }
    }
}

// === Relocation ===

/// An old node that reappears, unchanged inside, at a new position.
#[derive(Debug, Clone, Copy)]
struct Segment {
    old: usize,
    len: usize,
    new: usize,
}

/// Move selection ends that fell inside a relocated node; other ends keep the
/// transaction's mapped value.
fn relocate(original: Selection, mapped: Selection, segments: &[Segment]) -> Selection {
    let map = |pos: usize, fallback: usize| {
        segments
            .iter()
            .find(|s| s.old < pos && pos < s.old + s.len)
            .map(|s| s.new + (pos - s.old))
            .unwrap_or(fallback)
    };
    Selection::new(
        map(original.anchor, mapped.anchor),
        map(original.head, mapped.head),
    )
}

fn replace_or_warn(tr: &mut Transaction, from: usize, to: usize, slice: Vec<Node>) -> bool {
    match tr.replace(from, to, slice) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, from, to, "block edit rejected");
            false
        }
    }
}

/// Collapse inline content into a single unmarked leaf.
fn unmarked(content: &[Node]) -> Vec<Node> {
    let text: String = content
        .iter()
        .filter_map(Node::as_text)
        .map(|t| t.text.as_str())
        .collect();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    }
}

/// Split inline content at a character offset.
fn split_inline(content: &[Node], at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for node in content {
        let size = node.node_size();
        match node {
            Node::Text(t) if pos < at && at < pos + size => {
                left.push(Node::Text(t.slice(0, at - pos)));
                right.push(Node::Text(t.slice(at - pos, size)));
            }
            _ if pos + size <= at => left.push(node.clone()),
            _ => right.push(node.clone()),
        }
        pos += size;
    }
    (left, right)
}

fn retarget_content(kind: &NodeKind, content: &[Node]) -> Vec<Node> {
    if kind.node_type() == NodeType::CodeBlock {
        unmarked(content)
    } else {
        content.to_vec()
    }
}

// === Block types ===

/// Change the type of every textblock in the selection. Blocks the schema
/// refuses in their position keep their type.
pub(crate) fn set_block_type(
    tr: &mut Transaction,
    retype: impl Fn(&NodeKind) -> Option<NodeKind>,
) -> bool {
    let sel = tr.selection();
    let blocks = tr.doc().textblocks_between(sel.from(), sel.to());
    let mut changed = false;
    for tb in blocks {
        let Some(kind) = retype(&tb.kind) else {
            continue;
        };
        if kind == tb.kind {
            continue;
        }
        let Some(el) = tr.doc().element_at(&tb.path) else {
            continue;
        };
        let node = Node::element(kind.clone(), retarget_content(&kind, &el.content));
        match tr.replace(tb.before, tb.after(), vec![node]) {
            Ok(()) => changed = true,
            Err(e) => tracing::debug!(error = %e, "block type not allowed here"),
        }
    }
    changed
}

pub(crate) fn set_paragraph(tr: &mut Transaction) -> bool {
    set_block_type(tr, |kind| Some(NodeKind::Paragraph { align: kind.align() }))
}

pub(crate) fn set_heading(tr: &mut Transaction, level: u8) -> bool {
    set_block_type(tr, |kind| {
        Some(NodeKind::Heading {
            level: level.clamp(1, 6),
            align: kind.align(),
        })
    })
}

pub(crate) fn toggle_heading(tr: &mut Transaction, level: u8) -> bool {
    let sel = tr.selection();
    let active = textblocks_all(tr.doc(), sel, |k| {
        matches!(k, NodeKind::Heading { level: l, .. } if *l == level)
    });
    if active {
        set_paragraph(tr)
    } else {
        set_heading(tr, level)
    }
}

pub(crate) fn set_code_block(tr: &mut Transaction, language: Option<&str>) -> bool {
    let kind = NodeKind::code_block(language);
    set_block_type(tr, |_| Some(kind.clone()))
}

pub(crate) fn toggle_code_block(tr: &mut Transaction, language: Option<&str>) -> bool {
    let sel = tr.selection();
    if textblocks_all(tr.doc(), sel, |k| k.node_type() == NodeType::CodeBlock) {
        set_paragraph(tr)
    } else {
        set_code_block(tr, language)
    }
}

/// Relabel the code blocks in the selection.
pub(crate) fn set_code_block_language(tr: &mut Transaction, language: Option<&str>) -> bool {
    let kind = NodeKind::code_block(language);
    set_block_type(tr, |k| (k.node_type() == NodeType::CodeBlock).then(|| kind.clone()))
}

/// Every textblock touched by the selection satisfies `pred`.
pub fn textblocks_all(doc: &Document, sel: Selection, pred: impl Fn(&NodeKind) -> bool) -> bool {
    let blocks = doc.textblocks_between(sel.from(), sel.to());
    !blocks.is_empty() && blocks.iter().all(|tb| pred(&tb.kind))
}

/// Language of the code block holding the caret. Outer `None` when the caret
/// is not in a code block.
pub fn code_block_language(doc: &Document, pos: usize) -> Option<Option<SmolStr>> {
    match doc.textblock_at(pos)?.kind {
        NodeKind::CodeBlock { language } => Some(language),
        _ => None,
    }
}

// === Wrapping ===

/// Sibling blocks covered by a selection, inside a container that holds
/// blocks.
#[derive(Debug, Clone, Copy)]
struct BlockRange {
    depth: usize,
    start_index: usize,
    end_index: usize,
}

fn holds_blocks(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Doc
            | NodeKind::Blockquote
            | NodeKind::ListItem
            | NodeKind::TaskItem { .. }
            | NodeKind::TableCell(_)
            | NodeKind::TableHeader(_)
    )
}

fn block_range(doc: &Document, rf: &ResolvedPos, rt: &ResolvedPos) -> Option<BlockRange> {
    let max = rf.depth().min(rt.depth());
    let mut depth = (0..=max)
        .rev()
        .find(|&k| rf.path()[..k] == rt.path()[..k])?;
    loop {
        let container = rf.node(doc, depth)?;
        if depth < max && holds_blocks(&container.kind) {
            break;
        }
        depth = depth.checked_sub(1)?;
    }
    Some(BlockRange {
        depth,
        start_index: rf.index_at(depth),
        end_index: rt.index_at(depth),
    })
}

/// Wrap the selected sibling blocks in a new container.
///
/// `convert` turns each block into a child of the wrapper, and `inner` is how
/// far inside that child the old block's equivalent begins.
fn wrap_blocks(
    tr: &mut Transaction,
    wrapper: NodeKind,
    inner: usize,
    convert: impl Fn(&Element) -> Option<Node>,
) -> bool {
    let doc = tr.doc().clone();
    let sel = tr.selection();
    let (Some(rf), Some(rt)) = (doc.resolve(sel.from()), doc.resolve(sel.to())) else {
        return false;
    };
    let Some(range) = block_range(&doc, &rf, &rt) else {
        return false;
    };
    let Some(container) = rf.node(&doc, range.depth) else {
        return false;
    };
    let at_root = container.kind == NodeKind::Doc;
    let content_start = rf.start(range.depth);
    let from = content_start + container.child_offset(range.start_index);
    let to = content_start + container.child_offset(range.end_index + 1);

    let mut children = Vec::new();
    let mut segments = Vec::new();
    let mut new_pos = from + 1 + usize::from(at_root);
    let mut old_pos = from;
    for node in &container.content[range.start_index..=range.end_index] {
        let Some(el) = node.as_element() else {
            return false;
        };
        let (block, old_before) = if at_root {
            match el.child_element(0) {
                Some(block) => (block, old_pos + 1),
                None => return false,
            }
        } else {
            (el, old_pos)
        };
        let Some(child) = convert(block) else {
            return false;
        };
        segments.push(Segment {
            old: old_before,
            len: block.node_size(),
            new: new_pos + inner,
        });
        new_pos += child.node_size();
        old_pos += node.node_size();
        children.push(child);
    }
    let wrapped = Node::element(wrapper, children);
    let wrapped = if at_root { dblock(wrapped) } else { wrapped };
    if !replace_or_warn(tr, from, to, vec![wrapped]) {
        return false;
    }
    let mapped = tr.selection();
    tr.set_selection(relocate(sel, mapped, &segments));
    true
}

/// Replace the node at `depth` with `pieces`. When that node is the only
/// child of a movable wrapper, each piece gets a wrapper of its own.
///
/// Each piece is paired with the old position its interior lines up with.
fn replace_with_pieces(
    tr: &mut Transaction,
    doc: &Document,
    rp: &ResolvedPos,
    depth: usize,
    pieces: Vec<(Node, usize)>,
) -> bool {
    if pieces.is_empty() || depth == 0 {
        return false;
    }
    let sel = tr.selection();
    let in_dblock = depth >= 2
        && rp
            .node(doc, depth - 1)
            .is_some_and(|p| p.node_type() == NodeType::DBlock);
    let target = if in_dblock { depth - 1 } else { depth };
    let (Some(from), Some(to)) = (rp.before(target), rp.after(target)) else {
        return false;
    };
    let mut cursor = from;
    let mut nodes = Vec::with_capacity(pieces.len());
    let mut segments = Vec::with_capacity(pieces.len());
    for (node, old) in pieces {
        segments.push(Segment {
            old,
            len: node.node_size(),
            new: cursor + usize::from(in_dblock),
        });
        let node = if in_dblock { dblock(node) } else { node };
        cursor += node.node_size();
        nodes.push(node);
    }
    if !replace_or_warn(tr, from, to, nodes) {
        return false;
    }
    let mapped = tr.selection();
    tr.set_selection(relocate(sel, mapped, &segments));
    true
}

// === Blockquote ===

pub(crate) fn toggle_blockquote(tr: &mut Transaction) -> bool {
    let doc = tr.doc().clone();
    let Some(rp) = doc.resolve(tr.selection().from()) else {
        return false;
    };
    match rp.find_ancestor(&doc, |el| el.kind == NodeKind::Blockquote) {
        Some(depth) => lift_blockquote(tr, &doc, &rp, depth),
        None => wrap_blocks(tr, NodeKind::Blockquote, 0, |block| {
            Some(Node::Element(block.clone()))
        }),
    }
}

fn lift_blockquote(tr: &mut Transaction, doc: &Document, rp: &ResolvedPos, depth: usize) -> bool {
    let Some(quote) = rp.node(doc, depth) else {
        return false;
    };
    let start = rp.start(depth);
    let pieces = quote
        .content
        .iter()
        .enumerate()
        .map(|(i, child)| (child.clone(), start + quote.child_offset(i)))
        .collect();
    replace_with_pieces(tr, doc, rp, depth, pieces)
}

pub fn blockquote_active(doc: &Document, pos: usize) -> bool {
    doc.resolve(pos)
        .and_then(|rp| rp.find_ancestor(doc, |el| el.kind == NodeKind::Blockquote))
        .is_some()
}

// === Lists ===

/// Innermost list around `pos` and its depth.
fn enclosing_list(doc: &Document, rp: &ResolvedPos) -> Option<(usize, ListKind)> {
    let depth = rp.find_ancestor(doc, |el| el.kind.is_list())?;
    let kind = ListKind::of(&rp.node(doc, depth)?.kind)?;
    Some((depth, kind))
}

pub fn list_active(doc: &Document, pos: usize, kind: ListKind) -> bool {
    doc.resolve(pos)
        .and_then(|rp| enclosing_list(doc, &rp))
        .is_some_and(|(_, k)| k == kind)
}

/// Wrap in a list, lift out of a list of the same kind, or convert a list of
/// another kind.
pub(crate) fn toggle_list(tr: &mut Transaction, kind: ListKind) -> bool {
    let doc = tr.doc().clone();
    let sel = tr.selection();
    let (Some(rf), Some(rt)) = (doc.resolve(sel.from()), doc.resolve(sel.to())) else {
        return false;
    };
    match enclosing_list(&doc, &rf) {
        Some((depth, current)) if current == kind => {
            let Some(list) = rf.node(&doc, depth) else {
                return false;
            };
            let first = rf.index_at(depth);
            let same_list = rt.depth() > depth && rt.path()[..depth] == rf.path()[..depth];
            let last = if same_list {
                rt.index_at(depth)
            } else {
                list.child_count().saturating_sub(1)
            };
            lift_list_items(tr, &doc, &rf, depth, first, last.max(first))
        }
        Some((depth, _)) => convert_list(tr, &doc, &rf, depth, kind),
        None => wrap_blocks(tr, kind.list_kind(), 1, |block| {
            if !block.is_textblock() {
                return None;
            }
            let paragraph = Node::element(
                NodeKind::Paragraph {
                    align: block.kind.align(),
                },
                block.content.clone(),
            );
            Some(Node::element(kind.item_kind(), vec![paragraph]))
        }),
    }
}

/// Lift items `first..=last` out of the list at `depth`. Items before and
/// after stay in lists of their own.
fn lift_list_items(
    tr: &mut Transaction,
    doc: &Document,
    rp: &ResolvedPos,
    depth: usize,
    first: usize,
    last: usize,
) -> bool {
    let (Some(list), Some(list_before)) = (rp.node(doc, depth), rp.before(depth)) else {
        return false;
    };
    if last >= list.child_count() {
        return false;
    }
    let start = rp.start(depth);
    let mut pieces = Vec::new();
    if first > 0 {
        pieces.push((
            Node::element(list.kind.clone(), list.content[..first].to_vec()),
            list_before,
        ));
    }
    for index in first..=last {
        let Some(item) = list.child_element(index) else {
            return false;
        };
        let item_before = start + list.child_offset(index);
        for (i, child) in item.content.iter().enumerate() {
            pieces.push((child.clone(), item_before + 1 + item.child_offset(i)));
        }
    }
    if last + 1 < list.child_count() {
        pieces.push((
            Node::element(list.kind.clone(), list.content[last + 1..].to_vec()),
            start + list.child_offset(last + 1) - 1,
        ));
    }
    replace_with_pieces(tr, doc, rp, depth, pieces)
}

/// Same-size rewrite of a list into another kind.
fn convert_list(
    tr: &mut Transaction,
    doc: &Document,
    rp: &ResolvedPos,
    depth: usize,
    kind: ListKind,
) -> bool {
    let (Some(list), Some(from), Some(to)) =
        (rp.node(doc, depth), rp.before(depth), rp.after(depth))
    else {
        return false;
    };
    let items = list
        .content
        .iter()
        .map(|n| match n {
            Node::Element(item) => Node::element(kind.item_kind(), item.content.clone()),
            other => other.clone(),
        })
        .collect();
    replace_or_warn(tr, from, to, vec![Node::element(kind.list_kind(), items)])
}

/// Flip `checked` on the task item around the caret.
pub(crate) fn toggle_task_item(tr: &mut Transaction) -> bool {
    let doc = tr.doc().clone();
    let Some(rp) = doc.resolve(tr.selection().head) else {
        return false;
    };
    let Some(depth) = rp.find_ancestor(&doc, |el| matches!(el.kind, NodeKind::TaskItem { .. }))
    else {
        return false;
    };
    let (Some(item), Some(from), Some(to)) =
        (rp.node(&doc, depth), rp.before(depth), rp.after(depth))
    else {
        return false;
    };
    let NodeKind::TaskItem { checked } = &item.kind else {
        return false;
    };
    let flipped = Node::element(NodeKind::TaskItem { checked: !*checked }, item.content.clone());
    replace_or_warn(tr, from, to, vec![flipped])
}

// === Text input ===

/// Marks for text typed at `pos`.
fn typing_marks(tr: &Transaction, tb: &TextblockRef, pos: usize) -> Vec<Mark> {
    if tb.is_code() {
        return Vec::new();
    }
    tr.stored_marks()
        .map(<[Mark]>::to_vec)
        .unwrap_or_else(|| tr.doc().marks_at(pos))
}

/// Insert text at the selection, replacing any selected content.
pub(crate) fn insert_text(tr: &mut Transaction, text: &str) -> bool {
    let sel = tr.selection();
    if text.is_empty() && sel.is_empty() {
        return false;
    }
    let Some(tb) = tr.doc().textblock_at(sel.from()) else {
        return false;
    };
    if sel.to() > tb.end {
        if !delete_selection(tr) {
            return false;
        }
        return text.is_empty() || insert_text(tr, text);
    }
    let marks = typing_marks(tr, &tb, sel.from());
    let slice = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::marked(text, marks)]
    };
    if !replace_or_warn(tr, sel.from(), sel.to(), slice) {
        return false;
    }
    tr.set_selection(Selection::collapsed(sel.from() + text.chars().count()));
    if !tb.is_code() {
        apply_fence_rule(tr, text);
    }
    true
}

/// "```lang" or "~~~lang". Outer `None` when the line is not a fence.
fn fence_language(line: &str) -> Option<Option<&str>> {
    let lang = line
        .strip_prefix("```")
        .or_else(|| line.strip_prefix("~~~"))?;
    if lang.is_empty() {
        return Some(None);
    }
    lang.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_'))
        .then_some(Some(lang))
}

/// A fence followed by whitespace turns the paragraph into a code block.
fn apply_fence_rule(tr: &mut Transaction, typed: &str) {
    let mut chars = typed.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return;
    };
    if !c.is_whitespace() {
        return;
    }
    let caret = tr.selection().head;
    let Some(tb) = tr.doc().textblock_at(caret) else {
        return;
    };
    if !matches!(tb.kind, NodeKind::Paragraph { .. }) {
        return;
    }
    let Some(text) = tr.doc().element_at(&tb.path).map(Element::text) else {
        return;
    };
    let offset = caret - tb.start;
    let before = char_slice(&text, 0, offset);
    let Some(line) = before.strip_suffix(c) else {
        return;
    };
    if let Some(language) = fence_language(line) {
        let rest = char_slice(&text, offset, usize::MAX).to_string();
        let language = language.map(str::to_string);
        convert_to_code(tr, &tb, language.as_deref(), rest);
    }
}

fn convert_to_code(
    tr: &mut Transaction,
    tb: &TextblockRef,
    language: Option<&str>,
    rest: String,
) -> bool {
    let content = if rest.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(rest)]
    };
    let node = Node::element(NodeKind::code_block(language), content);
    if !replace_or_warn(tr, tb.before, tb.after(), vec![node]) {
        return false;
    }
    tr.set_selection(Selection::collapsed(tb.start));
    true
}

/// Delete a range inside one textblock.
pub(crate) fn delete_range(tr: &mut Transaction, from: usize, to: usize) -> bool {
    if from >= to {
        return false;
    }
    let Some(tb) = tr.doc().textblock_at(from) else {
        return false;
    };
    if to > tb.end {
        return false;
    }
    if !replace_or_warn(tr, from, to, Vec::new()) {
        return false;
    }
    tr.set_selection(Selection::collapsed(from));
    true
}

/// Remove the selected content. Spans across top-level textblocks merge the
/// two ends into the first block.
pub(crate) fn delete_selection(tr: &mut Transaction) -> bool {
    let sel = tr.selection();
    if sel.is_empty() {
        return true;
    }
    let doc = tr.doc().clone();
    let (Some(first), Some(last)) = (doc.textblock_at(sel.from()), doc.textblock_at(sel.to()))
    else {
        return false;
    };
    if first.start == last.start {
        return delete_range(tr, sel.from(), sel.to());
    }
    if first.path.len() != 2 || last.path.len() != 2 {
        return false;
    }
    let (Some(left), Some(right)) = (doc.element_at(&first.path), doc.element_at(&last.path))
    else {
        return false;
    };
    let (keep_left, _) = split_inline(&left.content, sel.from() - first.start);
    let (_, keep_right) = split_inline(&right.content, sel.to() - last.start);
    let mut content = keep_left;
    content.extend(keep_right);
    let content = retarget_content(&left.kind, &normalize_inline(content));
    let merged = dblock(Node::element(left.kind.clone(), content));
    let root = doc.root();
    let from = root.child_offset(first.path[0]);
    let to = root.child_offset(last.path[0] + 1);
    if !replace_or_warn(tr, from, to, vec![merged]) {
        return false;
    }
    tr.set_selection(Selection::collapsed(sel.from()));
    true
}

/// Backspace.
pub(crate) fn delete_backward(tr: &mut Transaction) -> bool {
    let sel = tr.selection();
    if !sel.is_empty() {
        return delete_selection(tr);
    }
    let pos = sel.head;
    let Some(tb) = tr.doc().textblock_at(pos) else {
        return false;
    };
    if tb.is_code() && clear_code_block(tr) {
        return true;
    }
    if pos > tb.start {
        return delete_range(tr, pos - 1, pos);
    }
    join_backward(tr, pos)
}

/// Merge the textblock starting at `pos` into the block before it.
fn join_backward(tr: &mut Transaction, pos: usize) -> bool {
    let doc = tr.doc().clone();
    let Some(rp) = doc.resolve(pos) else {
        return false;
    };
    let depth = rp.depth();
    if depth < 2 {
        return false;
    }
    let (Some(current), Some(parent)) = (rp.parent(&doc), rp.node(&doc, depth - 1)) else {
        return false;
    };
    let index = rp.index_at(depth - 1);

    if parent.kind.is_list_item() && index == 0 && depth >= 3 {
        let list_depth = depth - 2;
        let item = rp.index_at(list_depth);
        return lift_list_items(tr, &doc, &rp, list_depth, item, item);
    }

    // Siblings to merge: wrappers at the root, textblocks elsewhere.
    let (container_depth, prev_index) = if parent.node_type() == NodeType::DBlock {
        (depth - 2, rp.index_at(depth - 2).checked_sub(1))
    } else {
        (depth - 1, index.checked_sub(1))
    };
    let Some(prev_index) = prev_index else {
        return false;
    };
    let Some(container) = rp.node(&doc, container_depth) else {
        return false;
    };
    let Some(prev_node) = container.child_element(prev_index) else {
        return false;
    };
    let wrapped = parent.node_type() == NodeType::DBlock;
    let prev = if wrapped {
        prev_node.child_element(0)
    } else {
        Some(prev_node)
    };
    let Some(prev) = prev else {
        return false;
    };
    let start = rp.start(container_depth);
    let from = start + container.child_offset(prev_index);
    let to = start + container.child_offset(prev_index + 2);

    if !prev.is_textblock() {
        // Only an empty block disappears into a structured neighbour.
        if !current.content.is_empty() {
            return false;
        }
        let before_current = start + container.child_offset(prev_index + 1);
        let after_current = start + container.child_offset(prev_index + 2);
        if !replace_or_warn(tr, before_current, after_current, Vec::new()) {
            return false;
        }
        let caret = nearest_caret(tr.doc(), before_current, -1);
        tr.set_selection(Selection::collapsed(caret));
        return true;
    }

    let mut content = prev.content.clone();
    content.extend(current.content.iter().cloned());
    let content = retarget_content(&prev.kind, &normalize_inline(content));
    let merged = Node::element(prev.kind.clone(), content);
    let merged = if wrapped { dblock(merged) } else { merged };
    if !replace_or_warn(tr, from, to, vec![merged]) {
        return false;
    }
    let caret = from + 1 + usize::from(wrapped) + prev.content_size();
    tr.set_selection(Selection::collapsed(caret));
    true
}

// === Splitting ===

/// Enter.
pub(crate) fn split_block(tr: &mut Transaction) -> bool {
    if !delete_selection(tr) {
        return false;
    }
    let doc = tr.doc().clone();
    let pos = tr.selection().head;
    let Some(tb) = doc.textblock_at(pos) else {
        return false;
    };
    if tb.is_code() {
        return code_block_enter(tr);
    }
    let (Some(rp), Some(el)) = (doc.resolve(pos), doc.element_at(&tb.path)) else {
        return false;
    };
    let offset = pos - tb.start;

    if matches!(tb.kind, NodeKind::Paragraph { .. }) {
        let text = el.text();
        if let Some(language) = fence_language(char_slice(&text, 0, offset)) {
            let rest = char_slice(&text, offset, usize::MAX).to_string();
            let language = language.map(str::to_string);
            return convert_to_code(tr, &tb, language.as_deref(), rest);
        }
    }

    let depth = rp.depth();
    let Some(parent) = rp.node(&doc, depth - 1) else {
        return false;
    };
    let first_in_item = parent.kind.is_list_item() && rp.index_at(depth - 1) == 0;
    if first_in_item && el.content.is_empty() && parent.child_count() == 1 && depth >= 3 {
        let list_depth = depth - 2;
        let item = rp.index_at(list_depth);
        return lift_list_items(tr, &doc, &rp, list_depth, item, item);
    }

    let marks = typing_marks(tr, &tb, pos);
    let (left, right) = split_inline(&el.content, offset);
    let right_kind = match &tb.kind {
        NodeKind::Heading { .. } if right.is_empty() => NodeKind::paragraph(),
        other => other.clone(),
    };
    let left = Node::element(tb.kind.clone(), left);
    let right = Node::element(right_kind, right);

    let (from, to, nodes, caret) = if first_in_item {
        let (Some(from), Some(to)) = (rp.before(depth - 1), rp.after(depth - 1)) else {
            return false;
        };
        let item_kind = match parent.kind {
            NodeKind::TaskItem { .. } => NodeKind::TaskItem { checked: false },
            _ => parent.kind.clone(),
        };
        let first = Node::element(parent.kind.clone(), vec![left]);
        let mut rest = vec![right];
        rest.extend(parent.content[1..].iter().cloned());
        let second = Node::element(item_kind, rest);
        let caret = from + first.node_size() + 2;
        (from, to, vec![first, second], caret)
    } else if parent.node_type() == NodeType::DBlock {
        let (Some(from), Some(to)) = (rp.before(depth - 1), rp.after(depth - 1)) else {
            return false;
        };
        let first = dblock(left);
        let caret = from + first.node_size() + 2;
        (from, to, vec![first, dblock(right)], caret)
    } else {
        let caret = tb.before + left.node_size() + 1;
        (tb.before, tb.after(), vec![left, right], caret)
    };
    if !replace_or_warn(tr, from, to, nodes) {
        return false;
    }
    tr.set_selection(Selection::collapsed(caret));
    if !marks.is_empty() {
        tr.set_stored_marks(Some(marks));
    }
    true
}

// === Code-block keys ===

/// Enter inside a code block: a newline, or leave the block on the third
/// Enter at its end.
fn code_block_enter(tr: &mut Transaction) -> bool {
    let pos = tr.selection().head;
    let Some(tb) = tr.doc().textblock_at(pos) else {
        return false;
    };
    let ends_blank = tr
        .doc()
        .element_at(&tb.path)
        .is_some_and(|el| el.text().ends_with("\n\n"));
    if pos == tb.end && ends_blank {
        if !replace_or_warn(tr, tb.end - 2, tb.end, Vec::new()) {
            return false;
        }
        return exit_code_block(tr);
    }
    insert_text(tr, "\n")
}

/// Put a fresh paragraph after the code block holding the caret.
pub(crate) fn exit_code_block(tr: &mut Transaction) -> bool {
    let sel = tr.selection();
    if !sel.is_empty() {
        return false;
    }
    let doc = tr.doc().clone();
    let Some(rp) = doc.resolve(sel.head) else {
        return false;
    };
    if !rp
        .parent(&doc)
        .is_some_and(|p| p.node_type() == NodeType::CodeBlock)
    {
        return false;
    }
    let depth = rp.depth();
    let in_dblock = rp
        .node(&doc, depth - 1)
        .is_some_and(|p| p.node_type() == NodeType::DBlock);
    let paragraph = Node::element(NodeKind::paragraph(), Vec::new());
    let (at, node, caret) = if in_dblock {
        let Some(at) = rp.after(depth - 1) else {
            return false;
        };
        (at, dblock(paragraph), at + 2)
    } else {
        let Some(at) = rp.after(depth) else {
            return false;
        };
        (at, paragraph, at + 1)
    };
    if !replace_or_warn(tr, at, at, vec![node]) {
        return false;
    }
    tr.set_selection(Selection::collapsed(caret));
    true
}

/// ArrowDown at the very end of a code block with nothing after it.
pub(crate) fn code_block_arrow_down(tr: &mut Transaction) -> bool {
    let sel = tr.selection();
    let Some(tb) = tr.doc().textblock_at(sel.head) else {
        return false;
    };
    if !sel.is_empty() || !tb.is_code() || sel.head != tb.end {
        return false;
    }
    let is_last = tr
        .doc()
        .textblocks()
        .last()
        .is_some_and(|last| last.start == tb.start);
    is_last && exit_code_block(tr)
}

/// Turn an empty code block, or one with the caret at the document start,
/// back into a paragraph.
pub(crate) fn clear_code_block(tr: &mut Transaction) -> bool {
    let sel = tr.selection();
    let Some(tb) = tr.doc().textblock_at(sel.head) else {
        return false;
    };
    if !sel.is_empty() || !tb.is_code() {
        return false;
    }
    let is_empty = tb.start == tb.end;
    let at_doc_start = sel.head == tb.start
        && tr
            .doc()
            .textblocks()
            .first()
            .is_some_and(|first| first.start == tb.start);
    if !is_empty && !at_doc_start {
        return false;
    }
    set_paragraph(tr)
}

/// Tab: two spaces inside a code block.
pub(crate) fn indent(tr: &mut Transaction) -> bool {
    let in_code = tr
        .doc()
        .textblock_at(tr.selection().from())
        .is_some_and(|tb| tb.is_code());
    in_code && insert_text(tr, "  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::serialize::text_content;
    use crate::state::EditorState;

    fn state(doc: Document, anchor: usize, head: usize) -> EditorState {
        EditorState::new(doc).with_selection(Selection::new(anchor, head))
    }

    fn run(s: &EditorState, f: impl FnOnce(&mut Transaction) -> bool) -> Option<EditorState> {
        let mut tr = s.transaction();
        f(&mut tr).then(|| s.apply(&tr))
    }

    #[test]
    fn test_toggle_heading_twice_returns_to_paragraph() {
        let s = state(doc(vec![p_text("title")]), 3, 3);
        let heading = run(&s, |tr| toggle_heading(tr, 2)).unwrap();
        assert_eq!(heading.doc, doc(vec![h(2, "title")]));
        let back = run(&heading, |tr| toggle_heading(tr, 2)).unwrap();
        assert_eq!(back.doc, s.doc);
        assert_eq!(back.selection, s.selection);
    }

    #[test]
    fn test_code_block_strips_marks() {
        let d = doc(vec![p(vec![
            Node::marked("let", vec![Mark::Bold]),
            Node::text(" x"),
        ])]);
        let s = state(d, 3, 3);
        let next = run(&s, |tr| set_code_block(tr, Some("rust"))).unwrap();
        assert_eq!(next.doc, doc(vec![code(Some("rust"), "let x")]));
    }

    #[test]
    fn test_list_toggle_round_trip() {
        let s = state(doc(vec![p_text("ab")]), 3, 3);
        let listed = run(&s, |tr| toggle_list(tr, ListKind::Bullet)).unwrap();
        assert_eq!(listed.doc, doc(vec![ul(vec![li(vec![p_text("ab")])])]));
        assert_eq!(listed.selection, Selection::collapsed(5));
        assert!(list_active(&listed.doc, 5, ListKind::Bullet));

        let lifted = run(&listed, |tr| toggle_list(tr, ListKind::Bullet)).unwrap();
        assert_eq!(lifted.doc, s.doc);
        assert_eq!(lifted.selection, Selection::collapsed(3));
    }

    #[test]
    fn test_list_kind_conversion_keeps_size() {
        let s = state(doc(vec![ul(vec![li(vec![p_text("a")])])]), 4, 4);
        let tasks = run(&s, |tr| toggle_list(tr, ListKind::Task)).unwrap();
        let list = tasks.doc.blocks().next().unwrap();
        assert_eq!(list.kind, NodeKind::TaskList);
        assert_eq!(tasks.doc.content_size(), s.doc.content_size());
        assert_eq!(tasks.selection, s.selection);

        let checked = run(&tasks, toggle_task_item).unwrap();
        let item = checked.doc.blocks().next().unwrap().child_element(0).unwrap();
        assert_eq!(item.kind, NodeKind::TaskItem { checked: true });
    }

    #[test]
    fn test_lift_middle_item_splits_list() {
        let d = doc(vec![ul(vec![
            li(vec![p_text("a")]),
            li(vec![p_text("b")]),
            li(vec![p_text("c")]),
        ])]);
        // "b" starts at 1 (dBlock) + 1 (ul) + 5 (first item) + 2.
        let s = state(d, 9, 9);
        let next = run(&s, |tr| toggle_list(tr, ListKind::Bullet)).unwrap();
        assert_eq!(
            next.doc,
            doc(vec![
                ul(vec![li(vec![p_text("a")])]),
                p_text("b"),
                ul(vec![li(vec![p_text("c")])]),
            ])
        );
        let tb = next.doc.textblock_at(next.selection.head).unwrap();
        assert_eq!(next.doc.element_at(&tb.path).unwrap().text(), "b");
    }

    #[test]
    fn test_blockquote_wrap_and_lift() {
        let s = state(doc(vec![p_text("one"), p_text("two")]), 3, 10);
        let quoted = run(&s, toggle_blockquote).unwrap();
        assert_eq!(
            quoted.doc,
            doc(vec![blockquote(vec![p_text("one"), p_text("two")])])
        );
        assert!(blockquote_active(&quoted.doc, quoted.selection.head));
        let lifted = run(&quoted, toggle_blockquote).unwrap();
        assert_eq!(lifted.doc, s.doc);
        assert_eq!(lifted.selection, s.selection);
    }

    #[test]
    fn test_split_paragraph_in_the_middle() {
        let s = state(doc(vec![p_text("hello")]), 4, 4);
        let next = run(&s, split_block).unwrap();
        assert_eq!(next.doc, doc(vec![p_text("he"), p_text("llo")]));
        assert_eq!(next.selection, Selection::collapsed(8));
    }

    #[test]
    fn test_split_heading_at_end_gives_paragraph() {
        let s = state(doc(vec![h(1, "T")]), 3, 3);
        let next = run(&s, split_block).unwrap();
        assert_eq!(next.doc, doc(vec![h(1, "T"), p_text("")]));
    }

    #[test]
    fn test_split_list_item_and_lift_empty_item() {
        let s = state(doc(vec![ul(vec![li(vec![p_text("ab")])])]), 6, 6);
        let split = run(&s, split_block).unwrap();
        assert_eq!(
            split.doc,
            doc(vec![ul(vec![li(vec![p_text("ab")]), li(vec![p_text("")])])])
        );
        let lifted = run(&split, split_block).unwrap();
        assert_eq!(
            lifted.doc,
            doc(vec![ul(vec![li(vec![p_text("ab")])]), p_text("")])
        );
    }

    #[test]
    fn test_fence_input_rule() {
        let s = state(doc(vec![p_text("```ts")]), 7, 7);
        let next = run(&s, |tr| insert_text(tr, " ")).unwrap();
        assert_eq!(next.doc, doc(vec![code(Some("ts"), "")]));
        assert_eq!(next.selection, Selection::collapsed(2));

        let s = state(doc(vec![p_text("~~~")]), 5, 5);
        let next = run(&s, split_block).unwrap();
        assert_eq!(next.doc, doc(vec![code(None, "")]));
    }

    #[test]
    fn test_insert_text_uses_stored_marks() {
        let mut s = state(doc(vec![p_text("a")]), 3, 3);
        s.stored_marks = Some(vec![Mark::Bold]);
        let next = run(&s, |tr| insert_text(tr, "b")).unwrap();
        assert_eq!(
            next.doc,
            doc(vec![p(vec![Node::text("a"), Node::marked("b", vec![Mark::Bold])])])
        );
        assert_eq!(next.selection, Selection::collapsed(4));
        assert_eq!(next.stored_marks, None);
    }

    #[test]
    fn test_triple_enter_exits_code_block() {
        let s = state(doc(vec![code(None, "x")]), 3, 3);
        let one = run(&s, split_block).unwrap();
        let two = run(&one, split_block).unwrap();
        assert_eq!(two.doc, doc(vec![code(None, "x\n\n")]));
        let three = run(&two, split_block).unwrap();
        assert_eq!(three.doc, doc(vec![code(None, "x"), p_text("")]));
        assert!(three.doc.textblock_at(three.selection.head).is_some_and(|tb| !tb.is_code()));
    }

    #[test]
    fn test_arrow_down_exits_only_at_last_block_end() {
        let s = state(doc(vec![code(None, "ab")]), 4, 4);
        let next = run(&s, code_block_arrow_down).unwrap();
        assert_eq!(next.doc, doc(vec![code(None, "ab"), p_text("")]));

        let s = state(doc(vec![code(None, "ab"), p_text("")]), 4, 4);
        assert!(run(&s, code_block_arrow_down).is_none());
    }

    #[test]
    fn test_backspace_clears_code_block() {
        let s = state(doc(vec![p_text("a"), code(Some("py"), "")]), 7, 7);
        let next = run(&s, delete_backward).unwrap();
        assert_eq!(next.doc, doc(vec![p_text("a"), p_text("")]));
    }

    #[test]
    fn test_backspace_joins_paragraphs() {
        let s = state(doc(vec![p_text("ab"), p_text("cd")]), 8, 8);
        let next = run(&s, delete_backward).unwrap();
        assert_eq!(next.doc, doc(vec![p_text("abcd")]));
        assert_eq!(next.selection, Selection::collapsed(4));
    }

    #[test]
    fn test_delete_across_blocks_merges() {
        let s = state(doc(vec![p_text("abc"), p_text("def")]), 3, 11);
        let next = run(&s, delete_selection).unwrap();
        assert_eq!(text_content(&next.doc), "af");
        assert_eq!(next.selection, Selection::collapsed(3));
    }

    #[test]
    fn test_tab_indents_only_in_code() {
        let s = state(doc(vec![code(None, "x")]), 2, 2);
        let next = run(&s, indent).unwrap();
        assert_eq!(next.doc, doc(vec![code(None, "  x")]));
        let s = state(doc(vec![p_text("x")]), 2, 2);
        assert!(run(&s, indent).is_none());
    }
}
