//! Document tree: nodes, marks, attributes and position resolution.
//!
//! Positions address the flattened document. Entering or leaving an element
//! costs one position, every character costs one position, and position 0 is
//! the start of the root's content.

use smol_str::SmolStr;

/// Paragraph and heading alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// Span attributes shared by body and header cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAttrs {
    pub colspan: usize,
    pub rowspan: usize,
}

impl CellAttrs {
    /// Span limits browsers apply to table cells.
    pub const MAX_COLSPAN: usize = 1000;
    pub const MAX_ROWSPAN: usize = 65534;
}

impl Default for CellAttrs {
    fn default() -> Self {
        Self {
            colspan: 1,
            rowspan: 1,
        }
    }
}

/// Type tag of an element, without attributes.
///
/// Used as the dispatch key for schema rules, serializers and decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Doc,
    DBlock,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    Blockquote,
    CodeBlock,
    Table,
    TableRow,
    TableCell,
    TableHeader,
}

/// Element type together with its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Doc,
    /// Movable wrapper around every top-level block.
    DBlock,
    Paragraph {
        align: Option<TextAlign>,
    },
    Heading {
        level: u8,
        align: Option<TextAlign>,
    },
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem {
        checked: bool,
    },
    Blockquote,
    /// `None` means the language is auto-detected.
    CodeBlock {
        language: Option<SmolStr>,
    },
    Table,
    TableRow,
    TableCell(CellAttrs),
    TableHeader(CellAttrs),
}

impl NodeKind {
    pub fn paragraph() -> Self {
        NodeKind::Paragraph { align: None }
    }

    pub fn heading(level: u8) -> Self {
        NodeKind::Heading {
            level: level.clamp(1, 6),
            align: None,
        }
    }

    pub fn code_block(language: Option<&str>) -> Self {
        NodeKind::CodeBlock {
            language: language
                .map(str::trim)
                .filter(|l| !l.is_empty() && *l != "auto")
                .map(SmolStr::new),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Doc => NodeType::Doc,
            NodeKind::DBlock => NodeType::DBlock,
            NodeKind::Paragraph { .. } => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::BulletList => NodeType::BulletList,
            NodeKind::OrderedList => NodeType::OrderedList,
            NodeKind::ListItem => NodeType::ListItem,
            NodeKind::TaskList => NodeType::TaskList,
            NodeKind::TaskItem { .. } => NodeType::TaskItem,
            NodeKind::Blockquote => NodeType::Blockquote,
            NodeKind::CodeBlock { .. } => NodeType::CodeBlock,
            NodeKind::Table => NodeType::Table,
            NodeKind::TableRow => NodeType::TableRow,
            NodeKind::TableCell(_) => NodeType::TableCell,
            NodeKind::TableHeader(_) => NodeType::TableHeader,
        }
    }

    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph { .. } | NodeKind::Heading { .. } | NodeKind::CodeBlock { .. }
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeKind::BulletList | NodeKind::OrderedList | NodeKind::TaskList
        )
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, NodeKind::ListItem | NodeKind::TaskItem { .. })
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, NodeKind::TableCell(_) | NodeKind::TableHeader(_))
    }

    pub fn align(&self) -> Option<TextAlign> {
        match self {
            NodeKind::Paragraph { align } | NodeKind::Heading { align, .. } => *align,
            _ => None,
        }
    }

    pub fn cell_attrs(&self) -> Option<CellAttrs> {
        match self {
            NodeKind::TableCell(attrs) | NodeKind::TableHeader(attrs) => Some(*attrs),
            _ => None,
        }
    }
}

/// Kind of inline mark, in nesting order (outermost first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkType {
    Link,
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

impl MarkType {
    pub fn name(&self) -> &'static str {
        match self {
            MarkType::Link => "link",
            MarkType::Bold => "bold",
            MarkType::Italic => "italic",
            MarkType::Underline => "underline",
            MarkType::Strike => "strike",
            MarkType::Code => "code",
        }
    }
}

/// An inline mark applied to a text leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    Link { href: SmolStr },
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

impl Mark {
    pub fn link(href: impl Into<SmolStr>) -> Self {
        Mark::Link { href: href.into() }
    }

    pub fn mark_type(&self) -> MarkType {
        match self {
            Mark::Link { .. } => MarkType::Link,
            Mark::Bold => MarkType::Bold,
            Mark::Italic => MarkType::Italic,
            Mark::Underline => MarkType::Underline,
            Mark::Strike => MarkType::Strike,
            Mark::Code => MarkType::Code,
        }
    }

    /// Whether this mark cannot coexist with a mark of `other` type.
    ///
    /// Inline code excludes every other mark.
    pub fn excludes(&self, other: MarkType) -> bool {
        self.mark_type() == other || self.mark_type() == MarkType::Code || other == MarkType::Code
    }

    /// Add this mark to a sorted mark set, replacing anything it excludes.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut out: Vec<Mark> = set
            .iter()
            .filter(|m| !self.excludes(m.mark_type()))
            .cloned()
            .collect();
        out.push(self.clone());
        out.sort_by_key(|m| m.mark_type());
        out
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }
}

pub fn remove_mark_type(set: &[Mark], ty: MarkType) -> Vec<Mark> {
    set.iter().filter(|m| m.mark_type() != ty).cloned().collect()
}

pub fn has_mark_type(set: &[Mark], ty: MarkType) -> bool {
    set.iter().any(|m| m.mark_type() == ty)
}

/// A text leaf. Never empty inside a normalized document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextNode {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn with_marks(text: impl Into<String>, mut marks: Vec<Mark>) -> Self {
        marks.sort_by_key(|m| m.mark_type());
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Slice by character offsets.
    pub fn slice(&self, start: usize, end: usize) -> TextNode {
        TextNode {
            text: char_slice(&self.text, start, end).to_string(),
            marks: self.marks.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    pub kind: NodeKind,
    pub content: Vec<Node>,
}

impl Element {
    pub fn new(kind: NodeKind, content: Vec<Node>) -> Self {
        Self { kind, content }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    pub fn node_size(&self) -> usize {
        self.content_size() + 2
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    /// Concatenated text of every descendant leaf.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.content, &mut out);
        out
    }

    /// Offset of child `index` from the start of this element's content.
    pub fn child_offset(&self, index: usize) -> usize {
        self.content[..index.min(self.content.len())]
            .iter()
            .map(Node::node_size)
            .sum()
    }

    pub fn child_element(&self, index: usize) -> Option<&Element> {
        self.content.get(index).and_then(Node::as_element)
    }

    /// A textblock with no text, or a container holding only such a block.
    pub fn is_empty_block(&self) -> bool {
        if self.is_textblock() {
            return self.content.is_empty();
        }
        match self.content.as_slice() {
            [] => true,
            [Node::Element(only)] => only.is_empty_block(),
            _ => false,
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) => collect_text(&el.content, out),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Element(Element),
    Text(TextNode),
}

impl Node {
    pub fn element(kind: NodeKind, content: Vec<Node>) -> Self {
        Node::Element(Element::new(kind, content))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode::new(text))
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(TextNode::with_marks(text, marks))
    }

    pub fn node_size(&self) -> usize {
        match self {
            Node::Element(el) => el.node_size(),
            Node::Text(t) => t.len_chars(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }
}

/// Shorthand constructors used by commands and tests.
pub mod build {
    use super::*;

    pub fn doc(blocks: Vec<Node>) -> Document {
        Document::new(Element::new(
            NodeKind::Doc,
            blocks.into_iter().map(dblock).collect(),
        ))
    }

    pub fn dblock(block: Node) -> Node {
        Node::element(NodeKind::DBlock, vec![block])
    }

    pub fn p(content: Vec<Node>) -> Node {
        Node::element(NodeKind::paragraph(), content)
    }

    pub fn p_text(text: &str) -> Node {
        if text.is_empty() {
            p(vec![])
        } else {
            p(vec![Node::text(text)])
        }
    }

    pub fn h(level: u8, text: &str) -> Node {
        let content = if text.is_empty() {
            vec![]
        } else {
            vec![Node::text(text)]
        };
        Node::element(NodeKind::heading(level), content)
    }

    pub fn code(language: Option<&str>, text: &str) -> Node {
        let content = if text.is_empty() {
            vec![]
        } else {
            vec![Node::text(text)]
        };
        Node::element(NodeKind::code_block(language), content)
    }

    pub fn ul(items: Vec<Node>) -> Node {
        Node::element(NodeKind::BulletList, items)
    }

    pub fn li(content: Vec<Node>) -> Node {
        Node::element(NodeKind::ListItem, content)
    }

    pub fn blockquote(content: Vec<Node>) -> Node {
        Node::element(NodeKind::Blockquote, content)
    }

    pub fn table(rows: Vec<Vec<Node>>) -> Node {
        Node::element(
            NodeKind::Table,
            rows.into_iter()
                .map(|cells| Node::element(NodeKind::TableRow, cells))
                .collect(),
        )
    }

    pub fn td(text: &str) -> Node {
        Node::element(NodeKind::TableCell(CellAttrs::default()), vec![p_text(text)])
    }

    pub fn th(text: &str) -> Node {
        Node::element(
            NodeKind::TableHeader(CellAttrs::default()),
            vec![p_text(text)],
        )
    }
}

/// The root of a document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    root: Element,
}

impl Default for Document {
    fn default() -> Self {
        build::doc(vec![build::p(vec![])])
    }
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    pub fn content_size(&self) -> usize {
        self.root.content_size()
    }

    /// The top-level blocks, unwrapped from their movable wrappers.
    pub fn blocks(&self) -> impl Iterator<Item = &Element> {
        self.root.content.iter().filter_map(|n| {
            let wrapper = n.as_element()?;
            match wrapper.node_type() {
                NodeType::DBlock => wrapper.child_element(0),
                _ => Some(wrapper),
            }
        })
    }

    /// Element reached by following child indices from the root.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut node = &self.root;
        for &index in path {
            node = node.child_element(index)?;
        }
        Some(node)
    }

    /// Resolve a position to its ancestor path.
    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        if pos > self.root.content_size() {
            return None;
        }
        let mut path = Vec::new();
        let mut starts = vec![0];
        let mut ends = vec![self.root.content_size()];
        let mut node = &self.root;
        let mut start = 0;
        loop {
            let offset = pos - start;
            let mut cum = 0;
            let mut descend = None;
            let mut index = node.content.len();
            let mut text_offset = 0;
            for (i, child) in node.content.iter().enumerate() {
                let size = child.node_size();
                if offset == cum {
                    index = i;
                    break;
                }
                if offset < cum + size {
                    match child {
                        Node::Text(_) => {
                            index = i;
                            text_offset = offset - cum;
                        }
                        Node::Element(el) => descend = Some((i, el, start + cum + 1)),
                    }
                    break;
                }
                cum += size;
            }
            match descend {
                Some((i, el, child_start)) => {
                    path.push(i);
                    starts.push(child_start);
                    ends.push(child_start + el.content_size());
                    node = el;
                    start = child_start;
                }
                None => {
                    return Some(ResolvedPos {
                        pos,
                        path,
                        starts,
                        ends,
                        index,
                        text_offset,
                    });
                }
            }
        }
    }

    /// Visit every element with the position directly before it and its path.
    ///
    /// Returning `false` from the callback skips that element's children.
    pub fn descendants(&self, mut f: impl FnMut(&Element, usize, &[usize]) -> bool) {
        fn go(
            el: &Element,
            start: usize,
            path: &mut Vec<usize>,
            f: &mut impl FnMut(&Element, usize, &[usize]) -> bool,
        ) {
            let mut pos = start;
            for (i, child) in el.content.iter().enumerate() {
                if let Node::Element(child_el) = child {
                    path.push(i);
                    if f(child_el, pos, path) {
                        go(child_el, pos + 1, path, f);
                    }
                    path.pop();
                }
                pos += child.node_size();
            }
        }
        go(&self.root, 0, &mut Vec::new(), &mut f);
    }

    /// Every textblock in document order.
    pub fn textblocks(&self) -> Vec<TextblockRef> {
        let mut out = Vec::new();
        self.descendants(|el, pos, path| {
            if el.is_textblock() {
                out.push(TextblockRef {
                    before: pos,
                    start: pos + 1,
                    end: pos + 1 + el.content_size(),
                    path: path.to_vec(),
                    kind: el.kind.clone(),
                });
                false
            } else {
                true
            }
        });
        out
    }

    /// Textblocks overlapping `from..=to`.
    pub fn textblocks_between(&self, from: usize, to: usize) -> Vec<TextblockRef> {
        self.textblocks()
            .into_iter()
            .filter(|tb| tb.end >= from && tb.start <= to)
            .collect()
    }

    /// The textblock whose content contains `pos`.
    pub fn textblock_at(&self, pos: usize) -> Option<TextblockRef> {
        let rp = self.resolve(pos)?;
        let parent = rp.parent(self)?;
        if !parent.is_textblock() {
            return None;
        }
        Some(TextblockRef {
            before: rp.before(rp.depth())?,
            start: rp.start(rp.depth()),
            end: rp.end(rp.depth()),
            path: rp.path.clone(),
            kind: parent.kind.clone(),
        })
    }

    /// Marks that text inserted at `pos` would inherit.
    pub fn marks_at(&self, pos: usize) -> Vec<Mark> {
        let Some(rp) = self.resolve(pos) else {
            return Vec::new();
        };
        let Some(parent) = rp.parent(self) else {
            return Vec::new();
        };
        if rp.text_offset > 0 {
            if let Some(Node::Text(t)) = parent.content.get(rp.index) {
                return t.marks.clone();
            }
        }
        let before = rp.index.checked_sub(1).and_then(|i| parent.content.get(i));
        let after = parent.content.get(rp.index);
        match (before, after) {
            (Some(Node::Text(t)), _) => t.marks.clone(),
            (None, Some(Node::Text(t))) => t.marks.clone(),
            _ => Vec::new(),
        }
    }

    /// Rebuild the tree with the element at `path` replaced.
    pub fn with_element_at(&self, path: &[usize], replacement: Element) -> Option<Document> {
        fn go(el: &Element, path: &[usize], replacement: Element) -> Option<Element> {
            match path.split_first() {
                None => Some(replacement),
                Some((&index, rest)) => {
                    let child = el.child_element(index)?;
                    let new_child = go(child, rest, replacement)?;
                    let mut content = el.content.clone();
                    content[index] = Node::Element(new_child);
                    Some(Element::new(el.kind.clone(), content))
                }
            }
        }
        go(&self.root, path, replacement).map(Document::new)
    }
}

/// Location of a textblock inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextblockRef {
    /// Position directly before the textblock.
    pub before: usize,
    /// Start of its content.
    pub start: usize,
    /// End of its content.
    pub end: usize,
    pub path: Vec<usize>,
    pub kind: NodeKind,
}

impl TextblockRef {
    pub fn is_code(&self) -> bool {
        self.kind.node_type() == NodeType::CodeBlock
    }

    pub fn after(&self) -> usize {
        self.end + 1
    }
}

/// A position resolved against a document.
///
/// Depth 0 is the root; `depth()` is the depth of the innermost element
/// containing the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    path: Vec<usize>,
    starts: Vec<usize>,
    ends: Vec<usize>,
    /// Index of the child at or after the position, within the parent.
    pub index: usize,
    /// Character offset into the text leaf at `index`, if inside one.
    pub text_offset: usize,
}

impl ResolvedPos {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Child indices leading from the root to the parent.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn node<'a>(&self, doc: &'a Document, depth: usize) -> Option<&'a Element> {
        doc.element_at(&self.path[..depth.min(self.path.len())])
    }

    pub fn parent<'a>(&self, doc: &'a Document) -> Option<&'a Element> {
        self.node(doc, self.depth())
    }

    pub fn start(&self, depth: usize) -> usize {
        self.starts[depth.min(self.starts.len() - 1)]
    }

    pub fn end(&self, depth: usize) -> usize {
        self.ends[depth.min(self.ends.len() - 1)]
    }

    /// Position directly before the node at `depth`. None for the root.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 || depth > self.depth() {
            return None;
        }
        Some(self.starts[depth] - 1)
    }

    /// Position directly after the node at `depth`. None for the root.
    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 || depth > self.depth() {
            return None;
        }
        Some(self.ends[depth] + 1)
    }

    /// Index of the node at `depth + 1` within the node at `depth`.
    pub fn index_at(&self, depth: usize) -> usize {
        if depth < self.path.len() {
            self.path[depth]
        } else {
            self.index
        }
    }

    pub fn parent_offset(&self) -> usize {
        self.pos - self.start(self.depth())
    }

    /// Innermost depth whose node matches the predicate.
    pub fn find_ancestor(
        &self,
        doc: &Document,
        mut pred: impl FnMut(&Element) -> bool,
    ) -> Option<usize> {
        (0..=self.depth())
            .rev()
            .find(|&d| self.node(doc, d).is_some_and(&mut pred))
    }
}

/// Slice a string by character offsets.
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let mut indices = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
    let byte_start = indices.clone().nth(start).unwrap_or(s.len());
    let byte_end = indices.nth(end).unwrap_or(s.len()).max(byte_start);
    &s[byte_start..byte_end]
}

/// Merge adjacent text leaves with equal marks and drop empty ones.
pub fn normalize_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) if t.text.is_empty() => {}
            Node::Text(t) => {
                if let Some(Node::Text(prev)) = out.last_mut() {
                    if prev.marks == t.marks {
                        prev.text.push_str(&t.text);
                        continue;
                    }
                }
                out.push(Node::Text(t));
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn test_node_sizes() {
        let d = doc(vec![p_text("ab"), p_text("")]);
        // dBlock(p("ab")) = 1 + (1 + 2 + 1) + 1
        assert_eq!(d.content_size(), 6 + 4);
    }

    #[test]
    fn test_resolve_inside_text() {
        let d = doc(vec![p_text("hello")]);
        let rp = d.resolve(4).unwrap();
        assert_eq!(rp.depth(), 2);
        assert_eq!(rp.parent_offset(), 2);
        assert_eq!(rp.text_offset, 2);
        assert_eq!(rp.before(1), Some(0));
        assert_eq!(rp.after(1), Some(9));
        assert!(rp.parent(&d).unwrap().is_textblock());
    }

    #[test]
    fn test_resolve_between_blocks() {
        let d = doc(vec![p_text("a"), p_text("b")]);
        let rp = d.resolve(5).unwrap();
        assert_eq!(rp.depth(), 0);
        assert_eq!(rp.index, 1);
        assert!(d.resolve(d.content_size() + 1).is_none());
    }

    #[test]
    fn test_textblocks_in_order() {
        let d = doc(vec![p_text("one"), ul(vec![li(vec![p_text("two")])])]);
        let blocks = d.textblocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start, 2);
        assert_eq!(blocks[1].start, 2 + 3 + 2 + 4);
    }

    #[test]
    fn test_marks_at_prefers_text_before() {
        let d = doc(vec![p(vec![
            Node::marked("bold", vec![Mark::Bold]),
            Node::text("plain"),
        ])]);
        assert_eq!(d.marks_at(6), vec![Mark::Bold]);
        assert_eq!(d.marks_at(2), vec![Mark::Bold]);
        assert!(d.marks_at(8).is_empty());
    }

    #[test]
    fn test_code_mark_excludes_others() {
        let set = Mark::Code.add_to_set(&[Mark::Bold, Mark::Italic]);
        assert_eq!(set, vec![Mark::Code]);
        let set = Mark::Bold.add_to_set(&[Mark::link("https://a.b"), Mark::Italic]);
        assert_eq!(set, vec![Mark::link("https://a.b"), Mark::Bold, Mark::Italic]);
    }

    #[test]
    fn test_char_slice_multibyte() {
        assert_eq!(char_slice("héllo", 1, 3), "él");
        assert_eq!(char_slice("abc", 2, 10), "c");
    }
}
