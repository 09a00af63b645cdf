//! Node vocabulary and structural rules.
//!
//! `spec_for` is the table keyed by node type that the serializer, the
//! plain-text extractor and the schema checker all dispatch through.

use crate::model::{Element, Node, NodeType};

/// What an element may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// One or more movable wrappers.
    DBlocks,
    /// Exactly one block.
    SingleBlock,
    /// Text leaves, with marks.
    Inline,
    /// Text leaves, no marks.
    PlainText,
    /// One or more blocks.
    Blocks,
    /// A paragraph followed by any blocks.
    ParagraphThenBlocks,
    /// One or more children of a single type.
    OneOrMore(NodeType),
    /// One or more table cells of either kind.
    Cells,
}

/// Static description of a node type.
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    pub name: &'static str,
    /// HTML element name for the opening tag.
    pub tag: &'static str,
    pub content: ContentRule,
    pub is_block: bool,
}

pub fn spec_for(ty: NodeType) -> NodeSpec {
    use ContentRule::*;
    let (name, tag, content, is_block) = match ty {
        NodeType::Doc => ("doc", "", DBlocks, false),
        NodeType::DBlock => ("dBlock", "div", SingleBlock, false),
        NodeType::Paragraph => ("paragraph", "p", Inline, true),
        NodeType::Heading => ("heading", "h", Inline, true),
        NodeType::BulletList => ("bulletList", "ul", OneOrMore(NodeType::ListItem), true),
        NodeType::OrderedList => ("orderedList", "ol", OneOrMore(NodeType::ListItem), true),
        NodeType::ListItem => ("listItem", "li", ParagraphThenBlocks, false),
        NodeType::TaskList => ("taskList", "ul", OneOrMore(NodeType::TaskItem), true),
        NodeType::TaskItem => ("taskItem", "li", ParagraphThenBlocks, false),
        NodeType::Blockquote => ("blockquote", "blockquote", Blocks, true),
        NodeType::CodeBlock => ("codeBlock", "pre", PlainText, true),
        NodeType::Table => ("table", "table", OneOrMore(NodeType::TableRow), true),
        NodeType::TableRow => ("tableRow", "tr", Cells, false),
        NodeType::TableCell => ("tableCell", "td", Blocks, false),
        NodeType::TableHeader => ("tableHeader", "th", Blocks, false),
    };
    NodeSpec {
        name,
        tag,
        content,
        is_block,
    }
}

/// Look a node type up by its name.
pub fn node_type_by_name(name: &str) -> Option<NodeType> {
    ALL_TYPES.iter().copied().find(|ty| spec_for(*ty).name == name)
}

const ALL_TYPES: [NodeType; 15] = [
    NodeType::Doc,
    NodeType::DBlock,
    NodeType::Paragraph,
    NodeType::Heading,
    NodeType::BulletList,
    NodeType::OrderedList,
    NodeType::ListItem,
    NodeType::TaskList,
    NodeType::TaskItem,
    NodeType::Blockquote,
    NodeType::CodeBlock,
    NodeType::Table,
    NodeType::TableRow,
    NodeType::TableCell,
    NodeType::TableHeader,
];

/// A structural rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub parent: &'static str,
    pub reason: &'static str,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.parent, self.reason)
    }
}

/// Check an element's direct content against its rule.
pub fn check_content(el: &Element) -> Result<(), Violation> {
    let spec = spec_for(el.node_type());
    let fail = |reason| {
        Err(Violation {
            parent: spec.name,
            reason,
        })
    };
    let children = &el.content;
    let block_child = |n: &Node| n.as_element().is_some_and(|c| spec_for(c.node_type()).is_block);
    match spec.content {
        ContentRule::DBlocks => {
            if children.is_empty() {
                return fail("needs at least one block");
            }
            if !children
                .iter()
                .all(|n| n.as_element().is_some_and(|c| c.node_type() == NodeType::DBlock))
            {
                return fail("top-level blocks must be wrapped");
            }
        }
        ContentRule::SingleBlock => {
            if children.len() != 1 || !block_child(&children[0]) {
                return fail("must hold exactly one block");
            }
        }
        ContentRule::Inline => {
            if !children.iter().all(Node::is_text) {
                return fail("may only hold text");
            }
        }
        ContentRule::PlainText => {
            if !children
                .iter()
                .all(|n| n.as_text().is_some_and(|t| t.marks.is_empty()))
            {
                return fail("may only hold unmarked text");
            }
        }
        ContentRule::Blocks => {
            if children.is_empty() || !children.iter().all(block_child) {
                return fail("needs one or more blocks");
            }
            if el.kind.is_cell()
                && children
                    .iter()
                    .any(|n| n.as_element().is_some_and(|c| c.node_type() == NodeType::Table))
            {
                return fail("tables cannot nest");
            }
        }
        ContentRule::ParagraphThenBlocks => {
            let first_is_paragraph = children
                .first()
                .and_then(Node::as_element)
                .is_some_and(|c| c.node_type() == NodeType::Paragraph);
            if !first_is_paragraph {
                return fail("must start with a paragraph");
            }
            if !children.iter().all(block_child) {
                return fail("may only hold blocks");
            }
        }
        ContentRule::OneOrMore(ty) => {
            if children.is_empty()
                || !children
                    .iter()
                    .all(|n| n.as_element().is_some_and(|c| c.node_type() == ty))
            {
                return fail("holds the wrong kind of children");
            }
        }
        ContentRule::Cells => {
            if children.is_empty()
                || !children
                    .iter()
                    .all(|n| n.as_element().is_some_and(|c| c.kind.is_cell()))
            {
                return fail("rows may only hold cells");
            }
        }
    }
    Ok(())
}

/// Check an element and all of its descendants.
pub fn check_deep(el: &Element) -> Result<(), Violation> {
    check_content(el)?;
    for child in &el.content {
        if let Node::Element(child) = child {
            check_deep(child)?;
        }
    }
    Ok(())
}
