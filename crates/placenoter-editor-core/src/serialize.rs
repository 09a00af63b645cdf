//! Document serialization: HTML for persistence, plain text for search and
//! previews.
//!
//! Both serializers are `NodeVisitor`s driven by [`walk`], which also backs
//! the decoration passes in `search` and `highlight`.

use pulldown_cmark_escape::{escape_href, escape_html};

use crate::model::{Document, Element, Mark, Node, NodeKind, NodeType, TextNode};
use crate::schema::spec_for;

/// Separator placed between textblocks in plain-text output.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Callbacks for a depth-first document walk.
///
/// `pos` is the position directly before an element, or the position of
/// the first character of a text leaf.
pub trait NodeVisitor {
    /// Return `false` to skip the element's children (`leave` still runs).
    fn enter(&mut self, _el: &Element, _pos: usize) -> bool {
        true
    }

    fn leave(&mut self, _el: &Element, _pos: usize) {}

    fn text(&mut self, _text: &TextNode, _pos: usize) {}
}

/// Walk the document's content in order.
pub fn walk<V: NodeVisitor + ?Sized>(doc: &Document, visitor: &mut V) {
    walk_content(&doc.root().content, 0, visitor);
}

fn walk_content<V: NodeVisitor + ?Sized>(nodes: &[Node], start: usize, visitor: &mut V) {
    let mut pos = start;
    for node in nodes {
        match node {
            Node::Text(t) => visitor.text(t, pos),
            Node::Element(el) => {
                if visitor.enter(el, pos) {
                    walk_content(&el.content, pos + 1, visitor);
                }
                visitor.leave(el, pos);
            }
        }
        pos += node.node_size();
    }
}

/// Serialize to the persisted HTML form.
pub fn to_html(doc: &Document) -> String {
    let mut writer = HtmlWriter::default();
    walk(doc, &mut writer);
    writer.out
}

/// Extract plain text: textblocks joined by a blank line.
pub fn text_content(doc: &Document) -> String {
    let mut extractor = TextExtractor::default();
    walk(doc, &mut extractor);
    extractor.blocks.join(BLOCK_SEPARATOR)
}

#[derive(Default)]
struct HtmlWriter {
    out: String,
}

impl HtmlWriter {
    fn open_tag(&mut self, el: &Element) {
        let spec = spec_for(el.node_type());
        match &el.kind {
            NodeKind::DBlock => self.out.push_str("<div data-type=\"d-block\">"),
            NodeKind::Paragraph { align } => {
                self.out.push_str("<p");
                push_align(&mut self.out, *align);
                self.out.push('>');
            }
            NodeKind::Heading { level, align } => {
                self.out.push_str(&format!("<h{level}"));
                push_align(&mut self.out, *align);
                self.out.push('>');
            }
            NodeKind::TaskList => self.out.push_str("<ul data-type=\"taskList\">"),
            NodeKind::TaskItem { checked } => self.out.push_str(&format!(
                "<li data-type=\"taskItem\" data-checked=\"{checked}\">"
            )),
            NodeKind::CodeBlock { language } => match language {
                Some(lang) => {
                    self.out.push_str("<pre><code class=\"language-");
                    push_escaped(&mut self.out, lang);
                    self.out.push_str("\">");
                }
                None => self.out.push_str("<pre><code>"),
            },
            NodeKind::Table => self.out.push_str("<table><tbody>"),
            NodeKind::TableCell(attrs) | NodeKind::TableHeader(attrs) => {
                self.out.push('<');
                self.out.push_str(spec.tag);
                if attrs.colspan > 1 {
                    self.out.push_str(&format!(" colspan=\"{}\"", attrs.colspan));
                }
                if attrs.rowspan > 1 {
                    self.out.push_str(&format!(" rowspan=\"{}\"", attrs.rowspan));
                }
                self.out.push('>');
            }
            _ => {
                self.out.push('<');
                self.out.push_str(spec.tag);
                self.out.push('>');
            }
        }
    }

    fn close_tag(&mut self, el: &Element) {
        match &el.kind {
            NodeKind::Doc => {}
            NodeKind::Heading { level, .. } => self.out.push_str(&format!("</h{level}>")),
            NodeKind::CodeBlock { .. } => self.out.push_str("</code></pre>"),
            NodeKind::Table => self.out.push_str("</tbody></table>"),
            _ => {
                self.out.push_str("</");
                self.out.push_str(spec_for(el.node_type()).tag);
                self.out.push('>');
            }
        }
    }
}

fn push_align(out: &mut String, align: Option<crate::model::TextAlign>) {
    if let Some(align) = align {
        out.push_str(&format!(" style=\"text-align: {}\"", align.as_str()));
    }
}

impl NodeVisitor for HtmlWriter {
    fn enter(&mut self, el: &Element, _pos: usize) -> bool {
        if el.node_type() != NodeType::Doc {
            self.open_tag(el);
        }
        true
    }

    fn leave(&mut self, el: &Element, _pos: usize) {
        self.close_tag(el);
    }

    fn text(&mut self, text: &TextNode, _pos: usize) {
        for mark in &text.marks {
            open_mark(&mut self.out, mark);
        }
        push_escaped(&mut self.out, &text.text);
        for mark in text.marks.iter().rev() {
            self.out.push_str(close_mark(mark));
        }
    }
}

fn open_mark(out: &mut String, mark: &Mark) {
    match mark {
        Mark::Link { href } => {
            out.push_str("<a target=\"_blank\" rel=\"noopener noreferrer nofollow\" href=\"");
            push_escaped_href(out, href);
            out.push_str("\">");
        }
        Mark::Bold => out.push_str("<strong>"),
        Mark::Italic => out.push_str("<em>"),
        Mark::Underline => out.push_str("<u>"),
        Mark::Strike => out.push_str("<s>"),
        Mark::Code => out.push_str("<code>"),
    }
}

fn close_mark(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "</a>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
    }
}

/// Append `s` escaped for HTML content or a quoted attribute value.
pub(crate) fn push_escaped(out: &mut String, s: &str) {
    let _ = escape_html(out, s);
}

fn push_escaped_href(out: &mut String, href: &str) {
    let _ = escape_href(out, href);
}

#[derive(Default)]
struct TextExtractor {
    blocks: Vec<String>,
}

impl NodeVisitor for TextExtractor {
    fn enter(&mut self, el: &Element, _pos: usize) -> bool {
        if el.is_textblock() {
            self.blocks.push(String::new());
        }
        true
    }

    fn text(&mut self, text: &TextNode, _pos: usize) {
        if let Some(block) = self.blocks.last_mut() {
            block.push_str(&text.text);
        }
    }
}
