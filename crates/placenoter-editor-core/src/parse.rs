//! HTML to document parsing.
//!
//! Reads the markup produced by `serialize::to_html` plus the common
//! variants found in pasted or imported notes. Anything the schema cannot
//! express is unwrapped or dropped so the result is always a valid document.

use smol_str::SmolStr;

use crate::model::{
    CellAttrs, Document, Element, Mark, MarkType, Node, NodeKind, TextAlign, build,
    has_mark_type, normalize_inline,
};

/// Parse an HTML fragment into a document. Empty input yields the empty
/// document.
pub fn parse_html(html: &str) -> Document {
    let dom = build_dom(tokenize(html));
    let blocks = blocks_from(&dom);
    if blocks.is_empty() {
        return Document::default();
    }
    Document::new(Element::new(
        NodeKind::Doc,
        blocks.into_iter().map(build::dblock).collect(),
    ))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "br", "hr", "img", "input", "meta", "link", "col", "wbr", "source", "area", "base",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |i| &after[i + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |i| &rest[i + 1..]);
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_lowercase();
            tokens.push(Token::Close(name));
            rest = after.get(end + 1..).unwrap_or("");
            continue;
        }
        if rest.starts_with('<')
            && rest[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
        {
            let (token, consumed) = read_open_tag(rest);
            rest = &rest[consumed..];
            if let Token::Open { name, .. } = &token {
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    let closing = format!("</{name}");
                    let lower = rest.to_ascii_lowercase();
                    rest = match lower.find(&closing) {
                        Some(i) => {
                            let tail = &rest[i..];
                            tail.find('>').map_or("", |j| &tail[j + 1..])
                        }
                        None => "",
                    };
                    continue;
                }
            }
            tokens.push(token);
            continue;
        }
        // A stray '<' that does not open a tag is plain text.
        let skip = usize::from(rest.starts_with('<'));
        let next = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
        tokens.push(Token::Text(decode_entities(&rest[..next])));
        rest = &rest[next..];
    }
    tokens
}

/// Read `<name attr=...>` from the start of `input`; returns the token and
/// the number of bytes consumed.
fn read_open_tag(input: &str) -> (Token, usize) {
    let bytes = input.as_bytes();
    let mut i = 1;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
    {
        i += 1;
    }
    let name = input[1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = input[name_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] != quote {
                    end += 1;
                }
                value = decode_entities(&input[start..end]);
                i = (end + 1).min(bytes.len());
            } else {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&input[start..i]);
            }
        }
        if !attr_name.is_empty() {
            attrs.push((attr_name, value));
        }
    }
    (
        Token::Open {
            name,
            attrs,
            self_closing,
        },
        i,
    )
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone)]
enum Dom {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Dom>,
    },
    Text(String),
}

impl Dom {
    fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Dom::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            Dom::Text(_) => None,
        }
    }

    fn text(&self) -> String {
        match self {
            Dom::Text(t) => t.clone(),
            Dom::Element { name, children, .. } => {
                if name == "br" {
                    return "\n".to_string();
                }
                children.iter().map(Dom::text).collect()
            }
        }
    }
}

fn build_dom(tokens: Vec<Token>) -> Vec<Dom> {
    // Stack of open elements; index 0 is a synthetic root.
    let mut stack: Vec<(String, Vec<(String, String)>, Vec<Dom>)> =
        vec![(String::new(), Vec::new(), Vec::new())];
    for token in tokens {
        match token {
            Token::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.2.push(Dom::Text(t));
                }
            }
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.2.push(Dom::Element {
                            name,
                            attrs,
                            children: Vec::new(),
                        });
                    }
                } else {
                    stack.push((name, attrs, Vec::new()));
                }
            }
            Token::Close(name) => {
                let Some(depth) = stack.iter().rposition(|(n, _, _)| *n == name) else {
                    continue;
                };
                if depth == 0 {
                    continue;
                }
                while stack.len() > depth {
                    close_top(&mut stack);
                }
            }
        }
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|(_, _, children)| children).unwrap_or_default()
}

fn close_top(stack: &mut Vec<(String, Vec<(String, String)>, Vec<Dom>)>) {
    if let Some((name, attrs, children)) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.2.push(Dom::Element {
                name,
                attrs,
                children,
            });
        }
    }
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "blockquote"
            | "pre"
            | "table"
            | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "hr"
    )
}

/// Convert a sequence of DOM nodes into blocks, wrapping loose inline runs
/// into paragraphs.
fn blocks_from(children: &[Dom]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut inline_run = Vec::new();
    for child in children {
        let block_tag = match child {
            Dom::Element { name, .. } if is_block_tag(name) => Some(name.as_str()),
            _ => None,
        };
        match block_tag {
            None => inline_from(child, &[], &mut inline_run),
            Some(tag) => {
                flush_inline(&mut inline_run, &mut out);
                block_from(tag, child, &mut out);
            }
        }
    }
    flush_inline(&mut inline_run, &mut out);
    out
}

fn flush_inline(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    let content = normalize_inline(std::mem::take(run));
    let has_text = content
        .iter()
        .any(|n| n.as_text().is_some_and(|t| !t.text.trim().is_empty()));
    if has_text {
        out.push(Node::element(NodeKind::paragraph(), content));
    }
}

fn block_from(tag: &str, dom: &Dom, out: &mut Vec<Node>) {
    let Dom::Element { children, .. } = dom else {
        return;
    };
    let align = dom
        .attr("style")
        .and_then(|style| style.split(';').find_map(parse_text_align));
    match tag {
        "p" => out.push(Node::element(
            NodeKind::Paragraph { align },
            inline_children(children),
        )),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse().unwrap_or(1);
            out.push(Node::element(
                NodeKind::Heading { level, align },
                inline_children(children),
            ));
        }
        "ul" | "ol" => {
            let task = dom.attr("data-type") == Some("taskList");
            let kind = match (tag, task) {
                (_, true) => NodeKind::TaskList,
                ("ol", _) => NodeKind::OrderedList,
                _ => NodeKind::BulletList,
            };
            let items: Vec<Node> = children
                .iter()
                .filter_map(|c| match c {
                    Dom::Element { name, .. } if name == "li" => Some(list_item(c, task)),
                    Dom::Text(t) if t.trim().is_empty() => None,
                    other => Some(list_item_from_loose(other, task)),
                })
                .collect();
            if !items.is_empty() {
                out.push(Node::element(kind, items));
            }
        }
        "li" => out.extend(list_item_blocks(children)),
        "blockquote" => {
            let mut content = blocks_from(children);
            if content.is_empty() {
                content.push(build::p(vec![]));
            }
            out.push(Node::element(NodeKind::Blockquote, content));
        }
        "pre" => {
            let language = children.iter().find_map(|c| match c {
                Dom::Element { name, .. } if name == "code" => {
                    c.attr("class").and_then(language_from_class)
                }
                _ => None,
            });
            let text: String = children.iter().map(Dom::text).collect();
            let content = if text.is_empty() {
                vec![]
            } else {
                vec![Node::text(text)]
            };
            out.push(Node::element(
                NodeKind::code_block(language.as_deref()),
                content,
            ));
        }
        "table" => {
            if let Some(table) = table_from(children) {
                out.push(table);
            }
        }
        "hr" => {}
        // Unknown containers (including the dBlock wrapper) are transparent.
        _ => out.extend(blocks_from(children)),
    }
}

fn parse_text_align(decl: &str) -> Option<TextAlign> {
    let (prop, value) = decl.split_once(':')?;
    if prop.trim() != "text-align" {
        return None;
    }
    TextAlign::parse(value)
}

fn inline_children(children: &[Dom]) -> Vec<Node> {
    let mut out = Vec::new();
    for child in children {
        inline_from(child, &[], &mut out);
    }
    normalize_inline(out)
}

fn inline_from(dom: &Dom, marks: &[Mark], out: &mut Vec<Node>) {
    match dom {
        Dom::Text(t) => {
            if !t.is_empty() {
                out.push(Node::marked(t.clone(), marks.to_vec()));
            }
        }
        Dom::Element { name, children, .. } => {
            let mark = match name.as_str() {
                "strong" | "b" => Some(Mark::Bold),
                "em" | "i" => Some(Mark::Italic),
                "u" => Some(Mark::Underline),
                "s" | "del" | "strike" => Some(Mark::Strike),
                "code" => Some(Mark::Code),
                "a" => dom.attr("href").map(Mark::link),
                "br" => {
                    out.push(Node::marked("\n", marks.to_vec()));
                    return;
                }
                _ => None,
            };
            let inside_code = has_mark_type(marks, MarkType::Code);
            let next = match mark {
                Some(m) if !inside_code => m.add_to_set(marks),
                _ => marks.to_vec(),
            };
            for child in children {
                inline_from(child, &next, out);
            }
        }
    }
}

fn list_item(dom: &Dom, task: bool) -> Node {
    let children = match dom {
        Dom::Element { children, .. } => children.as_slice(),
        Dom::Text(_) => &[],
    };
    let kind = if task {
        NodeKind::TaskItem {
            checked: dom.attr("data-checked") == Some("true"),
        }
    } else {
        NodeKind::ListItem
    };
    Node::element(kind, list_item_blocks(children))
}

fn list_item_from_loose(dom: &Dom, task: bool) -> Node {
    let kind = if task {
        NodeKind::TaskItem { checked: false }
    } else {
        NodeKind::ListItem
    };
    Node::element(kind, list_item_blocks(std::slice::from_ref(dom)))
}

/// List item content must open with a paragraph.
fn list_item_blocks(children: &[Dom]) -> Vec<Node> {
    let mut blocks = blocks_from(children);
    let starts_with_paragraph = blocks.first().and_then(Node::as_element).is_some_and(|el| {
        matches!(el.kind, NodeKind::Paragraph { .. })
    });
    if !starts_with_paragraph {
        blocks.insert(0, build::p(vec![]));
    }
    blocks
}

fn table_from(children: &[Dom]) -> Option<Node> {
    let mut rows = Vec::new();
    collect_rows(children, &mut rows);
    if rows.is_empty() {
        None
    } else {
        Some(Node::element(NodeKind::Table, rows))
    }
}

fn collect_rows(children: &[Dom], rows: &mut Vec<Node>) {
    for child in children {
        let Dom::Element { name, children, .. } = child else {
            continue;
        };
        match name.as_str() {
            "tr" => {
                let cells: Vec<Node> = children
                    .iter()
                    .filter_map(|c| match c {
                        Dom::Element { name, .. } if name == "td" || name == "th" => {
                            Some(cell_from(c, name == "th"))
                        }
                        _ => None,
                    })
                    .collect();
                if !cells.is_empty() {
                    rows.push(Node::element(NodeKind::TableRow, cells));
                }
            }
            "thead" | "tbody" | "tfoot" => collect_rows(children, rows),
            _ => {}
        }
    }
}

fn cell_from(dom: &Dom, header: bool) -> Node {
    let span = |key, max: usize| {
        dom.attr(key)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n >= 1)
            .map_or(1, |n| n.min(max))
    };
    let attrs = CellAttrs {
        colspan: span("colspan", CellAttrs::MAX_COLSPAN),
        rowspan: span("rowspan", CellAttrs::MAX_ROWSPAN),
    };
    let children = match dom {
        Dom::Element { children, .. } => children.as_slice(),
        Dom::Text(_) => &[],
    };
    // Tables cannot nest; a nested table collapses to its text.
    let mut blocks: Vec<Node> = blocks_from(children)
        .into_iter()
        .map(|block| match &block {
            Node::Element(el) if el.kind == NodeKind::Table => {
                let text = el.text();
                build::p_text(&text)
            }
            _ => block,
        })
        .collect();
    if blocks.is_empty() {
        blocks.push(build::p(vec![]));
    }
    let kind = if header {
        NodeKind::TableHeader(attrs)
    } else {
        NodeKind::TableCell(attrs)
    };
    Node::element(kind, blocks)
}

/// Parse a language attribute value the way the serializer writes it.
pub fn language_from_class(class: &str) -> Option<SmolStr> {
    class
        .split_whitespace()
        .find_map(|c| c.strip_prefix("language-"))
        .map(SmolStr::new)
}
