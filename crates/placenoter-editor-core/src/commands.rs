//! The command catalog.
//!
//! Every editing operation is a [`Command`] variant, looked up by name and
//! dispatched through one `match`. Commands never fail loudly: a command that
//! does not apply returns `false` and leaves the transaction untouched.

use std::sync::LazyLock;

use smol_str::SmolStr;

use crate::blocks::{self, ListKind};
use crate::formatting;
use crate::model::{Mark, MarkType, NodeKind, NodeType, TextAlign, has_mark_type};
use crate::node_mover;
use crate::state::EditorState;
use crate::tables::{self, TableCommand};
use crate::transform::Transaction;
use crate::types::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // === Marks ===
    /// Flip a mark over the selection, or the pending mark on a caret.
    ToggleMark(MarkType),
    SetMark(Mark),
    UnsetMark(MarkType),

    // === Blocks ===
    SetParagraph,
    SetHeading(u8),
    ToggleHeading(u8),
    ToggleBlockquote,
    /// `None` means auto-detected.
    SetCodeBlock(Option<SmolStr>),
    ToggleCodeBlock(Option<SmolStr>),
    SetCodeBlockLanguage(Option<SmolStr>),
    ToggleList(ListKind),
    ToggleTaskItem,

    // === Alignment ===
    SetTextAlign(TextAlign),
    UnsetTextAlign,

    // === Links ===
    SetLink(SmolStr),
    UnsetLink,

    // === Tables ===
    InsertTable {
        rows: usize,
        cols: usize,
        with_header_row: bool,
    },
    Table(TableCommand),

    // === Structure ===
    MoveNode(Direction),

    // === Text ===
    InsertText(String),
    DeleteRange {
        from: usize,
        to: usize,
    },
    DeleteBackward,
    SplitBlock,

    // === Code blocks ===
    ExitCodeBlock,
    /// ArrowDown: leaves a trailing code block from its end.
    CodeBlockArrowDown,
    ClearCodeBlock,
    Indent,
}

fn plain_mark(ty: MarkType) -> Option<Mark> {
    match ty {
        MarkType::Link => None,
        MarkType::Bold => Some(Mark::Bold),
        MarkType::Italic => Some(Mark::Italic),
        MarkType::Underline => Some(Mark::Underline),
        MarkType::Strike => Some(Mark::Strike),
        MarkType::Code => Some(Mark::Code),
    }
}

fn mark_type_by_name(name: &str) -> Option<MarkType> {
    [
        MarkType::Link,
        MarkType::Bold,
        MarkType::Italic,
        MarkType::Underline,
        MarkType::Strike,
        MarkType::Code,
    ]
    .into_iter()
    .find(|ty| ty.name() == name)
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ToggleMark(ty) => match ty {
                MarkType::Link => "toggleLink",
                MarkType::Bold => "toggleBold",
                MarkType::Italic => "toggleItalic",
                MarkType::Underline => "toggleUnderline",
                MarkType::Strike => "toggleStrike",
                MarkType::Code => "toggleCode",
            },
            Command::SetMark(_) => "setMark",
            Command::UnsetMark(_) => "unsetMark",
            Command::SetParagraph => "setParagraph",
            Command::SetHeading(_) => "setHeading",
            Command::ToggleHeading(_) => "toggleHeading",
            Command::ToggleBlockquote => "toggleBlockquote",
            Command::SetCodeBlock(_) => "setCodeBlock",
            Command::ToggleCodeBlock(_) => "toggleCodeBlock",
            Command::SetCodeBlockLanguage(_) => "setCodeBlockLanguage",
            Command::ToggleList(ListKind::Bullet) => "toggleBulletList",
            Command::ToggleList(ListKind::Ordered) => "toggleOrderedList",
            Command::ToggleList(ListKind::Task) => "toggleTaskList",
            Command::ToggleTaskItem => "toggleTaskItem",
            Command::SetTextAlign(_) => "setTextAlign",
            Command::UnsetTextAlign => "unsetTextAlign",
            Command::SetLink(_) => "setLink",
            Command::UnsetLink => "unsetLink",
            Command::InsertTable { .. } => "insertTable",
            Command::Table(cmd) => cmd.name(),
            Command::MoveNode(Direction::Up) => "moveNodeUp",
            Command::MoveNode(Direction::Down) => "moveNodeDown",
            Command::InsertText(_) => "insertText",
            Command::DeleteRange { .. } => "deleteRange",
            Command::DeleteBackward => "deleteBackward",
            Command::SplitBlock => "splitBlock",
            Command::ExitCodeBlock => "exitCodeBlock",
            Command::CodeBlockArrowDown => "codeBlockArrowDown",
            Command::ClearCodeBlock => "clearCodeBlock",
            Command::Indent => "indent",
        }
    }

    /// Look a command up by name. `arg` carries the single argument some
    /// commands take: a heading level, mark or language name, alignment, URL,
    /// text, `"RxC"` table size or `"from..to"` range.
    pub fn from_name(name: &str, arg: Option<&str>) -> Option<Command> {
        let arg = arg.map(str::trim);
        let language = || arg.filter(|a| !a.is_empty()).map(SmolStr::new);
        let level = || arg.and_then(|a| a.parse::<u8>().ok()).unwrap_or(1);
        let cmd = match name {
            "toggleBold" => Command::ToggleMark(MarkType::Bold),
            "toggleItalic" => Command::ToggleMark(MarkType::Italic),
            "toggleUnderline" => Command::ToggleMark(MarkType::Underline),
            "toggleStrike" => Command::ToggleMark(MarkType::Strike),
            "toggleCode" => Command::ToggleMark(MarkType::Code),
            "setMark" => Command::SetMark(plain_mark(mark_type_by_name(arg?)?)?),
            "unsetMark" => Command::UnsetMark(mark_type_by_name(arg?)?),
            "setParagraph" => Command::SetParagraph,
            "setHeading" => Command::SetHeading(level()),
            "toggleHeading" => Command::ToggleHeading(level()),
            "toggleBlockquote" => Command::ToggleBlockquote,
            "setCodeBlock" => Command::SetCodeBlock(language()),
            "toggleCodeBlock" => Command::ToggleCodeBlock(language()),
            "setCodeBlockLanguage" => Command::SetCodeBlockLanguage(language()),
            "toggleBulletList" => Command::ToggleList(ListKind::Bullet),
            "toggleOrderedList" => Command::ToggleList(ListKind::Ordered),
            "toggleTaskList" => Command::ToggleList(ListKind::Task),
            "toggleTaskItem" => Command::ToggleTaskItem,
            "setTextAlign" => Command::SetTextAlign(TextAlign::parse(arg?)?),
            "unsetTextAlign" => Command::UnsetTextAlign,
            "setLink" => Command::SetLink(SmolStr::new(arg?)),
            "unsetLink" => Command::UnsetLink,
            "insertTable" => {
                let (rows, cols) = match arg {
                    Some(size) => {
                        let (r, c) = size.split_once('x')?;
                        (r.trim().parse().ok()?, c.trim().parse().ok()?)
                    }
                    None => (3, 3),
                };
                Command::InsertTable {
                    rows,
                    cols,
                    with_header_row: true,
                }
            }
            "moveNodeUp" => Command::MoveNode(Direction::Up),
            "moveNodeDown" => Command::MoveNode(Direction::Down),
            "insertText" => Command::InsertText(arg?.to_string()),
            "deleteRange" => {
                let (from, to) = arg?.split_once("..")?;
                Command::DeleteRange {
                    from: from.trim().parse().ok()?,
                    to: to.trim().parse().ok()?,
                }
            }
            "deleteBackward" => Command::DeleteBackward,
            "splitBlock" => Command::SplitBlock,
            "exitCodeBlock" => Command::ExitCodeBlock,
            "codeBlockArrowDown" => Command::CodeBlockArrowDown,
            "clearCodeBlock" => Command::ClearCodeBlock,
            "indent" => Command::Indent,
            other => Command::Table(TableCommand::from_name(other)?),
        };
        Some(cmd)
    }

    /// Run the command on a transaction. Returns whether anything happened.
    pub fn apply(&self, tr: &mut Transaction) -> bool {
        match self {
            Command::ToggleMark(ty) => {
                plain_mark(*ty).is_some_and(|mark| formatting::toggle_mark(tr, mark))
            }
            Command::SetMark(mark) => formatting::set_mark(tr, mark.clone()),
            Command::UnsetMark(ty) => formatting::unset_mark(tr, *ty),
            Command::SetParagraph => blocks::set_paragraph(tr),
            Command::SetHeading(level) => blocks::set_heading(tr, *level),
            Command::ToggleHeading(level) => blocks::toggle_heading(tr, *level),
            Command::ToggleBlockquote => blocks::toggle_blockquote(tr),
            Command::SetCodeBlock(lang) => blocks::set_code_block(tr, lang.as_deref()),
            Command::ToggleCodeBlock(lang) => blocks::toggle_code_block(tr, lang.as_deref()),
            Command::SetCodeBlockLanguage(lang) => {
                blocks::set_code_block_language(tr, lang.as_deref())
            }
            Command::ToggleList(kind) => blocks::toggle_list(tr, *kind),
            Command::ToggleTaskItem => blocks::toggle_task_item(tr),
            Command::SetTextAlign(align) => formatting::set_text_align(tr, Some(*align)),
            Command::UnsetTextAlign => formatting::set_text_align(tr, None),
            Command::SetLink(href) => formatting::set_link(tr, href),
            Command::UnsetLink => formatting::unset_link(tr),
            Command::InsertTable {
                rows,
                cols,
                with_header_row,
            } => tables::insert_table(tr, *rows, *cols, *with_header_row),
            Command::Table(cmd) => tables::run_table_command(tr, *cmd),
            Command::MoveNode(direction) => node_mover::move_node(tr, *direction),
            Command::InsertText(text) => blocks::insert_text(tr, text),
            Command::DeleteRange { from, to } => blocks::delete_range(tr, *from, *to),
            Command::DeleteBackward => blocks::delete_backward(tr),
            Command::SplitBlock => blocks::split_block(tr),
            Command::ExitCodeBlock => blocks::exit_code_block(tr),
            Command::CodeBlockArrowDown => blocks::code_block_arrow_down(tr),
            Command::ClearCodeBlock => blocks::clear_code_block(tr),
            Command::Indent => blocks::indent(tr),
        }
    }

    /// Dry run against a state.
    pub fn can_apply(&self, state: &EditorState) -> bool {
        let mut tr = state.transaction();
        self.apply(&mut tr)
    }

    /// Whether the toolbar should show this command as active.
    pub fn is_active(&self, state: &EditorState) -> bool {
        let doc = &state.doc;
        let sel = state.selection;
        match self {
            Command::ToggleMark(ty) | Command::UnsetMark(ty) => mark_active(state, *ty),
            Command::SetMark(mark) => mark_active(state, mark.mark_type()),
            Command::SetParagraph => {
                blocks::textblocks_all(doc, sel, |k| k.node_type() == NodeType::Paragraph)
            }
            Command::SetHeading(level) | Command::ToggleHeading(level) => {
                blocks::textblocks_all(doc, sel, |k| {
                    matches!(k, NodeKind::Heading { level: l, .. } if l == level)
                })
            }
            Command::SetCodeBlock(_) | Command::ToggleCodeBlock(_) => {
                blocks::textblocks_all(doc, sel, |k| k.node_type() == NodeType::CodeBlock)
            }
            Command::ToggleBlockquote => blocks::blockquote_active(doc, sel.from()),
            Command::ToggleList(kind) => blocks::list_active(doc, sel.from(), *kind),
            Command::SetTextAlign(align) => {
                formatting::active_align(doc, sel.from(), sel.to()) == Some(*align)
            }
            Command::SetLink(_) | Command::UnsetLink => {
                formatting::current_link(doc, sel.from()).is_some()
            }
            Command::InsertTable { .. } | Command::Table(_) => tables::in_table(doc, sel.head),
            _ => false,
        }
    }
}

fn mark_active(state: &EditorState, ty: MarkType) -> bool {
    let sel = state.selection;
    if sel.is_empty() {
        has_mark_type(&state.active_marks(), ty)
    } else {
        formatting::range_has_mark(&state.doc, sel.from(), sel.to(), ty)
    }
}

/// Result of running one command against a state.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub state: EditorState,
    pub applied: bool,
    pub transaction: Transaction,
}

/// Apply a command. When it does not apply, the state comes back unchanged.
pub fn apply(state: &EditorState, command: &Command) -> CommandOutcome {
    let mut tr = state.transaction();
    if command.apply(&mut tr) {
        CommandOutcome {
            state: state.apply(&tr),
            applied: true,
            transaction: tr,
        }
    } else {
        CommandOutcome {
            state: state.clone(),
            applied: false,
            transaction: state.transaction(),
        }
    }
}

/// A toolbar button.
#[derive(Debug, Clone)]
pub struct ToolbarButton {
    pub name: &'static str,
    pub label: &'static str,
    pub command: Command,
}

impl ToolbarButton {
    pub fn is_active(&self, state: &EditorState) -> bool {
        self.command.is_active(state)
    }

    pub fn is_enabled(&self, state: &EditorState) -> bool {
        self.command.can_apply(state)
    }
}

/// Formatting toolbar, in display order.
pub static TOOLBAR: LazyLock<Vec<ToolbarButton>> = LazyLock::new(|| {
    let button = |name, label, command| ToolbarButton {
        name,
        label,
        command,
    };
    vec![
        button("bold", "Bold", Command::ToggleMark(MarkType::Bold)),
        button("italic", "Italic", Command::ToggleMark(MarkType::Italic)),
        button("underline", "Underline", Command::ToggleMark(MarkType::Underline)),
        button("strike", "Strike", Command::ToggleMark(MarkType::Strike)),
        button("code", "Code", Command::ToggleMark(MarkType::Code)),
        button("heading1", "Heading 1", Command::ToggleHeading(1)),
        button("heading2", "Heading 2", Command::ToggleHeading(2)),
        button("heading3", "Heading 3", Command::ToggleHeading(3)),
        button("bulletList", "Bullet List", Command::ToggleList(ListKind::Bullet)),
        button("orderedList", "Ordered List", Command::ToggleList(ListKind::Ordered)),
        button("taskList", "Task List", Command::ToggleList(ListKind::Task)),
        button("blockquote", "Blockquote", Command::ToggleBlockquote),
        button("codeBlock", "Code Block", Command::ToggleCodeBlock(None)),
        button("alignLeft", "Align Left", Command::SetTextAlign(TextAlign::Left)),
        button("alignCenter", "Align Center", Command::SetTextAlign(TextAlign::Center)),
        button("alignRight", "Align Right", Command::SetTextAlign(TextAlign::Right)),
        button("alignJustify", "Justify", Command::SetTextAlign(TextAlign::Justify)),
        button(
            "table",
            "Table",
            Command::InsertTable {
                rows: 3,
                cols: 3,
                with_header_row: true,
            },
        ),
        button("unlink", "Remove Link", Command::UnsetLink),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::types::Selection;

    #[test]
    fn test_from_name_round_trips_names() {
        let commands = [
            Command::ToggleMark(MarkType::Bold),
            Command::SetHeading(2),
            Command::ToggleCodeBlock(Some("rust".into())),
            Command::ToggleList(ListKind::Task),
            Command::SetTextAlign(TextAlign::Right),
            Command::Table(TableCommand::MergeCells),
            Command::MoveNode(Direction::Down),
        ];
        for cmd in commands {
            let arg = match &cmd {
                Command::SetHeading(l) => Some(l.to_string()),
                Command::ToggleCodeBlock(Some(lang)) => Some(lang.to_string()),
                Command::SetTextAlign(a) => Some(a.as_str().to_string()),
                _ => None,
            };
            assert_eq!(Command::from_name(cmd.name(), arg.as_deref()), Some(cmd));
        }
        assert_eq!(
            Command::from_name("insertTable", Some("2x4")),
            Some(Command::InsertTable {
                rows: 2,
                cols: 4,
                with_header_row: true
            })
        );
        assert_eq!(Command::from_name("setLink", None), None);
        assert_eq!(Command::from_name("nope", None), None);
    }

    #[test]
    fn test_can_apply_false_leaves_state_unchanged() {
        let state = EditorState::new(doc(vec![p_text("one")]));
        let merge = Command::Table(TableCommand::MergeCells);
        assert!(!merge.can_apply(&state));
        let outcome = apply(&state, &merge);
        assert!(!outcome.applied);
        assert_eq!(outcome.state, state);
    }

    #[test]
    fn test_toolbar_reports_active_marks() {
        let d = doc(vec![p(vec![crate::model::Node::marked("b", vec![Mark::Bold])])]);
        let state = EditorState::new(d).with_selection(Selection::new(2, 3));
        let bold = TOOLBAR.iter().find(|b| b.name == "bold").unwrap();
        let italic = TOOLBAR.iter().find(|b| b.name == "italic").unwrap();
        assert!(bold.is_active(&state));
        assert!(!italic.is_active(&state));
        assert!(bold.is_enabled(&state));
    }

    #[test]
    fn test_set_mark_from_name() {
        let state =
            EditorState::new(doc(vec![p_text("word")])).with_selection(Selection::new(2, 6));
        let cmd = Command::from_name("setMark", Some("underline")).unwrap();
        let outcome = apply(&state, &cmd);
        assert!(outcome.applied);
        assert!(cmd.is_active(&outcome.state));
    }
}
