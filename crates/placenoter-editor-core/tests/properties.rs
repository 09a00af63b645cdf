use placenoter_editor_core::model::build::*;
use placenoter_editor_core::{
    Command, Direction, Document, Editor, EditorState, ListKind, Mark, MarkType, Node, Selection,
    TableCommand, TextAlign, UndoManager, apply, parse_html, text_content, to_html,
};

fn sample() -> Document {
    doc(vec![
        h(1, "Title"),
        p(vec![
            Node::text("plain "),
            Node::marked("bold", vec![Mark::Bold]),
            Node::text(" "),
            Node::marked("link", vec![Mark::link("https://example.com")]),
        ]),
        ul(vec![li(vec![p_text("one")]), li(vec![p_text("two")])]),
        blockquote(vec![p_text("quoted")]),
        code(Some("rust"), "fn main() {}\n"),
        table(vec![vec![th("h1"), th("h2")], vec![td("a"), td("b")]]),
        p_text("tail <&>"),
    ])
}

fn every_command() -> Vec<Command> {
    let mut commands = vec![
        Command::ToggleMark(MarkType::Bold),
        Command::ToggleMark(MarkType::Code),
        Command::SetMark(Mark::Italic),
        Command::UnsetMark(MarkType::Bold),
        Command::SetParagraph,
        Command::SetHeading(2),
        Command::ToggleHeading(3),
        Command::ToggleBlockquote,
        Command::SetCodeBlock(None),
        Command::ToggleCodeBlock(Some("python".into())),
        Command::SetCodeBlockLanguage(Some("ts".into())),
        Command::ToggleList(ListKind::Bullet),
        Command::ToggleList(ListKind::Ordered),
        Command::ToggleList(ListKind::Task),
        Command::ToggleTaskItem,
        Command::SetTextAlign(TextAlign::Center),
        Command::UnsetTextAlign,
        Command::SetLink("https://placenoter.app".into()),
        Command::SetLink("not a url".into()),
        Command::UnsetLink,
        Command::InsertTable {
            rows: 2,
            cols: 2,
            with_header_row: true,
        },
        Command::MoveNode(Direction::Up),
        Command::MoveNode(Direction::Down),
        Command::InsertText("xy".into()),
        Command::DeleteBackward,
        Command::SplitBlock,
        Command::ExitCodeBlock,
        Command::CodeBlockArrowDown,
        Command::ClearCodeBlock,
        Command::Indent,
    ];
    commands.extend(TableCommand::ALL.into_iter().map(Command::Table));
    commands
}

fn caret_positions(doc: &Document) -> Vec<usize> {
    doc.textblocks()
        .into_iter()
        .flat_map(|tb| tb.start..=tb.end)
        .collect()
}

#[test]
fn test_every_command_leaves_a_valid_selection() {
    let base = EditorState::new(sample());
    let positions = caret_positions(&base.doc);
    let mut selections: Vec<Selection> =
        positions.iter().map(|&p| Selection::collapsed(p)).collect();
    for pair in positions.windows(7).step_by(5) {
        selections.push(Selection::new(pair[0], pair[6]));
        selections.push(Selection::new(pair[6], pair[0]));
    }

    for selection in selections {
        let state = base.clone().with_selection(selection);
        for command in every_command() {
            let outcome = apply(&state, &command);
            assert!(
                outcome.state.selection.is_valid(&outcome.state.doc),
                "{} from {:?} left {:?}",
                command.name(),
                selection,
                outcome.state.selection
            );
        }
    }
}

#[test]
fn test_inapplicable_commands_never_change_the_document() {
    let base = EditorState::new(sample());
    for &pos in caret_positions(&base.doc).iter().step_by(3) {
        let state = base.clone().with_selection(Selection::collapsed(pos));
        for command in every_command() {
            if command.can_apply(&state) {
                continue;
            }
            let outcome = apply(&state, &command);
            assert!(!outcome.applied, "{}", command.name());
            assert_eq!(outcome.state.doc, state.doc, "{}", command.name());
        }
    }
}

#[test]
fn test_toggling_twice_restores_the_document() {
    let toggles = [
        Command::ToggleMark(MarkType::Bold),
        Command::ToggleMark(MarkType::Italic),
        Command::ToggleMark(MarkType::Underline),
        Command::ToggleMark(MarkType::Strike),
        Command::ToggleHeading(1),
        Command::ToggleHeading(2),
        Command::ToggleBlockquote,
        Command::ToggleList(ListKind::Bullet),
        Command::ToggleList(ListKind::Ordered),
        Command::ToggleList(ListKind::Task),
    ];
    let state = EditorState::new(doc(vec![p_text("alpha beta"), p_text("gamma")]))
        .with_selection(Selection::new(3, 9));
    for toggle in toggles {
        let once = apply(&state, &toggle);
        assert!(once.applied, "{}", toggle.name());
        assert_ne!(once.state.doc, state.doc, "{}", toggle.name());
        let twice = apply(&once.state, &toggle);
        assert!(twice.applied, "{}", toggle.name());
        assert_eq!(twice.state.doc, state.doc, "{}", toggle.name());
    }

    // Inline code is exempt from other marks, so it must not block the toggle.
    let mixed = EditorState::new(doc(vec![p(vec![
        Node::text("ab"),
        Node::marked("cd", vec![Mark::Code]),
        Node::text("ef"),
    ])]))
    .with_selection(Selection::new(2, 8));
    for mark in [MarkType::Bold, MarkType::Italic, MarkType::Strike] {
        let toggle = Command::ToggleMark(mark);
        let once = apply(&mixed, &toggle);
        assert_ne!(once.state.doc, mixed.doc, "{}", toggle.name());
        let twice = apply(&once.state, &toggle);
        assert_eq!(twice.state.doc, mixed.doc, "{}", toggle.name());
    }
}

#[test]
fn test_move_node_reorders_siblings() {
    let mut editor = Editor::new(doc(vec![p_text("A"), p_text("B"), p_text("C")]));
    editor.set_selection(Selection::collapsed(7));
    assert!(editor.execute(&Command::MoveNode(Direction::Down)));
    assert_eq!(editor.text_content(), "A\n\nC\n\nB");
    let head = editor.selection().head;
    let tb = editor.doc().textblock_at(head).unwrap();
    assert_eq!(editor.doc().element_at(&tb.path).unwrap().text(), "B");

    editor.set_selection(Selection::collapsed(2));
    let before = editor.doc().clone();
    assert!(!editor.execute(&Command::MoveNode(Direction::Up)));
    assert_eq!(editor.doc(), &before);
}

#[test]
fn test_replace_all_cat_to_dog() {
    let mut editor = Editor::new(doc(vec![p_text("cat cat cat")]));
    editor.set_search_term("cat");
    editor.set_replace_term("dog");
    assert_eq!(editor.search().results().len(), 3);
    assert!(editor.replace_all());
    assert_eq!(editor.text_content(), "dog dog dog");
    assert!(editor.search().results().is_empty());
    assert!(!editor.replace_all());

    // One undo step reverts the whole replacement.
    assert!(editor.undo());
    assert_eq!(editor.text_content(), "cat cat cat");
}

#[test]
fn test_text_content_survives_html_round_trip() {
    let d = sample();
    let html = to_html(&d);
    let reparsed = parse_html(&html);
    assert_eq!(text_content(&reparsed), text_content(&d));
    assert_eq!(reparsed.blocks().count(), d.blocks().count());
}

#[test]
fn test_undo_walks_back_through_commands() {
    let mut editor = Editor::new(doc(vec![p_text("text")]));
    let original = editor.doc().clone();
    editor.set_selection(Selection::new(2, 6));
    assert!(editor.execute(&Command::ToggleMark(MarkType::Bold)));
    assert!(editor.execute(&Command::ToggleHeading(2)));
    assert!(editor.execute(&Command::ToggleList(ListKind::Bullet)));
    assert_eq!(editor.history().undo_depth(), 3);
    while editor.undo() {}
    assert_eq!(editor.doc(), &original);
    assert!(editor.can_redo());
}
