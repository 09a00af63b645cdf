//! placenoter-editor-core: the rich-text editor model behind PlaceNoter.
//!
//! This crate provides:
//! - `Document` - a schema-checked node tree with flat position addressing
//! - `Step` / `Transaction` - invertible replace steps with position mapping
//! - `Command` - the catalog of editing commands, tables and block moves
//! - `History` - undo/redo over recorded transactions
//! - `SearchState`, `CodeHighlighter`, `SlashMenu` - derived decorations and
//!   the slash palette
//! - `Editor` - ties the above together behind one dispatch loop

pub mod actions;
pub mod blocks;
pub mod commands;
pub mod editor;
pub mod error;
pub mod formatting;
pub mod highlight;
pub mod history;
pub mod languages;
pub mod links;
pub mod model;
pub mod node_mover;
pub mod parse;
pub mod schema;
pub mod search;
pub mod serialize;
pub mod slash;
pub mod state;
pub mod tables;
pub mod transform;
pub mod types;

pub use actions::{Key, KeyAction, KeyCombo, KeydownResult, Keymap, Modifiers};
pub use blocks::ListKind;
pub use commands::{Command, CommandOutcome, TOOLBAR, ToolbarButton, apply};
pub use editor::{Editor, HostRequest};
pub use error::StepError;
pub use highlight::{CodeHighlighter, HighlightSpan};
pub use history::{History, UndoManager};
pub use links::{UrlInput, is_valid_url};
pub use model::{Document, Element, Mark, MarkType, Node, NodeKind, NodeType, TextAlign, TextNode};
pub use parse::parse_html;
pub use search::{SEARCH_RESULT_CLASS, SearchState};
pub use serialize::{text_content, to_html};
pub use slash::{SLASH_ITEMS, SlashItem, SlashMenu, SlashTrigger};
pub use smol_str::SmolStr;
pub use state::EditorState;
pub use tables::TableCommand;
pub use transform::{Mapping, Step, StepMap, Transaction};
pub use types::{Decoration, Direction, Selection};
