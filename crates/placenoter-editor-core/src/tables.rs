//! Table insertion and structural editing.
//!
//! Structural commands work on a [`TableMap`]: every cell placed on a grid
//! with its row and column spans resolved. The map is edited and then
//! rebuilt into a fresh table node which replaces the old one in a single
//! step.

use crate::model::build::{dblock, p};
use crate::model::{CellAttrs, Document, Element, Node, NodeKind, NodeType};
use crate::transform::Transaction;
use crate::types::{Selection, nearest_caret};

/// Structural table commands, operating on the cell around the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableCommand {
    DeleteTable,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    MergeCells,
    SplitCell,
    ToggleHeaderRow,
    ToggleHeaderColumn,
    ToggleHeaderCell,
}

impl TableCommand {
    pub const ALL: [TableCommand; 12] = [
        TableCommand::DeleteTable,
        TableCommand::AddColumnBefore,
        TableCommand::AddColumnAfter,
        TableCommand::DeleteColumn,
        TableCommand::AddRowBefore,
        TableCommand::AddRowAfter,
        TableCommand::DeleteRow,
        TableCommand::MergeCells,
        TableCommand::SplitCell,
        TableCommand::ToggleHeaderRow,
        TableCommand::ToggleHeaderColumn,
        TableCommand::ToggleHeaderCell,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TableCommand::DeleteTable => "deleteTable",
            TableCommand::AddColumnBefore => "addColumnBefore",
            TableCommand::AddColumnAfter => "addColumnAfter",
            TableCommand::DeleteColumn => "deleteColumn",
            TableCommand::AddRowBefore => "addRowBefore",
            TableCommand::AddRowAfter => "addRowAfter",
            TableCommand::DeleteRow => "deleteRow",
            TableCommand::MergeCells => "mergeCells",
            TableCommand::SplitCell => "splitCell",
            TableCommand::ToggleHeaderRow => "toggleHeaderRow",
            TableCommand::ToggleHeaderColumn => "toggleHeaderColumn",
            TableCommand::ToggleHeaderCell => "toggleHeaderCell",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

// === Grid model ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
}

impl Rect {
    fn union(self, other: Rect) -> Rect {
        Rect {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }

    fn intersects(&self, other: &Rect) -> bool {
        self.top < other.bottom
            && other.top < self.bottom
            && self.left < other.right
            && other.left < self.right
    }

    fn contains(&self, other: &Rect) -> bool {
        self.top <= other.top
            && self.left <= other.left
            && other.bottom <= self.bottom
            && other.right <= self.right
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlacedCell {
    row: usize,
    col: usize,
    rowspan: usize,
    colspan: usize,
    header: bool,
    content: Vec<Node>,
    /// Index in the map the cell was read from. `None` for new cells.
    id: Option<usize>,
}

impl PlacedCell {
    fn empty(row: usize, col: usize, header: bool) -> Self {
        Self {
            row,
            col,
            rowspan: 1,
            colspan: 1,
            header,
            content: vec![p(Vec::new())],
            id: None,
        }
    }

    fn rect(&self) -> Rect {
        Rect {
            top: self.row,
            left: self.col,
            bottom: self.row + self.rowspan,
            right: self.col + self.colspan,
        }
    }

    fn covers(&self, row: usize, col: usize) -> bool {
        self.row <= row
            && row < self.row + self.rowspan
            && self.col <= col
            && col < self.col + self.colspan
    }

    fn to_node(&self) -> Node {
        let attrs = CellAttrs {
            colspan: self.colspan,
            rowspan: self.rowspan,
        };
        let kind = if self.header {
            NodeKind::TableHeader(attrs)
        } else {
            NodeKind::TableCell(attrs)
        };
        Node::element(kind, self.content.clone())
    }

    fn is_blank(&self) -> bool {
        self.content
            .iter()
            .all(|n| n.as_element().is_some_and(Element::is_empty_block))
    }
}

/// Cells of a table laid out on a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMap {
    pub width: usize,
    pub height: usize,
    cells: Vec<PlacedCell>,
    /// Placed index for each `(row, index in row)` of the source table.
    sources: Vec<Vec<usize>>,
}

impl TableMap {
    pub fn from_table(table: &Element) -> Self {
        let height = table.child_count();
        let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); height];
        let mut cells = Vec::new();
        let mut sources = vec![Vec::new(); height];
        for (r, row) in table.content.iter().enumerate() {
            let Some(row) = row.as_element() else {
                continue;
            };
            let mut col = 0;
            for cell in row.content.iter().filter_map(Node::as_element) {
                while occupied[r].get(col).copied().unwrap_or(false) {
                    col += 1;
                }
                let attrs = cell.kind.cell_attrs().unwrap_or_default();
                let rowspan = attrs.rowspan.clamp(1, height - r);
                let colspan = attrs.colspan.clamp(1, CellAttrs::MAX_COLSPAN);
                let end = col.saturating_add(colspan);
                for line in &mut occupied[r..r + rowspan] {
                    if line.len() < end {
                        line.resize(end, false);
                    }
                    line[col..end].fill(true);
                }
                sources[r].push(cells.len());
                cells.push(PlacedCell {
                    row: r,
                    col,
                    rowspan,
                    colspan,
                    header: cell.node_type() == NodeType::TableHeader,
                    content: cell.content.clone(),
                    id: Some(cells.len()),
                });
                col = end;
            }
        }
        let width = occupied.iter().map(Vec::len).max().unwrap_or(0);
        let mut map = Self {
            width,
            height,
            cells,
            sources,
        };
        map.fill_holes();
        map
    }

    /// Ragged rows get empty cells so every grid slot is covered.
    fn fill_holes(&mut self) {
        for row in 0..self.height {
            for col in 0..self.width {
                if self.cell_at(row, col).is_none() {
                    self.cells.push(PlacedCell::empty(row, col, false));
                }
            }
        }
    }

    fn cell_at(&self, row: usize, col: usize) -> Option<usize> {
        self.cells.iter().position(|c| c.covers(row, col))
    }

    fn find_id(&self, id: usize) -> Option<usize> {
        self.cells.iter().position(|c| c.id == Some(id))
    }

    fn row_is_header(&self, row: usize) -> bool {
        let mut cells = self
            .cells
            .iter()
            .filter(|c| c.rect().top <= row && row < c.rect().bottom);
        cells.clone().next().is_some() && cells.all(|c| c.header)
    }

    fn column_is_header(&self, col: usize) -> bool {
        let mut cells = self
            .cells
            .iter()
            .filter(|c| c.rect().left <= col && col < c.rect().right);
        cells.clone().next().is_some() && cells.all(|c| c.header)
    }

    /// Grow a rectangle until no cell straddles its border.
    fn expand(&self, mut rect: Rect) -> Rect {
        loop {
            let grown = self
                .cells
                .iter()
                .filter(|c| c.rect().intersects(&rect))
                .fold(rect, |acc, c| acc.union(c.rect()));
            if grown == rect {
                return rect;
            }
            rect = grown;
        }
    }

    fn add_column(&mut self, at: usize) {
        let header_rows: Vec<bool> = (0..self.height).map(|r| self.row_is_header(r)).collect();
        for cell in &mut self.cells {
            if cell.col >= at {
                cell.col += 1;
            } else if cell.col + cell.colspan > at {
                cell.colspan += 1;
            }
        }
        self.width += 1;
        for row in 0..self.height {
            if self.cell_at(row, at).is_none() {
                self.cells.push(PlacedCell::empty(row, at, header_rows[row]));
            }
        }
    }

    fn add_row(&mut self, at: usize) {
        let header_cols: Vec<bool> = (0..self.width).map(|c| self.column_is_header(c)).collect();
        for cell in &mut self.cells {
            if cell.row >= at {
                cell.row += 1;
            } else if cell.row + cell.rowspan > at {
                cell.rowspan += 1;
            }
        }
        self.height += 1;
        for col in 0..self.width {
            if self.cell_at(at, col).is_none() {
                self.cells.push(PlacedCell::empty(at, col, header_cols[col]));
            }
        }
    }

    fn delete_column(&mut self, at: usize) -> bool {
        if self.width <= 1 {
            return false;
        }
        self.cells
            .retain(|c| !(c.colspan == 1 && c.col == at));
        for cell in &mut self.cells {
            if cell.col <= at && at < cell.col + cell.colspan {
                cell.colspan -= 1;
            } else if cell.col > at {
                cell.col -= 1;
            }
        }
        self.width -= 1;
        true
    }

    fn delete_row(&mut self, at: usize) -> bool {
        if self.height <= 1 {
            return false;
        }
        self.cells.retain(|c| !(c.rowspan == 1 && c.row == at));
        for cell in &mut self.cells {
            if cell.row <= at && at < cell.row + cell.rowspan {
                cell.rowspan -= 1;
            } else if cell.row > at {
                cell.row -= 1;
            }
        }
        self.height -= 1;
        true
    }

    /// Merge every cell inside `rect` into its top-left cell.
    fn merge(&mut self, rect: Rect) -> bool {
        let mut inside: Vec<usize> = (0..self.cells.len())
            .filter(|&i| rect.contains(&self.cells[i].rect()))
            .collect();
        if inside.len() < 2 {
            return false;
        }
        inside.sort_by_key(|&i| (self.cells[i].row, self.cells[i].col));
        let first = &self.cells[inside[0]];
        let mut content = Vec::new();
        for &i in &inside {
            if !self.cells[i].is_blank() {
                content.extend(self.cells[i].content.iter().cloned());
            }
        }
        if content.is_empty() {
            content.push(p(Vec::new()));
        }
        let merged = PlacedCell {
            row: rect.top,
            col: rect.left,
            rowspan: rect.bottom - rect.top,
            colspan: rect.right - rect.left,
            header: first.header,
            content,
            id: first.id,
        };
        let mut index = 0;
        self.cells.retain(|_| {
            let keep = !inside.contains(&index);
            index += 1;
            keep
        });
        self.cells.push(merged);
        true
    }

    fn split(&mut self, index: usize) -> bool {
        let cell = &mut self.cells[index];
        if cell.rowspan == 1 && cell.colspan == 1 {
            return false;
        }
        let rect = cell.rect();
        let header = cell.header;
        cell.rowspan = 1;
        cell.colspan = 1;
        for row in rect.top..rect.bottom {
            for col in rect.left..rect.right {
                if (row, col) != (rect.top, rect.left) {
                    self.cells.push(PlacedCell::empty(row, col, header));
                }
            }
        }
        true
    }

    /// Flip the header flag of the selected cells: all become headers unless
    /// they all already are.
    fn toggle_header(&mut self, selected: &[usize]) -> bool {
        if selected.is_empty() {
            return false;
        }
        let make_header = !selected.iter().all(|&i| self.cells[i].header);
        for &i in selected {
            self.cells[i].header = make_header;
        }
        true
    }

    /// Drop rows that no cell starts in, shrinking the spans that cover them.
    fn drop_empty_rows(&mut self) {
        let mut row = 0;
        while row < self.height {
            if self.cells.iter().any(|c| c.row == row) {
                row += 1;
                continue;
            }
            for cell in &mut self.cells {
                if cell.row < row && row < cell.row + cell.rowspan {
                    cell.rowspan -= 1;
                } else if cell.row > row {
                    cell.row -= 1;
                }
            }
            self.height -= 1;
        }
    }

    /// Build the table node. Also returns, per cell, the offset of the
    /// position before it from the position before the table.
    fn to_table(&self) -> (Node, Vec<usize>) {
        let mut offsets = vec![0; self.cells.len()];
        let mut rows = Vec::with_capacity(self.height);
        let mut pos = 1;
        for row in 0..self.height {
            let mut order: Vec<usize> = (0..self.cells.len())
                .filter(|&i| self.cells[i].row == row)
                .collect();
            order.sort_by_key(|&i| self.cells[i].col);
            pos += 1;
            let mut cells = Vec::with_capacity(order.len());
            for i in order {
                let node = self.cells[i].to_node();
                offsets[i] = pos;
                pos += node.node_size();
                cells.push(node);
            }
            pos += 1;
            rows.push(Node::element(NodeKind::TableRow, cells));
        }
        (Node::element(NodeKind::Table, rows), offsets)
    }
}

// === Selection context ===

/// The table around the selection and the cells holding each end.
struct TableContext {
    table_before: usize,
    table_after: usize,
    map: TableMap,
    head_cell: usize,
    anchor_cell: usize,
    /// Offset of the head from the start of its cell's content.
    head_offset: usize,
}

/// Placed index and content start of the cell holding `pos`, with the path
/// of its table.
fn locate_cell(doc: &Document, pos: usize) -> Option<(Vec<usize>, usize, usize, usize)> {
    let rp = doc.resolve(pos)?;
    let cell_depth = rp.find_ancestor(doc, |el| el.kind.is_cell())?;
    let table_depth = cell_depth.checked_sub(2)?;
    let table = rp.node(doc, table_depth)?;
    if table.node_type() != NodeType::Table {
        return None;
    }
    Some((
        rp.path()[..table_depth].to_vec(),
        rp.index_at(table_depth),
        rp.index_at(table_depth + 1),
        rp.start(cell_depth),
    ))
}

fn table_context(doc: &Document, sel: Selection) -> Option<TableContext> {
    let (path, row, index, content_start) = locate_cell(doc, sel.head)?;
    let rp = doc.resolve(sel.head)?;
    let table_depth = path.len();
    let table = doc.element_at(&path)?;
    let map = TableMap::from_table(table);
    let head_cell = *map.sources.get(row)?.get(index)?;
    let anchor_cell = match locate_cell(doc, sel.anchor) {
        Some((anchor_path, r, i, _)) if anchor_path == path => {
            map.sources.get(r).and_then(|s| s.get(i)).copied().unwrap_or(head_cell)
        }
        _ => head_cell,
    };
    Some(TableContext {
        table_before: rp.before(table_depth)?,
        table_after: rp.after(table_depth)?,
        map,
        head_cell,
        anchor_cell,
        head_offset: sel.head - content_start,
    })
}

/// Whether `pos` sits inside a table cell.
pub fn in_table(doc: &Document, pos: usize) -> bool {
    locate_cell(doc, pos).is_some()
}

// === Commands ===

pub(crate) fn run_table_command(tr: &mut Transaction, command: TableCommand) -> bool {
    let Some(mut ctx) = table_context(tr.doc(), tr.selection()) else {
        return false;
    };
    if command == TableCommand::DeleteTable {
        return delete_table(tr, &ctx);
    }
    let head = ctx.map.cells[ctx.head_cell].clone();
    let anchor = ctx.map.cells[ctx.anchor_cell].clone();
    let selected_rect = ctx.map.expand(head.rect().union(anchor.rect()));
    let map = &mut ctx.map;
    let changed = match command {
        TableCommand::DeleteTable => false,
        TableCommand::AddColumnBefore => {
            map.add_column(head.col);
            true
        }
        TableCommand::AddColumnAfter => {
            map.add_column(head.col + head.colspan);
            true
        }
        TableCommand::DeleteColumn => map.delete_column(head.col),
        TableCommand::AddRowBefore => {
            map.add_row(head.row);
            true
        }
        TableCommand::AddRowAfter => {
            map.add_row(head.row + head.rowspan);
            true
        }
        TableCommand::DeleteRow => map.delete_row(head.row),
        TableCommand::MergeCells => {
            ctx.head_cell != ctx.anchor_cell && map.merge(selected_rect)
        }
        TableCommand::SplitCell => map.split(ctx.head_cell),
        TableCommand::ToggleHeaderRow => {
            let first_row: Vec<usize> = (0..map.cells.len())
                .filter(|&i| map.cells[i].row == 0)
                .collect();
            map.toggle_header(&first_row)
        }
        TableCommand::ToggleHeaderColumn => {
            let first_col: Vec<usize> = (0..map.cells.len())
                .filter(|&i| map.cells[i].col == 0)
                .collect();
            map.toggle_header(&first_col)
        }
        TableCommand::ToggleHeaderCell => {
            let selected: Vec<usize> = (0..map.cells.len())
                .filter(|&i| selected_rect.contains(&map.cells[i].rect()))
                .collect();
            map.toggle_header(&selected)
        }
    };
    if !changed {
        return false;
    }
    map.drop_empty_rows();

    let (table, offsets) = map.to_table();
    if let Err(e) = tr.replace(ctx.table_before, ctx.table_after, vec![table]) {
        tracing::warn!(error = %e, command = command.name(), "table edit rejected");
        return false;
    }
    let target = head
        .id
        .and_then(|id| map.find_id(id))
        .map(|i| (i, ctx.head_offset))
        .or_else(|| {
            let row = head.row.min(map.height.saturating_sub(1));
            let col = head.col.min(map.width.saturating_sub(1));
            map.cell_at(row, col).map(|i| (i, 0))
        });
    let caret = match target {
        Some((i, offset)) => {
            let content_start = ctx.table_before + offsets[i] + 1;
            let size = map.cells[i].to_node().node_size() - 2;
            content_start + offset.min(size)
        }
        None => ctx.table_before,
    };
    let caret = nearest_caret(tr.doc(), caret, 1);
    tr.set_selection(Selection::collapsed(caret));
    true
}

fn delete_table(tr: &mut Transaction, ctx: &TableContext) -> bool {
    let doc = tr.doc().clone();
    let Some(rp) = doc.resolve(ctx.table_before) else {
        return false;
    };
    let Some(parent) = rp.parent(&doc) else {
        return false;
    };
    let (from, to, replacement) = if parent.node_type() == NodeType::DBlock {
        let (Some(from), Some(to)) = (rp.before(rp.depth()), rp.after(rp.depth())) else {
            return false;
        };
        let only_block = doc.root().child_count() == 1;
        let replacement = if only_block {
            vec![dblock(p(Vec::new()))]
        } else {
            Vec::new()
        };
        (from, to, replacement)
    } else {
        let replacement = if parent.child_count() == 1 {
            vec![p(Vec::new())]
        } else {
            Vec::new()
        };
        (ctx.table_before, ctx.table_after, replacement)
    };
    if let Err(e) = tr.replace(from, to, replacement) {
        tracing::warn!(error = %e, "table removal rejected");
        return false;
    }
    let caret = nearest_caret(tr.doc(), from, 1);
    tr.set_selection(Selection::collapsed(caret));
    true
}

/// A `rows` by `cols` table of empty cells.
pub fn build_table(rows: usize, cols: usize, with_header_row: bool) -> Node {
    let rows = (0..rows)
        .map(|r| {
            let cells = (0..cols)
                .map(|_| PlacedCell::empty(r, 0, with_header_row && r == 0).to_node())
                .collect();
            Node::element(NodeKind::TableRow, cells)
        })
        .collect();
    Node::element(NodeKind::Table, rows)
}

/// Insert a table at the caret, replacing the current block when it is an
/// empty paragraph. Not allowed inside tables and code blocks.
pub(crate) fn insert_table(
    tr: &mut Transaction,
    rows: usize,
    cols: usize,
    with_header_row: bool,
) -> bool {
    if rows == 0 || cols == 0 {
        return false;
    }
    let doc = tr.doc().clone();
    let head = tr.selection().head;
    if in_table(&doc, head) {
        return false;
    }
    let Some(tb) = doc.textblock_at(head) else {
        return false;
    };
    if tb.is_code() {
        return false;
    }
    let Some(rp) = doc.resolve(head) else {
        return false;
    };
    let depth = rp.depth();
    let (Some(parent), Some(block)) = (rp.node(&doc, depth - 1), rp.parent(&doc)) else {
        return false;
    };
    let empty_paragraph =
        matches!(block.kind, NodeKind::Paragraph { .. }) && block.content.is_empty();
    let table = build_table(rows, cols, with_header_row);

    if parent.node_type() == NodeType::DBlock {
        let (Some(before), Some(after)) = (rp.before(depth - 1), rp.after(depth - 1)) else {
            return false;
        };
        let (from, to) = if empty_paragraph {
            (before, after)
        } else {
            (after, after)
        };
        if let Err(e) = tr.replace(from, to, vec![dblock(table)]) {
            tracing::warn!(error = %e, "table insert rejected");
            return false;
        }
        tr.set_selection(Selection::collapsed(from + 5));
        return true;
    }

    if empty_paragraph && tr.replace(tb.before, tb.after(), vec![table.clone()]).is_ok() {
        tr.set_selection(Selection::collapsed(tb.before + 4));
        return true;
    }
    let at = tb.after();
    if let Err(e) = tr.replace(at, at, vec![table]) {
        tracing::warn!(error = %e, "table insert rejected");
        return false;
    }
    tr.set_selection(Selection::collapsed(at + 4));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::serialize::to_html;
    use crate::state::EditorState;

    fn run(s: &EditorState, command: TableCommand) -> Option<EditorState> {
        let mut tr = s.transaction();
        run_table_command(&mut tr, command).then(|| s.apply(&tr))
    }

    fn grid(d: &Document) -> Vec<Vec<String>> {
        let table = d.blocks().next().unwrap();
        table
            .content
            .iter()
            .map(|row| {
                row.as_element()
                    .unwrap()
                    .content
                    .iter()
                    .map(|cell| {
                        let el = cell.as_element().unwrap();
                        let tag = if el.node_type() == NodeType::TableHeader { "h" } else { "c" };
                        format!("{tag}:{}", el.text())
                    })
                    .collect()
            })
            .collect()
    }

    fn two_by_two() -> Document {
        doc(vec![table(vec![
            vec![th("a"), th("b")],
            vec![td("c"), td("d")],
        ])])
    }

    // Position of the first character in cell (row, col) of `two_by_two`.
    // Each cell is 5 wide: cell(1) p(1) char(1) close(2).
    fn cell_pos(row: usize, col: usize) -> usize {
        1 + 1 + row * 12 + 1 + col * 5 + 2
    }

    #[test]
    fn test_insert_table_replaces_empty_paragraph() {
        let s = EditorState::default();
        let mut tr = s.transaction();
        assert!(insert_table(&mut tr, 3, 3, true));
        let next = s.apply(&tr);
        assert_eq!(next.doc.root().child_count(), 1);
        assert_eq!(next.selection, Selection::collapsed(5));
        assert!(in_table(&next.doc, 5));
        let g = grid(&next.doc);
        assert_eq!(g.len(), 3);
        assert!(g[0].iter().all(|c| c.starts_with("h:")));
        assert!(g[1].iter().all(|c| c.starts_with("c:")));
    }

    #[test]
    fn test_insert_table_refused_in_table_and_code() {
        let s = EditorState::new(two_by_two())
            .with_selection(Selection::collapsed(cell_pos(0, 0)));
        let mut tr = s.transaction();
        assert!(!insert_table(&mut tr, 2, 2, true));

        let s = EditorState::new(doc(vec![code(None, "x")]));
        let mut tr = s.transaction();
        assert!(!insert_table(&mut tr, 2, 2, true));
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_insert_table_after_non_empty_block() {
        let s = EditorState::new(doc(vec![p_text("intro")]));
        let mut tr = s.transaction();
        assert!(insert_table(&mut tr, 1, 2, false));
        let next = s.apply(&tr);
        assert_eq!(next.doc.root().child_count(), 2);
        // dBlock(p("intro")) is 9 wide.
        assert_eq!(next.selection, Selection::collapsed(9 + 5));
    }

    #[test]
    fn test_huge_colspan_stays_bounded() {
        let d = crate::parse::parse_html(
            "<table><tr><td colspan=\"18446744073709551615\">x</td></tr></table>",
        );
        let s = EditorState::new(d).with_selection(Selection::collapsed(5));
        let added = run(&s, TableCommand::AddColumnAfter).unwrap();
        let table = added.doc.blocks().next().unwrap();
        assert_eq!(TableMap::from_table(table).width, CellAttrs::MAX_COLSPAN + 1);
        assert_eq!(grid(&added.doc), vec![vec!["c:x", "c:"]]);

        let oversized = Element {
            kind: NodeKind::Table,
            content: vec![Node::element(
                NodeKind::TableRow,
                vec![Node::element(
                    NodeKind::TableCell(CellAttrs {
                        colspan: usize::MAX,
                        rowspan: 1,
                    }),
                    vec![p_text("y")],
                )],
            )],
        };
        assert_eq!(TableMap::from_table(&oversized).width, CellAttrs::MAX_COLSPAN);
    }

    #[test]
    fn test_add_and_delete_column() {
        let s = EditorState::new(two_by_two())
            .with_selection(Selection::collapsed(cell_pos(1, 0)));
        let added = run(&s, TableCommand::AddColumnAfter).unwrap();
        assert_eq!(
            grid(&added.doc),
            vec![vec!["h:a", "h:", "h:b"], vec!["c:c", "c:", "c:d"]]
        );
        let tb = added.doc.textblock_at(added.selection.head).unwrap();
        assert_eq!(added.doc.element_at(&tb.path).unwrap().text(), "c");

        let removed = run(&added, TableCommand::DeleteColumn).unwrap();
        assert_eq!(grid(&removed.doc), vec![vec!["h:", "h:b"], vec!["c:", "c:d"]]);
    }

    #[test]
    fn test_add_row_before_and_delete_row() {
        let s = EditorState::new(two_by_two())
            .with_selection(Selection::collapsed(cell_pos(1, 1)));
        let added = run(&s, TableCommand::AddRowBefore).unwrap();
        assert_eq!(
            grid(&added.doc),
            vec![vec!["h:a", "h:b"], vec!["c:", "c:"], vec!["c:c", "c:d"]]
        );
        let removed = run(&added, TableCommand::DeleteRow).unwrap();
        assert_eq!(grid(&removed.doc), vec![vec!["h:a", "h:b"], vec!["c:", "c:"]]);
    }

    #[test]
    fn test_delete_last_column_refused() {
        let d = doc(vec![table(vec![vec![td("x")], vec![td("y")]])]);
        let s = EditorState::new(d).with_selection(Selection::collapsed(5));
        assert!(run(&s, TableCommand::DeleteColumn).is_none());
    }

    #[test]
    fn test_merge_requires_two_cells_then_split() {
        let s = EditorState::new(two_by_two())
            .with_selection(Selection::collapsed(cell_pos(1, 0)));
        assert!(run(&s, TableCommand::MergeCells).is_none());

        let s = s.with_selection(Selection::new(cell_pos(1, 0), cell_pos(1, 1)));
        let merged = run(&s, TableCommand::MergeCells).unwrap();
        assert_eq!(grid(&merged.doc), vec![vec!["h:a", "h:b"], vec!["c:cd"]]);
        assert!(to_html(&merged.doc).contains("colspan=\"2\""));

        let split = run(&merged, TableCommand::SplitCell).unwrap();
        assert_eq!(grid(&split.doc), vec![vec!["h:a", "h:b"], vec!["c:cd", "c:"]]);
        assert!(run(&split, TableCommand::SplitCell).is_none());
    }

    #[test]
    fn test_vertical_merge_drops_empty_row() {
        let s = EditorState::new(doc(vec![table(vec![vec![td("a")], vec![td("b")]])]));
        // Cells are 5 wide, rows 7: a at 5, b at 12.
        let s = s.with_selection(Selection::new(5, 12));
        let merged = run(&s, TableCommand::MergeCells).unwrap();
        assert_eq!(grid(&merged.doc), vec![vec!["c:ab"]]);
    }

    #[test]
    fn test_toggle_header_row_and_column() {
        let s = EditorState::new(two_by_two())
            .with_selection(Selection::collapsed(cell_pos(1, 1)));
        let plain = run(&s, TableCommand::ToggleHeaderRow).unwrap();
        assert_eq!(grid(&plain.doc), vec![vec!["c:a", "c:b"], vec!["c:c", "c:d"]]);
        let column = run(&plain, TableCommand::ToggleHeaderColumn).unwrap();
        assert_eq!(grid(&column.doc), vec![vec!["h:a", "c:b"], vec!["h:c", "c:d"]]);
        let cell = run(&column, TableCommand::ToggleHeaderCell).unwrap();
        assert_eq!(grid(&cell.doc), vec![vec!["h:a", "c:b"], vec!["h:c", "h:d"]]);
    }

    #[test]
    fn test_delete_table_leaves_empty_document() {
        let s = EditorState::new(two_by_two())
            .with_selection(Selection::collapsed(cell_pos(0, 1)));
        let next = run(&s, TableCommand::DeleteTable).unwrap();
        assert_eq!(next.doc, Document::default());
        assert_eq!(next.selection, Selection::collapsed(2));
    }

    #[test]
    fn test_command_names_round_trip() {
        for command in TableCommand::ALL {
            assert_eq!(TableCommand::from_name(command.name()), Some(command));
        }
    }
}
