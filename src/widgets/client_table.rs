use std::collections::BTreeSet;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Padding, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::store::{ClientStore, RowIndex};

/// Selection, marks and scroll position for the client table.
///
/// Selection is a position in the current row list (the search result).
/// Marks are row indices and only cover rows in that list.
#[derive(Debug, Default)]
pub struct ClientTableState {
    pub table_state: TableState,
    pub marked: BTreeSet<RowIndex>,
    pub col_offset: usize,
    visible_rows: usize,
}

impl ClientTableState {
    pub fn selected(&self) -> Option<usize> {
        self.table_state.selected()
    }

    /// Row index under the cursor, given the rows currently shown.
    pub fn selected_index(&self, rows: &[RowIndex]) -> Option<RowIndex> {
        self.table_state.selected().and_then(|pos| rows.get(pos).copied())
    }

    /// Keep the selection inside `len` rows, selecting the first row if none.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.table_state.select(None);
            *self.table_state.offset_mut() = 0;
            return;
        }
        let pos = self.table_state.selected().unwrap_or(0).min(len - 1);
        self.table_state.select(Some(pos));
    }

    pub fn select_next(&mut self, len: usize) {
        self.move_by(1, len);
    }

    pub fn select_previous(&mut self, len: usize) {
        self.move_by(-1, len);
    }

    pub fn page_down(&mut self, len: usize) {
        self.move_by(self.visible_rows.max(1) as i64, len);
    }

    pub fn page_up(&mut self, len: usize) {
        self.move_by(-(self.visible_rows.max(1) as i64), len);
    }

    pub fn select_first(&mut self, len: usize) {
        self.table_state.select((len > 0).then_some(0));
    }

    pub fn select_last(&mut self, len: usize) {
        self.table_state.select(len.checked_sub(1));
    }

    /// Move the cursor to the row with the given index, if it is shown.
    pub fn select_index(&mut self, rows: &[RowIndex], index: RowIndex) {
        if let Some(pos) = rows.iter().position(|&r| r == index) {
            self.table_state.select(Some(pos));
        }
    }

    fn move_by(&mut self, delta: i64, len: usize) {
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as i64;
        let next = (current + delta).clamp(0, len as i64 - 1);
        self.table_state.select(Some(next as usize));
    }

    pub fn scroll_right(&mut self, num_columns: usize) {
        if self.col_offset + 1 < num_columns {
            self.col_offset += 1;
        }
    }

    pub fn scroll_left(&mut self) {
        self.col_offset = self.col_offset.saturating_sub(1);
    }

    /// Mark or unmark a row for deletion. Returns true when it is now marked.
    pub fn toggle_mark(&mut self, index: RowIndex) -> bool {
        if self.marked.remove(&index) {
            false
        } else {
            self.marked.insert(index);
            true
        }
    }

    /// Marked rows that are shown if any, else the row under the cursor.
    pub fn targets(&self, rows: &[RowIndex]) -> Vec<RowIndex> {
        let marked: Vec<RowIndex> = self
            .marked
            .iter()
            .copied()
            .filter(|i| rows.binary_search(i).is_ok())
            .collect();
        if !marked.is_empty() {
            return marked;
        }
        self.selected_index(rows).into_iter().collect()
    }

    /// Drop marks on rows that are no longer shown, deleted or filtered out.
    /// `rows` is in store order.
    pub fn retain_visible(&mut self, rows: &[RowIndex]) {
        self.marked.retain(|i| rows.binary_search(i).is_ok());
    }

    /// Scroll vertically so the selection is on screen.
    fn ensure_selection_visible(&mut self, len: usize) {
        let visible = self.visible_rows.max(1);
        let offset = self.table_state.offset().min(len.saturating_sub(1));
        let offset = match self.table_state.selected() {
            Some(sel) if sel < offset => sel,
            Some(sel) if sel >= offset + visible => sel + 1 - visible,
            _ => offset,
        };
        *self.table_state.offset_mut() = offset;
    }
}

/// Table of client rows showing the store's display columns.
pub struct ClientTable<'a> {
    store: &'a ClientStore,
    rows: &'a [RowIndex],
    title: Option<String>,
    row_numbers: bool,
    cell_padding: u16,
    max_column_width: u16,
    header_fg: Color,
    border_fg: Color,
    selected_fg: Color,
    marked_fg: Color,
    dimmed_fg: Color,
}

impl<'a> ClientTable<'a> {
    pub fn new(store: &'a ClientStore, rows: &'a [RowIndex]) -> Self {
        Self {
            store,
            rows,
            title: None,
            row_numbers: false,
            cell_padding: 1,
            max_column_width: 40,
            header_fg: Color::White,
            border_fg: Color::DarkGray,
            selected_fg: Color::Reset,
            marked_fg: Color::Yellow,
            dimmed_fg: Color::DarkGray,
        }
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_row_numbers(mut self, row_numbers: bool) -> Self {
        self.row_numbers = row_numbers;
        self
    }

    pub fn with_cell_padding(mut self, padding: u16) -> Self {
        self.cell_padding = padding;
        self
    }

    pub fn with_max_column_width(mut self, width: u16) -> Self {
        self.max_column_width = width;
        self
    }

    pub fn with_colors(
        mut self,
        header_fg: Color,
        border_fg: Color,
        selected_fg: Color,
        marked_fg: Color,
        dimmed_fg: Color,
    ) -> Self {
        self.header_fg = header_fg;
        self.border_fg = border_fg;
        self.selected_fg = selected_fg;
        self.marked_fg = marked_fg;
        self.dimmed_fg = dimmed_fg;
        self
    }

    /// Display columns starting at `col_offset`, with the widths that fit `width`.
    fn layout_columns(&self, col_offset: usize, start: usize, end: usize, width: u16) -> Vec<(&'a str, u16)> {
        let store = self.store;
        let mut out = Vec::new();
        let mut used: u16 = 0;

        for name in store.display_columns().iter().skip(col_offset) {
            let mut max_len = Span::raw(name.as_str()).width() as u16;
            for &index in &self.rows[start..end] {
                if let Some(value) = store.get(index).and_then(|r| store.value(r, name)) {
                    max_len = max_len.max(Span::raw(value.to_string()).width() as u16);
                }
            }
            let col_width = max_len.clamp(1, self.max_column_width.max(1));
            let remaining = width.saturating_sub(used);
            if remaining == 0 {
                break;
            }
            if col_width > remaining {
                // Last column is cut at the edge, but only if some of it fits
                if out.is_empty() || remaining >= 4 {
                    out.push((name.as_str(), remaining));
                }
                break;
            }
            out.push((name.as_str(), col_width));
            used = used.saturating_add(col_width + self.cell_padding);
        }
        out
    }
}

impl StatefulWidget for ClientTable<'_> {
    type State = ClientTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let mut block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(self.border_fg));
        if let Some(title) = self.title.as_deref() {
            block = block.title(Span::styled(
                format!(" {} ", title),
                Style::default().fg(self.header_fg),
            ));
        }
        let inner = block.inner(area);
        block.render(area, buf);

        if self.rows.is_empty() {
            let message = if self.store.is_empty() {
                "No clients in this file. Press a to add one."
            } else {
                "No clients match the search. Press R to reset."
            };
            Paragraph::new(message)
                .centered()
                .style(Style::default().fg(self.dimmed_fg))
                .block(Block::default().padding(Padding::top(inner.height / 2)))
                .render(inner, buf);
            return;
        }

        // One line for the header
        state.visible_rows = inner.height.saturating_sub(1) as usize;
        state.clamp(self.rows.len());
        state.ensure_selection_visible(self.rows.len());

        let start = state.table_state.offset();
        let end = (start + state.visible_rows).min(self.rows.len());

        let row_num_width = if self.row_numbers {
            self.rows.len().to_string().len() as u16 + 1
        } else {
            0
        };
        let columns = self.layout_columns(
            state.col_offset,
            start,
            end,
            inner.width.saturating_sub(row_num_width),
        );

        let header_style = Style::default()
            .fg(self.header_fg)
            .add_modifier(Modifier::BOLD);
        let mut header: Vec<Cell> = Vec::with_capacity(columns.len() + 1);
        if self.row_numbers {
            header.push(Cell::from("#"));
        }
        header.extend(columns.iter().map(|(name, _)| Cell::from(*name)));

        let rows: Vec<Row> = self.rows[start..end]
            .iter()
            .enumerate()
            .map(|(i, &index)| {
                let mut cells: Vec<Cell> = Vec::with_capacity(columns.len() + 1);
                if self.row_numbers {
                    cells.push(
                        Cell::from(Line::from((start + i + 1).to_string()).right_aligned())
                            .style(Style::default().fg(self.dimmed_fg)),
                    );
                }
                let record = self.store.get(index);
                for (name, _) in &columns {
                    let text = record
                        .and_then(|r| self.store.value(r, name))
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    cells.push(Cell::from(text));
                }
                let style = if state.marked.contains(&index) {
                    Style::default()
                        .fg(self.marked_fg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Row::new(cells).style(style)
            })
            .collect();

        let mut widths: Vec<Constraint> = Vec::with_capacity(columns.len() + 1);
        if self.row_numbers {
            widths.push(Constraint::Length(row_num_width.saturating_sub(1)));
        }
        widths.extend(columns.iter().map(|(_, w)| Constraint::Length(*w)));

        let highlight = if self.selected_fg == Color::Reset {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
                .fg(self.selected_fg)
                .add_modifier(Modifier::REVERSED)
        };

        // Only the visible window is handed to the table, so its state is window-relative
        let mut window_state =
            TableState::default().with_selected(state.table_state.selected().map(|s| s.saturating_sub(start)));
        StatefulWidget::render(
            Table::new(rows, widths)
                .column_spacing(self.cell_padding)
                .header(Row::new(header).style(header_style))
                .row_highlight_style(highlight),
            inner,
            buf,
            &mut window_state,
        );
    }
}
