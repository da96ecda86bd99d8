use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use super::text_input::{TextInput, TextInputEvent};
use crate::config::Theme;
use crate::store::{ClientStore, RowIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(RowIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    None,
    Submit,
    Cancel,
}

pub struct FormField {
    pub column: String,
    pub original: String,
    pub input: TextInput,
}

/// Add/edit form: one input per display column.
pub struct RecordForm {
    pub mode: FormMode,
    pub fields: Vec<FormField>,
    pub focus: usize,
    title: String,
    label_color: Color,
    focused_color: Color,
    border_color: Color,
    dimmed_color: Color,
}

impl RecordForm {
    /// Empty form for a new client.
    pub fn for_add(store: &ClientStore) -> Self {
        let fields = store
            .display_columns()
            .iter()
            .map(|column| FormField {
                column: column.clone(),
                original: String::new(),
                input: TextInput::new(),
            })
            .collect();
        Self::build(FormMode::Add, "Add client".to_string(), fields)
    }

    /// Form filled with the row's current values. The client ID is read-only.
    /// Returns `None` if the row does not exist.
    pub fn for_edit(store: &ClientStore, index: RowIndex) -> Option<Self> {
        let record = store.get(index)?;
        let id_column = store.id_column();
        let fields = store
            .display_columns()
            .iter()
            .map(|column| {
                let original = store
                    .value(record, column)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let mut input = TextInput::new().with_read_only(id_column == Some(column.as_str()));
                input.set_value(original.clone());
                FormField {
                    column: column.clone(),
                    original,
                    input,
                }
            })
            .collect();
        let title = match store.id_column().and_then(|c| store.value(record, c)) {
            Some(id) if !id.is_empty() => format!("Edit client {}", id),
            _ => format!("Edit row {}", index + 1),
        };
        Some(Self::build(FormMode::Edit(index), title, fields))
    }

    fn build(mode: FormMode, title: String, fields: Vec<FormField>) -> Self {
        let mut form = Self {
            mode,
            fields,
            focus: 0,
            title,
            label_color: Color::White,
            focused_color: Color::Cyan,
            border_color: Color::Cyan,
            dimmed_color: Color::DarkGray,
        };
        // Start on the first editable field
        if let Some(first) = form.fields.iter().position(|f| !f.input.is_read_only()) {
            form.focus = first;
        }
        form.sync_focus();
        form
    }

    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.label_color = theme.get("text_primary");
        self.focused_color = theme.get("primary");
        self.border_color = theme.get("modal_border_active");
        self.dimmed_color = theme.get("dimmed");
        for field in &mut self.fields {
            let input = std::mem::take(&mut field.input);
            field.input = input.with_theme(theme);
        }
        self.sync_focus();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn sync_focus(&mut self) {
        let focus = self.focus;
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.input.set_focused(i == focus);
        }
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
            self.sync_focus();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
            self.sync_focus();
        }
    }

    pub fn field_mut(&mut self, column: &str) -> Option<&mut TextInput> {
        self.fields
            .iter_mut()
            .find(|f| f.column == column)
            .map(|f| &mut f.input)
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> FormEvent {
        match event.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus_next();
                return FormEvent::None;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_previous();
                return FormEvent::None;
            }
            KeyCode::Char('s') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                return FormEvent::Submit;
            }
            _ => {}
        }
        let Some(field) = self.fields.get_mut(self.focus) else {
            return match event.code {
                KeyCode::Esc => FormEvent::Cancel,
                KeyCode::Enter => FormEvent::Submit,
                _ => FormEvent::None,
            };
        };
        match field.input.handle_key(event, None) {
            TextInputEvent::Submit => FormEvent::Submit,
            TextInputEvent::Cancel => FormEvent::Cancel,
            TextInputEvent::None | TextInputEvent::HistoryChanged => FormEvent::None,
        }
    }

    /// Column/value pairs to hand to the store: every field for a new
    /// client, only changed fields for an edit.
    pub fn values(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|f| match self.mode {
                FormMode::Add => true,
                FormMode::Edit(_) => !f.input.is_read_only() && f.input.value() != f.original,
            })
            .map(|f| (f.column.clone(), f.input.value().trim().to_string()))
            .collect()
    }

    /// Height needed to show every field plus borders and the hint line.
    pub fn preferred_height(&self) -> u16 {
        self.fields.len() as u16 + 4
    }
}

impl Widget for &RecordForm {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title.as_str())
            .border_style(Style::default().fg(self.border_color));
        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        let body = chunks[0];

        let label_width = self
            .fields
            .iter()
            .map(|f| Span::raw(f.column.as_str()).width() as u16)
            .max()
            .unwrap_or(0)
            .min(body.width / 2)
            + 2;

        // Scroll so the focused field stays visible
        let visible = body.height as usize;
        let start = if visible == 0 || self.focus < visible {
            0
        } else {
            self.focus + 1 - visible
        };

        for (i, field) in self.fields.iter().enumerate().skip(start).take(visible) {
            let y = body.y + (i - start) as u16;
            let row = Rect::new(body.x, y, body.width, 1);
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(label_width), Constraint::Fill(1)])
                .split(row);

            let label_style = if i == self.focus {
                Style::default()
                    .fg(self.focused_color)
                    .add_modifier(Modifier::BOLD)
            } else if field.input.is_read_only() {
                Style::default().fg(self.dimmed_color)
            } else {
                Style::default().fg(self.label_color)
            };
            Paragraph::new(field.column.as_str())
                .style(label_style)
                .render(cols[0], buf);
            (&field.input).render(cols[1], buf);
        }

        let hint = match self.mode {
            FormMode::Add => "Tab/↑↓ Field  Enter Save  Esc Cancel",
            FormMode::Edit(_) => "Tab/↑↓ Field  Enter Apply  Esc Cancel  (ID is read-only)",
        };
        Paragraph::new(hint)
            .style(Style::default().fg(self.dimmed_color))
            .render(chunks[1], buf);
    }
}
