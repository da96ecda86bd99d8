use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{CursorMove, Input, Key, TextArea};

use crate::cache::CacheManager;
use crate::config::Theme;

use super::text_input_common::{add_to_history, load_history_impl, save_history_impl};

/// Event emitted by TextInput widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Submit,         // Enter pressed
    Cancel,         // Esc pressed
    HistoryChanged, // Up/Down moved through history
}

/// Previous submissions of one input, persisted in the cache dir.
#[derive(Debug, Clone)]
struct InputHistory {
    id: String,
    entries: Vec<String>,
    limit: usize,
    loaded: bool,
    position: Option<usize>, // None = editing a new value
    draft: Option<String>,   // what was typed before browsing
}

impl InputHistory {
    fn new(id: String) -> Self {
        Self {
            id,
            entries: Vec::new(),
            limit: 1000,
            loaded: false,
            position: None,
            draft: None,
        }
    }

    fn ensure_loaded(&mut self, cache: &CacheManager) -> Result<()> {
        if !self.loaded {
            self.entries = load_history_impl(cache, &self.id)?;
            self.loaded = true;
        }
        Ok(())
    }

    fn record(&mut self, cache: &CacheManager, entry: &str) -> Result<()> {
        if entry.trim().is_empty() {
            return Ok(());
        }
        // Keep entries written by earlier sessions
        self.ensure_loaded(cache)?;
        add_to_history(&mut self.entries, entry.to_string());
        save_history_impl(cache, &self.id, &self.entries, self.limit)
    }

    /// Step to an older entry, remembering `current` as the draft.
    fn older(&mut self, current: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.position {
            Some(pos) => pos.saturating_sub(1),
            None => {
                self.draft = Some(current.to_string());
                self.entries.len() - 1
            }
        };
        self.position = Some(next);
        self.entries.get(next).cloned()
    }

    /// Step to a newer entry; past the newest gives back the draft.
    fn newer(&mut self) -> Option<String> {
        let pos = self.position?;
        if pos + 1 >= self.entries.len() {
            self.position = None;
            self.draft.take()
        } else {
            self.position = Some(pos + 1);
            self.entries.get(pos + 1).cloned()
        }
    }

    fn stop_browsing(&mut self) {
        self.position = None;
        self.draft = None;
    }
}

/// Single-line text input wrapping tui-textarea, with optional persistent history.
pub struct TextInput {
    textarea: TextArea<'static>,
    value: String,
    history: Option<InputHistory>,
    style: Style,
    read_only: bool,
    focused: bool,
}

impl TextInput {
    pub fn new() -> Self {
        let mut input = Self {
            textarea: TextArea::default(),
            value: String::new(),
            history: None,
            style: Style::default(),
            read_only: false,
            focused: false,
        };
        input.reset_textarea();
        input
    }

    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.style = Style::default().fg(theme.get("text_primary"));
        self.textarea.set_style(self.style);
        self.set_focused(self.focused);
        self
    }

    /// Enable persistent history under the given id
    pub fn with_history(mut self, history_id: String) -> Self {
        self.history = Some(InputHistory::new(history_id));
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        if let Some(history) = self.history.as_mut() {
            history.limit = limit;
        }
        self
    }

    /// Read-only inputs render their value but ignore editing keys.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        let cursor_style = if focused && !self.read_only {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            // Same as the text: no visible cursor
            self.style
        };
        self.textarea.set_cursor_style(cursor_style);
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value and put the cursor at its end
    pub fn set_value(&mut self, value: String) {
        self.value = value.replace(['\n', '\r'], " ");
        let end = self.value.chars().count().min(u16::MAX as usize) as u16;
        self.reset_textarea();
        self.textarea.move_cursor(CursorMove::Jump(0, end));
    }

    pub fn clear(&mut self) {
        self.set_value(String::new());
        if let Some(history) = self.history.as_mut() {
            history.stop_browsing();
        }
    }

    /// Rebuild the textarea from `value`; a new TextArea loses styles.
    fn reset_textarea(&mut self) {
        self.textarea = TextArea::new(vec![self.value.clone()]);
        self.textarea.set_style(self.style);
        self.textarea.set_cursor_line_style(Style::default());
        self.set_focused(self.focused);
    }

    fn sync_from_textarea(&mut self) {
        self.value = self.textarea.lines().first().cloned().unwrap_or_default();
    }

    fn browse(&mut self, older: bool, cache: Option<&CacheManager>) {
        let current = self.value.clone();
        let Some(history) = self.history.as_mut() else {
            return;
        };
        if let Some(cache) = cache {
            if let Err(e) = history.ensure_loaded(cache) {
                tracing::warn!(error = %e, "could not load input history");
                return;
            }
        }
        let entry = if older {
            history.older(&current)
        } else {
            history.newer()
        };
        if let Some(entry) = entry {
            self.set_value(entry);
        }
    }

    /// Handle a key event. History is saved on submit when a cache is given.
    pub fn handle_key(&mut self, event: &KeyEvent, cache: Option<&CacheManager>) -> TextInputEvent {
        let has_history = self.history.is_some();
        match event.code {
            KeyCode::Enter => {
                if let (Some(cache), Some(history)) = (cache, self.history.as_mut()) {
                    if let Err(e) = history.record(cache, &self.value) {
                        tracing::warn!(error = %e, "could not save input history");
                    }
                    history.stop_browsing();
                }
                return TextInputEvent::Submit;
            }
            KeyCode::Esc => return TextInputEvent::Cancel,
            KeyCode::Up if has_history => {
                self.browse(true, cache);
                return TextInputEvent::HistoryChanged;
            }
            KeyCode::Down if has_history => {
                self.browse(false, cache);
                return TextInputEvent::HistoryChanged;
            }
            _ => {}
        }

        if self.read_only {
            return TextInputEvent::None;
        }
        let input = key_event_to_input(event);
        if input.key == Key::Null {
            return TextInputEvent::None;
        }
        self.textarea.input(input);
        self.sync_from_textarea();
        if let Some(history) = self.history.as_mut() {
            history.stop_browsing();
        }
        TextInputEvent::None
    }
}

/// Editing keys understood by a single-line input; anything else is `Key::Null`.
fn key_event_to_input(event: &KeyEvent) -> Input {
    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => Key::Null,
    };

    Input {
        key,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        self.textarea.render(area, buf);

        // tui-textarea underlines the cursor line; single-line inputs don't want that
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let cell = &mut buf[(x, y)];
                let style = cell.style().remove_modifier(Modifier::UNDERLINED);
                cell.set_style(style);
            }
        }
    }
}
