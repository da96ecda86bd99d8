use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, StatefulWidget, Wrap};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub mod cache;
pub mod config;
pub mod error_display;
pub mod logging;
pub mod store;
pub mod widgets;

pub use cache::CacheManager;
pub use clientbook_cli::{Args, FileFormat};
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use store::{ClientField, ClientStore, MatchMode, RowIndex, StoreError, Value};

use config::DisplayConfig;
use error_display::user_message_from_store;
use widgets::client_table::{ClientTable, ClientTableState};
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::record_form::{FormEvent, FormMode, RecordForm};
use widgets::text_input::{TextInput, TextInputEvent};

/// Application name used for cache directory and other app-specific paths
pub const APP_NAME: &str = "clientbook";

/// History id for the search box (`search_history.txt` in the cache dir)
const SEARCH_HISTORY_ID: &str = "search";

/// How to open a client file and how to search it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub delimiter: Option<u8>,
    /// Overrides extension-based format detection
    pub format: Option<FileFormat>,
    /// Sheet name or 0-based index for spreadsheets
    pub sheet: Option<String>,
    /// Field keys or column names to search (empty = all display columns)
    pub search_fields: Vec<String>,
    pub match_mode: MatchMode,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = fields;
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// CLI arguments override config values.
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let mut opts = OpenOptions::new();

        opts.delimiter = args.delimiter.or(config.file_loading.delimiter);
        opts.format = args.format;
        opts.sheet = args
            .sheet
            .clone()
            .or_else(|| config.file_loading.sheet.clone());

        opts.search_fields = if args.search_fields.is_empty() {
            config.search.fields.clone()
        } else {
            args.search_fields.clone()
        };
        opts.match_mode = args
            .match_mode
            .map(MatchMode::from)
            .unwrap_or_else(|| config.match_mode());

        opts
    }
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf, OpenOptions),
    DoLoad(PathBuf, OpenOptions), // Performs the load after the UI shows "Loading"
    Search(String),
    ToggleMatchMode,
    Reset,
    Add(Vec<(String, String)>),
    Edit(RowIndex, Vec<(String, String)>),
    Delete(Vec<RowIndex>),
    Save(Option<PathBuf>), // None = save over the loaded file
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Searching,
    Form,
    ConfirmDelete,
    ConfirmQuit,
    SavingAs,
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

/// One-line feedback under the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    store: Option<ClientStore>,
    rows: Vec<RowIndex>, // Indices of the rows matching the current search
    query: String,
    query_before_search: String,
    match_mode: MatchMode,
    table_state: ClientTableState,
    events: Sender<AppEvent>,
    debug: DebugState,
    pub input_mode: InputMode,
    search_input: TextInput,
    path_input: TextInput,
    form: Option<RecordForm>,
    pending_delete: Vec<RowIndex>,
    exit_after_save: bool,
    error_modal: ErrorModal,
    status: Option<StatusMessage>,
    loading: Option<PathBuf>,
    show_help: bool,
    help_scroll: usize,
    cache: CacheManager,
    history_enabled: bool,
    display: DisplayConfig,
    theme: Theme,
}

impl App {
    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(events, Theme::default(), AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, theme: Theme, app_config: AppConfig) -> App {
        let cache = CacheManager::new(APP_NAME).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not initialize cache manager");
            CacheManager::with_dir(std::env::temp_dir().join(APP_NAME))
        });

        let search_input = TextInput::new()
            .with_theme(&theme)
            .with_history(SEARCH_HISTORY_ID.to_string())
            .with_history_limit(app_config.search.history_limit);
        let path_input = TextInput::new().with_theme(&theme);

        App {
            store: None,
            rows: Vec::new(),
            query: String::new(),
            query_before_search: String::new(),
            match_mode: app_config.match_mode(),
            table_state: ClientTableState::default(),
            events,
            debug: DebugState::default(),
            input_mode: InputMode::Normal,
            search_input,
            path_input,
            form: None,
            pending_delete: Vec::new(),
            exit_after_save: false,
            error_modal: ErrorModal::new(),
            status: None,
            loading: None,
            show_help: false,
            help_scroll: 0,
            cache,
            history_enabled: app_config.search.enable_history,
            display: app_config.display,
            theme,
        }
    }

    /// Use a different cache directory (search history lives there)
    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = cache;
        self
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn set_log_path(&mut self, path: Option<PathBuf>) {
        self.debug.log_path = path.map(|p| p.display().to_string());
    }

    /// Get a color from the theme by name
    fn color(&self, name: &str) -> Color {
        self.theme.get(name)
    }

    pub fn store(&self) -> Option<&ClientStore> {
        self.store.as_ref()
    }

    /// Row indices currently shown, in table order
    pub fn rows(&self) -> &[RowIndex] {
        &self.rows
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_modal
            .active
            .then_some(self.error_modal.message.as_str())
    }

    pub fn selected_index(&self) -> Option<RowIndex> {
        self.table_state.selected_index(&self.rows)
    }

    pub fn marked(&self) -> impl Iterator<Item = RowIndex> + '_ {
        self.table_state.marked.iter().copied()
    }

    pub fn form_mut(&mut self) -> Option<&mut RecordForm> {
        self.form.as_mut()
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn show_error(&mut self, err: StoreError) {
        let message = user_message_from_store(&err);
        tracing::warn!(error = %err, "operation failed");
        self.status = Some(StatusMessage {
            text: message.clone(),
            is_error: true,
        });
        self.error_modal.show(message);
    }

    fn load(&mut self, path: &std::path::Path, options: &OpenOptions) -> Result<(), StoreError> {
        let store = ClientStore::load(path, options)?;
        self.match_mode = options.match_mode;
        self.query.clear();
        self.table_state = ClientTableState::default();

        let mapped: Vec<&str> = store.column_map().iter().map(|(f, _)| f.key()).collect();
        let summary = format!(
            "Loaded {} clients from {} (fields: {})",
            store.len(),
            path.display(),
            if mapped.is_empty() {
                "none recognized".to_string()
            } else {
                mapped.join(", ")
            }
        );
        self.store = Some(store);
        self.refresh();
        self.set_status(summary);
        Ok(())
    }

    /// Re-run the current search and keep selection and marks valid
    fn refresh(&mut self) {
        let Some(store) = self.store.as_ref() else {
            self.rows.clear();
            return;
        };
        let tokens = store::tokenize(&self.query);
        self.rows = store.search(&tokens, self.match_mode).indices();
        self.table_state.retain_visible(&self.rows);
        self.table_state.clamp(self.rows.len());
    }

    fn open_add_form(&mut self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        self.form = Some(RecordForm::for_add(store).with_theme(&self.theme));
        self.input_mode = InputMode::Form;
    }

    fn open_edit_form(&mut self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let Some(index) = self.table_state.selected_index(&self.rows) else {
            return;
        };
        if let Some(form) = RecordForm::for_edit(store, index) {
            self.form = Some(form.with_theme(&self.theme));
            self.input_mode = InputMode::Form;
        }
    }

    fn close_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
    }

    fn request_quit(&mut self) -> Option<AppEvent> {
        if self.store.as_ref().is_some_and(|s| s.is_dirty()) {
            self.input_mode = InputMode::ConfirmQuit;
            None
        } else {
            Some(AppEvent::Exit)
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        // Error modal has highest priority
        if self.error_modal.active {
            if matches!(event.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_modal.hide();
            }
            return None;
        }

        if self.show_help {
            match event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                    self.help_scroll = 0;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.help_scroll = self.help_scroll.saturating_add(1);
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.help_scroll = self.help_scroll.saturating_sub(1);
                }
                KeyCode::PageDown => {
                    self.help_scroll = self.help_scroll.saturating_add(10);
                }
                KeyCode::PageUp => {
                    self.help_scroll = self.help_scroll.saturating_sub(10);
                }
                KeyCode::Home => {
                    self.help_scroll = 0;
                }
                _ => {}
            }
            return None;
        }

        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            self.debug.last_action = "interrupt".to_string();
            return self.request_quit();
        }

        match self.input_mode {
            InputMode::Searching => self.search_key(event),
            InputMode::Form => self.form_key(event),
            InputMode::ConfirmDelete => self.confirm_delete_key(event),
            InputMode::ConfirmQuit => self.confirm_quit_key(event),
            InputMode::SavingAs => self.save_as_key(event),
            InputMode::Normal => self.normal_key(event),
        }
    }

    fn normal_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        let len = self.rows.len();
        match event.code {
            KeyCode::Char('q') => return self.request_quit(),
            KeyCode::Esc if !self.query.is_empty() => return Some(AppEvent::Reset),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('/') => {
                self.query_before_search = self.query.clone();
                self.search_input.set_value(self.query.clone());
                self.search_input.set_focused(true);
                self.input_mode = InputMode::Searching;
            }
            KeyCode::Char('m') => return Some(AppEvent::ToggleMatchMode),
            KeyCode::Char('R') => return Some(AppEvent::Reset),
            KeyCode::Char('a') => self.open_add_form(),
            KeyCode::Enter | KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('d') | KeyCode::Delete => {
                let targets = self.table_state.targets(&self.rows);
                if !targets.is_empty() {
                    self.pending_delete = targets;
                    self.input_mode = InputMode::ConfirmDelete;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(index) = self.table_state.selected_index(&self.rows) {
                    self.table_state.toggle_mark(index);
                    self.table_state.select_next(len);
                }
            }
            KeyCode::Char('w') => return Some(AppEvent::Save(None)),
            KeyCode::Char('W') => {
                let current = self
                    .store
                    .as_ref()
                    .map(|s| s.path().display().to_string())
                    .unwrap_or_default();
                self.path_input.set_value(current);
                self.path_input.set_focused(true);
                self.input_mode = InputMode::SavingAs;
            }
            KeyCode::Down | KeyCode::Char('j') => self.table_state.select_next(len),
            KeyCode::Up | KeyCode::Char('k') => self.table_state.select_previous(len),
            KeyCode::PageDown => self.table_state.page_down(len),
            KeyCode::PageUp => self.table_state.page_up(len),
            KeyCode::Home | KeyCode::Char('g') => self.table_state.select_first(len),
            KeyCode::End | KeyCode::Char('G') => self.table_state.select_last(len),
            KeyCode::Right | KeyCode::Char('l') => {
                let columns = self
                    .store
                    .as_ref()
                    .map(|s| s.display_columns().len())
                    .unwrap_or(0);
                self.table_state.scroll_right(columns);
            }
            KeyCode::Left | KeyCode::Char('h') => self.table_state.scroll_left(),
            _ => {}
        }
        None
    }

    fn search_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        let cache = self.history_enabled.then_some(&self.cache);
        match self.search_input.handle_key(event, cache) {
            TextInputEvent::Submit => {
                self.search_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                Some(AppEvent::Search(self.search_input.value().to_string()))
            }
            TextInputEvent::Cancel => {
                self.search_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                Some(AppEvent::Search(self.query_before_search.clone()))
            }
            // Results follow the input as it is typed
            TextInputEvent::None | TextInputEvent::HistoryChanged => {
                if self.search_input.value() != self.query {
                    Some(AppEvent::Search(self.search_input.value().to_string()))
                } else {
                    None
                }
            }
        }
    }

    fn form_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        let form = self.form.as_mut()?;
        match form.handle_key(event) {
            FormEvent::Submit => {
                let values = form.values();
                match form.mode {
                    FormMode::Add => Some(AppEvent::Add(values)),
                    FormMode::Edit(index) => Some(AppEvent::Edit(index, values)),
                }
            }
            FormEvent::Cancel => {
                self.close_form();
                None
            }
            FormEvent::None => None,
        }
    }

    fn confirm_delete_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match event.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                Some(AppEvent::Delete(std::mem::take(&mut self.pending_delete)))
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.pending_delete.clear();
                self.input_mode = InputMode::Normal;
                None
            }
            _ => None,
        }
    }

    fn confirm_quit_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match event.code {
            KeyCode::Char('w') => {
                self.input_mode = InputMode::Normal;
                self.exit_after_save = true;
                Some(AppEvent::Save(None))
            }
            KeyCode::Char('y') | KeyCode::Char('q') => Some(AppEvent::Exit),
            KeyCode::Char('n') | KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                None
            }
            _ => None,
        }
    }

    fn save_as_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match self.path_input.handle_key(event, None) {
            TextInputEvent::Submit => {
                self.path_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                let path = self.path_input.value().trim().to_string();
                (!path.is_empty()).then(|| AppEvent::Save(Some(PathBuf::from(path))))
            }
            TextInputEvent::Cancel => {
                self.path_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                None
            }
            _ => None,
        }
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path, options) => {
                self.loading = Some(path.clone());
                self.set_status(format!("Loading {}", path.display()));
                // Load after the UI has rendered the loading message
                Some(AppEvent::DoLoad(path.clone(), options.clone()))
            }
            AppEvent::DoLoad(path, options) => {
                self.loading = None;
                match self.load(path, options) {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "load failed");
                        let message = user_message_from_store(&e);
                        if self.store.is_some() {
                            self.show_error(e);
                            None
                        } else {
                            Some(AppEvent::Crash(message))
                        }
                    }
                }
            }
            AppEvent::Search(query) => {
                self.debug.last_action = "search".to_string();
                self.query = query.trim().to_string();
                self.table_state.select_first(0);
                self.refresh();
                if self.store.is_some() && !self.query.is_empty() {
                    self.set_status(format!(
                        "{} match{} ({})",
                        self.rows.len(),
                        if self.rows.len() == 1 { "" } else { "es" },
                        self.match_mode.label()
                    ));
                }
                None
            }
            AppEvent::ToggleMatchMode => {
                self.match_mode = self.match_mode.toggle();
                self.refresh();
                self.set_status(format!(
                    "Match mode: {} ({} shown)",
                    self.match_mode.label(),
                    self.rows.len()
                ));
                None
            }
            AppEvent::Reset => {
                self.query.clear();
                self.search_input.clear();
                self.table_state.marked.clear();
                self.refresh();
                self.set_status("Search cleared");
                None
            }
            AppEvent::Add(values) => {
                let store = self.store.as_mut()?;
                match store.add(values.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
                    Ok(index) => {
                        self.debug.last_action = "add".to_string();
                        self.close_form();
                        self.refresh();
                        self.table_state.select_index(&self.rows, index);
                        let shown = self.rows.contains(&index);
                        self.set_status(if shown {
                            "Client added".to_string()
                        } else {
                            "Client added (hidden by the current search)".to_string()
                        });
                    }
                    Err(e) => self.show_error(e.into()),
                }
                None
            }
            AppEvent::Edit(index, values) => {
                let store = self.store.as_mut()?;
                match store.edit(*index, values.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
                    Ok(()) => {
                        self.debug.last_action = "edit".to_string();
                        self.close_form();
                        self.refresh();
                        self.set_status(if values.is_empty() {
                            "No changes"
                        } else {
                            "Client updated"
                        });
                    }
                    Err(e) => self.show_error(e.into()),
                }
                None
            }
            AppEvent::Delete(indices) => {
                let store = self.store.as_mut()?;
                let removed = store.delete(indices.iter().copied());
                self.debug.last_action = "delete".to_string();
                self.table_state.marked.clear();
                self.refresh();
                self.set_status(format!(
                    "Deleted {} client{}",
                    removed,
                    if removed == 1 { "" } else { "s" }
                ));
                None
            }
            AppEvent::Save(target) => {
                let store = self.store.as_mut()?;
                let rows = store.len();
                match store.save(target.as_deref()) {
                    Ok(path) => {
                        self.debug.last_action = "save".to_string();
                        self.set_status(format!("Saved {} clients to {}", rows, path.display()));
                        if std::mem::take(&mut self.exit_after_save) {
                            return Some(AppEvent::Exit);
                        }
                    }
                    Err(e) => {
                        self.exit_after_save = false;
                        self.show_error(e.into());
                    }
                }
                None
            }
            AppEvent::Resize(_cols, _rows) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn title(&self) -> String {
        let Some(store) = self.store.as_ref() else {
            return APP_NAME.to_string();
        };
        let name = store
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| store.path().display().to_string());
        let mut title = match store.sheet_name() {
            Some(sheet) => format!("{} [{}]", name, sheet),
            None => name,
        };
        if !self.query.is_empty() {
            title.push_str(&format!(" / {}", self.query));
        }
        if store.is_dirty() {
            title.push_str(" (modified)");
        }
        title
    }

    fn render_input(&self, area: Rect, buf: &mut Buffer) {
        let (title, input) = match self.input_mode {
            InputMode::SavingAs => ("Save as (.csv, .tsv or .xlsx)", &self.path_input),
            _ => {
                let title = match self.match_mode {
                    MatchMode::All => "Search (all keywords)",
                    MatchMode::Any => "Search (any keyword)",
                };
                (title, &self.search_input)
            }
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(self.color("modal_border_active")));
        let inner = block.inner(area);
        block.render(area, buf);
        input.render(inner, buf);
    }

    fn render_confirm(&self, area: Rect, buf: &mut Buffer, title: &str, body: Vec<Line>) {
        let popup = centered_rect_fixed(area, 56, body.len() as u16 + 2);
        Clear.render(popup, buf);
        Paragraph::new(body)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(self.color("warning"))),
            )
            .render(popup, buf);
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 60, 70);
        Clear.render(popup_area, buf);
        let key_style = Style::default()
            .fg(self.color("primary"))
            .add_modifier(Modifier::BOLD);
        let lines: Vec<Line> = HELP_TEXT
            .iter()
            .map(|(key, text)| {
                if key.is_empty() {
                    Line::from(Span::styled(
                        *text,
                        Style::default().fg(self.color("secondary")),
                    ))
                } else {
                    Line::from(vec![
                        Span::styled(format!("{:<14}", key), key_style),
                        Span::raw(*text),
                    ])
                }
            })
            .collect();
        let max_scroll = lines.len().saturating_sub(popup_area.height.saturating_sub(2) as usize);
        Paragraph::new(lines)
            .scroll((self.help_scroll.min(max_scroll) as u16, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help")
                    .border_style(Style::default().fg(self.color("modal_border"))),
            )
            .render(popup_area, buf);
    }

    fn render_error(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 70, 40);
        Clear.render(popup_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .border_style(Style::default().fg(self.color("modal_border_error")));
        let inner_area = block.inner(popup_area);
        block.render(popup_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner_area);

        Paragraph::new(self.error_modal.message.as_str())
            .style(Style::default().fg(self.color("error")))
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        Paragraph::new("[ OK ]")
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.color("modal_border_active"))),
            )
            .render(chunks[1], buf);
    }
}

const HELP_TEXT: &[(&str, &str)] = &[
    ("", "Browsing"),
    ("↑↓ / j k", "Move selection"),
    ("PgUp PgDn", "Page up / down"),
    ("Home End g G", "First / last row"),
    ("←→ / h l", "Scroll columns"),
    ("", ""),
    ("", "Searching"),
    ("/", "Search: keywords separated by spaces"),
    ("m", "Toggle AND (all keywords) / OR (any keyword)"),
    ("R / Esc", "Reset search and marks"),
    ("↑↓ in search", "Previous searches"),
    ("", ""),
    ("", "Editing"),
    ("a", "Add a client"),
    ("Enter / e", "Edit the selected client (ID is read-only)"),
    ("Space", "Mark / unmark row"),
    ("d / Del", "Delete marked rows, or the selected row"),
    ("Tab Shift-Tab", "Next / previous field in a form"),
    ("", ""),
    ("", "Saving"),
    ("w", "Save to the loaded file"),
    ("W", "Save as another file (.csv, .tsv, .xlsx)"),
    ("q / Ctrl-C", "Quit (asks when there are unsaved changes)"),
    ("?", "Close this help"),
];

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let input_active = matches!(
            self.input_mode,
            InputMode::Searching | InputMode::SavingAs
        );
        let mut constraints = vec![Constraint::Fill(1)];
        if input_active {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Length(1)); // status
        constraints.push(Constraint::Length(1)); // controls
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::new(Direction::Vertical, constraints).split(area);

        let mut next = 0;
        let table_area = layout[next];
        next += 1;

        if let Some(path) = self.loading.as_ref() {
            Paragraph::new(format!("Loading {} ...", path.display()))
                .centered()
                .style(Style::default().fg(self.color("dimmed")))
                .render(table_area, buf);
        } else if let Some(store) = self.store.as_ref() {
            let table = ClientTable::new(store, &self.rows)
                .with_title(self.title())
                .with_row_numbers(self.display.row_numbers)
                .with_cell_padding(self.display.table_cell_padding as u16)
                .with_max_column_width(self.display.max_column_width)
                .with_colors(
                    self.theme.get("table_header"),
                    self.theme.get("table_border"),
                    self.theme.get("table_selected"),
                    self.theme.get("marked_row"),
                    self.theme.get("dimmed"),
                );
            table.render(table_area, buf, &mut self.table_state);
        }

        if input_active {
            self.render_input(layout[next], buf);
            next += 1;
        }

        if let Some(status) = self.status.as_ref() {
            let color = if status.is_error {
                self.color("error")
            } else {
                self.color("success")
            };
            Paragraph::new(status.text.as_str())
                .style(Style::default().fg(color))
                .render(layout[next], buf);
        }
        next += 1;

        let (shown, total) = (
            self.rows.len(),
            self.store.as_ref().map(|s| s.len()).unwrap_or(0),
        );
        let mut controls = Controls::with_row_count(shown, total)
            .with_match_mode(self.match_mode)
            .with_dirty(self.store.as_ref().is_some_and(|s| s.is_dirty()))
            .with_colors(
                self.color("controls_bg"),
                self.color("primary"),
                self.color("text_primary"),
                self.color("warning"),
                self.color("dimmed"),
            );
        controls = match self.input_mode {
            InputMode::Searching => controls.with_custom_controls(vec![
                ("Enter", "Apply"),
                ("Esc", "Cancel"),
                ("↑↓", "History"),
            ]),
            InputMode::SavingAs => {
                controls.with_custom_controls(vec![("Enter", "Save"), ("Esc", "Cancel")])
            }
            InputMode::Normal => controls.with_dimmed(self.show_help),
            _ => controls.with_dimmed(true),
        };
        controls.render(layout[next], buf);
        next += 1;

        if self.debug.enabled && layout.len() > next {
            self.debug.render(layout[next], buf);
        }

        if let Some(form) = self.form.as_ref() {
            let height = form.preferred_height().min(area.height.saturating_sub(2));
            let popup = centered_rect_fixed(area, area.width.saturating_mul(7) / 10, height);
            form.render(popup, buf);
        }

        match self.input_mode {
            InputMode::ConfirmDelete => {
                let n = self.pending_delete.len();
                let body = vec![
                    Line::from(format!(
                        "Delete {} client{}? This cannot be undone after saving.",
                        n,
                        if n == 1 { "" } else { "s" }
                    )),
                    Line::from("y / Enter: delete    n / Esc: keep"),
                ];
                self.render_confirm(area, buf, "Delete", body);
            }
            InputMode::ConfirmQuit => {
                let body = vec![
                    Line::from("There are unsaved changes."),
                    Line::from("w: save and quit    q: quit without saving    Esc: stay"),
                ];
                self.render_confirm(area, buf, "Quit", body);
            }
            _ => {}
        }

        if self.show_help {
            self.render_help(area, buf);
        }

        // Error modal shows on top of everything
        if self.error_modal.active {
            self.render_error(area, buf);
        }
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_rect_fixed(r: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect::new(
        r.x + (r.width - width) / 2,
        r.y + (r.height - height) / 2,
        width,
        height,
    )
}
