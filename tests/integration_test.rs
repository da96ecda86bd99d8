use clientbook::cache::SEARCH_HISTORY_FILE;
use clientbook::{App, AppEvent, CacheManager, ClientStore, InputMode, MatchMode, OpenOptions};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::Path;
use std::sync::mpsc;
use tempfile::TempDir;

mod common;

fn new_app(cache_dir: &Path) -> App {
    let (tx, _) = mpsc::channel();
    App::new(tx).with_cache(CacheManager::with_dir(cache_dir.to_path_buf()))
}

/// Feed an event and every follow-up event it produces. Returns the
/// terminal event (Exit or Crash) if one was reached.
fn pump(app: &mut App, event: AppEvent) -> Option<AppEvent> {
    let mut next = Some(event);
    while let Some(event) = next {
        if matches!(event, AppEvent::Exit | AppEvent::Crash(_)) {
            return Some(event);
        }
        next = app.event(&event);
    }
    None
}

fn press(app: &mut App, code: KeyCode) -> Option<AppEvent> {
    pump(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
}

fn press_ctrl(app: &mut App, c: char) -> Option<AppEvent> {
    pump(
        app,
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
    )
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn open(app: &mut App, path: &Path) -> Option<AppEvent> {
    pump(app, AppEvent::Open(path.to_path_buf(), OpenOptions::default()))
}

fn client_id(app: &App, index: usize) -> String {
    let store = app.store().unwrap();
    let record = store.get(index).unwrap();
    store
        .value(record, store.id_column().unwrap())
        .unwrap()
        .to_string()
}

#[test]
fn test_app_creation() {
    let dir = TempDir::new().unwrap();
    let app = new_app(dir.path());
    assert_eq!(app.input_mode, InputMode::Normal);
    assert!(app.store().is_none());
    assert!(app.rows().is_empty());
}

#[test]
fn test_full_workflow() {
    let dir = TempDir::new().unwrap();
    let path = common::write_generated_csv(dir.path(), 12);
    let cache = CacheManager::with_dir(dir.path().join("cache"));
    let mut app = new_app(cache.cache_dir());

    // 1. Open the file
    assert!(open(&mut app, &path).is_none());
    assert_eq!(app.rows().len(), 12);
    assert!(app.status().unwrap().text.starts_with("Loaded 12 clients"));

    // 2. Search as the user types, then submit
    press(&mut app, KeyCode::Char('/'));
    assert_eq!(app.input_mode, InputMode::Searching);
    type_text(&mut app, "taipei vip");
    assert_eq!(app.query(), "taipei vip");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.match_mode(), MatchMode::All);
    let ids: Vec<String> = app.rows().iter().map(|&i| client_id(&app, i)).collect();
    assert_eq!(ids, vec!["C0006", "C0012"]);
    assert!(cache.cache_file(SEARCH_HISTORY_FILE).exists());

    // 3. Switch to OR
    press(&mut app, KeyCode::Char('m'));
    assert_eq!(app.match_mode(), MatchMode::Any);
    assert_eq!(app.rows(), &[1, 2, 3, 5, 7, 8, 9, 11]);

    // 4. Reset
    press(&mut app, KeyCode::Char('R'));
    assert_eq!(app.query(), "");
    assert_eq!(app.rows().len(), 12);

    // 5. Add a client through the form
    press(&mut app, KeyCode::Char('a'));
    assert_eq!(app.input_mode, InputMode::Form);
    {
        let form = app.form_mut().unwrap();
        form.field_mut("客戶編號")
            .unwrap()
            .set_value("C0100".to_string());
        form.field_mut("姓名").unwrap().set_value("Dana Hsu".to_string());
        form.field_mut("地址").unwrap().set_value("Taipei".to_string());
    }
    press_ctrl(&mut app, 's');
    assert_eq!(app.input_mode, InputMode::Normal);
    assert!(app.form_mut().is_none());
    assert_eq!(app.store().unwrap().len(), 13);
    assert_eq!(app.selected_index(), Some(12));
    assert_eq!(app.status().unwrap().text, "Client added");

    // 6. Delete the first row after confirming
    press(&mut app, KeyCode::Char('g'));
    press(&mut app, KeyCode::Char('d'));
    assert_eq!(app.input_mode, InputMode::ConfirmDelete);
    press(&mut app, KeyCode::Char('y'));
    assert_eq!(app.input_mode, InputMode::Normal);
    let store = app.store().unwrap();
    assert_eq!(store.len(), 12);
    assert!(store.get(0).is_none());
    assert!(store.is_dirty());

    // 7. Quitting with unsaved changes asks first; 'w' saves then exits
    assert!(press(&mut app, KeyCode::Char('q')).is_none());
    assert_eq!(app.input_mode, InputMode::ConfirmQuit);
    let exit = press(&mut app, KeyCode::Char('w'));
    assert!(matches!(exit, Some(AppEvent::Exit)));
    assert!(!app.store().unwrap().is_dirty());

    let reloaded = ClientStore::load(&path, &OpenOptions::default()).unwrap();
    assert_eq!(reloaded.len(), 12);
    let first = &reloaded.records()[0];
    assert_eq!(
        reloaded.value(first, "客戶編號").unwrap().to_string(),
        "C0002"
    );
    let last = &reloaded.records()[11];
    assert_eq!(reloaded.value(last, "姓名").unwrap().to_string(), "Dana Hsu");
}

#[test]
fn test_edit_keeps_client_id() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    press(&mut app, KeyCode::Char('j'));
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.input_mode, InputMode::Form);
    {
        let form = app.form_mut().unwrap();
        assert_eq!(form.title(), "Edit client C002");
        assert!(form.field_mut("ID").unwrap().is_read_only());
        form.field_mut("Phone")
            .unwrap()
            .set_value("0999999999".to_string());
    }
    press_ctrl(&mut app, 's');

    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.status().unwrap().text, "Client updated");
    let store = app.store().unwrap();
    let record = store.get(1).unwrap();
    assert_eq!(store.value(record, "ID").unwrap().to_string(), "C002");
    assert_eq!(
        store.value(record, "Phone").unwrap().to_string(),
        "0999999999"
    );
}

#[test]
fn test_duplicate_id_keeps_form_open() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    press(&mut app, KeyCode::Char('a'));
    app.form_mut()
        .unwrap()
        .field_mut("ID")
        .unwrap()
        .set_value("C001".to_string());
    press_ctrl(&mut app, 's');

    assert!(app.error_message().unwrap().contains("C001"));
    assert_eq!(app.input_mode, InputMode::Form);
    assert_eq!(app.store().unwrap().len(), 2);

    // Dismiss the error, then cancel the form
    press(&mut app, KeyCode::Esc);
    assert!(app.error_message().is_none());
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.input_mode, InputMode::Normal);
    assert!(!app.store().unwrap().is_dirty());
}

#[test]
fn test_cancel_search_restores_query() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    pump(&mut app, AppEvent::Search("alice".to_string()));
    assert_eq!(app.rows(), &[0]);

    press(&mut app, KeyCode::Char('/'));
    type_text(&mut app, " bob");
    assert_eq!(app.rows().len(), 0);
    press(&mut app, KeyCode::Esc);

    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.query(), "alice");
    assert_eq!(app.rows(), &[0]);
}

#[test]
fn test_mark_and_delete_many() {
    let dir = TempDir::new().unwrap();
    let path = common::write_generated_csv(dir.path(), 5);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    press(&mut app, KeyCode::Char(' '));
    press(&mut app, KeyCode::Char(' '));
    assert_eq!(app.marked().collect::<Vec<_>>(), vec![0, 1]);

    press(&mut app, KeyCode::Char('d'));
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.store().unwrap().len(), 5);

    press(&mut app, KeyCode::Char('d'));
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.store().unwrap().len(), 3);
    assert_eq!(app.marked().count(), 0);
    assert_eq!(app.status().unwrap().text, "Deleted 2 clients");
}

#[test]
fn test_delete_ignores_marks_hidden_by_search() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    // Mark Alice, then search so only Bob is shown
    press(&mut app, KeyCode::Char(' '));
    assert_eq!(app.marked().collect::<Vec<_>>(), vec![0]);
    pump(&mut app, AppEvent::Search("bob".to_string()));
    assert_eq!(app.rows(), &[1]);
    assert_eq!(app.marked().count(), 0);

    press(&mut app, KeyCode::Char('d'));
    press(&mut app, KeyCode::Char('y'));

    let store = app.store().unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get(0).is_some());
    assert!(store.get(1).is_none());
}

#[test]
fn test_save_as_xlsx() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["客戶編號", "姓名", "電話"]);
    let target = dir.path().join("clients.xlsx");
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    pump(&mut app, AppEvent::Save(Some(target.clone())));

    assert!(app.error_message().is_none());
    assert!(app.status().unwrap().text.starts_with("Saved 2 clients"));
    let reloaded = ClientStore::load(&target, &OpenOptions::default()).unwrap();
    assert_eq!(reloaded.len(), 2);
    let record = &reloaded.records()[0];
    assert_eq!(reloaded.value(record, "電話").unwrap().to_string(), "0911111111");
}

#[test]
fn test_save_error_is_shown() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    pump(
        &mut app,
        AppEvent::Save(Some(dir.path().join("missing").join("out.csv"))),
    );

    assert!(app.error_message().is_some());
}

#[test]
fn test_load_failure_at_startup_crashes() {
    let dir = TempDir::new().unwrap();
    let mut app = new_app(dir.path());

    let result = open(&mut app, &dir.path().join("nope.xlsx"));

    assert!(matches!(result, Some(AppEvent::Crash(_))));
    assert!(app.store().is_none());
}

#[test]
fn test_quit_without_changes_exits() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut app = new_app(dir.path());
    open(&mut app, &path);

    assert!(matches!(
        press(&mut app, KeyCode::Char('q')),
        Some(AppEvent::Exit)
    ));
}
