use clientbook::store::SaveError;
use clientbook::{ClientField, ClientStore, FileFormat, MatchMode, OpenOptions, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

mod common;

fn load(path: &Path) -> ClientStore {
    ClientStore::load(path, &OpenOptions::default()).unwrap()
}

fn values(store: &ClientStore) -> Vec<Vec<Value>> {
    store.records().iter().map(|r| r.values().to_vec()).collect()
}

#[test]
fn test_csv_roundtrip_unmodified() {
    let dir = TempDir::new().unwrap();
    let path = common::write_generated_csv(dir.path(), 25);
    let mut original = load(&path);

    let copy = dir.path().join("copy.csv");
    original.save(Some(&copy)).unwrap();
    let reloaded = load(&copy);

    assert_eq!(reloaded.columns(), original.columns());
    assert_eq!(values(&reloaded), values(&original));
}

#[test]
fn test_xlsx_roundtrip_unmodified() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_xlsx(dir.path(), "cust.xlsx", "客戶");
    let mut original = load(&path);

    let copy = dir.path().join("copy.xlsx");
    original.save(Some(&copy)).unwrap();
    let reloaded = load(&copy);

    assert_eq!(reloaded.sheet_name(), Some("客戶"));
    assert_eq!(reloaded.columns(), original.columns());
    assert_eq!(values(&reloaded), values(&original));
}

#[test]
fn test_csv_to_xlsx_keeps_text_ids() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let mut store = load(&path);

    let target = dir.path().join("clients.xlsx");
    store.save(Some(&target)).unwrap();
    assert_eq!(store.format(), FileFormat::Xlsx);

    let reloaded = load(&target);
    assert_eq!(reloaded.sheet_name(), Some("Sheet1"));
    let alice = reloaded.get(0).unwrap();
    assert_eq!(
        reloaded.field(alice, ClientField::Phone),
        Some(&Value::from("0911111111"))
    );
}

#[test]
fn test_save_in_place_persists_mutations() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["客戶編號", "姓名", "電話"]);
    let mut store = load(&path);

    store.delete([0]);
    store
        .add([("客戶編號", "C003"), ("姓名", "Carol Chen"), ("Email", "carol@example.com")])
        .unwrap();
    store.edit(1, [("電話", "0999999999")]).unwrap();
    assert!(store.is_dirty());

    let written = store.save(None).unwrap();
    assert_eq!(written, path);
    assert!(!store.is_dirty());

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "客戶編號,姓名,電話,Email\nC002,Bob Lin,0999999999,\nC003,Carol Chen,,carol@example.com\n"
    );

    let reloaded = load(&path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.search(&["carol"], MatchMode::All).len(), 1);
}

#[test]
fn test_hidden_columns_survive_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clients.csv");
    fs::write(&path, "ID,,Name\nC001,internal,Alice Wu\n").unwrap();
    let mut store = load(&path);
    assert_eq!(store.display_columns(), &["ID", "Name"]);

    let copy = dir.path().join("copy.csv");
    store.save(Some(&copy)).unwrap();
    let text = fs::read_to_string(&copy).unwrap();
    assert_eq!(text, "ID,column_2,Name\nC001,internal,Alice Wu\n");
}

#[test]
fn test_failed_save_keeps_original_and_dirty_flag() {
    let dir = TempDir::new().unwrap();
    let path = common::write_sample_csv(dir.path(), "clients.csv", ["ID", "Name", "Phone"]);
    let before = fs::read(&path).unwrap();
    let mut store = load(&path);
    store.delete([0]);

    let bad = dir.path().join("missing-dir").join("out.csv");
    assert!(matches!(store.save(Some(&bad)), Err(SaveError::Io { .. })));
    assert!(store.is_dirty());
    assert_eq!(store.path(), path.as_path());
    assert_eq!(fs::read(&path).unwrap(), before);

    assert!(matches!(
        store.save(Some(&dir.path().join("out.ods"))),
        Err(SaveError::UnsupportedFormat(ext)) if ext == "ods"
    ));
    assert!(matches!(
        store.save(Some(&dir.path().join("out.json"))),
        Err(SaveError::UnsupportedFormat(ext)) if ext == "json"
    ));
}

#[test]
fn test_semicolon_delimiter_is_kept_on_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clients.csv");
    fs::write(&path, "ID;Name\nC001;Alice Wu\n").unwrap();
    let options = OpenOptions::default().with_delimiter(b';');
    let mut store = ClientStore::load(&path, &options).unwrap();
    assert_eq!(store.len(), 1);

    store.save(None).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "ID;Name\nC001;Alice Wu\n");
}

#[test]
fn test_rows_with_only_empty_cells_survive_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clients.csv");
    fs::write(&path, "ID,Name\nC001,A\n,\nC002,B\n").unwrap();
    let mut store = load(&path);
    assert_eq!(store.len(), 3);
    assert!(store.get(1).unwrap().values().iter().all(Value::is_empty));

    store.save(None).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "ID,Name\nC001,A\n,\nC002,B\n"
    );

    let xlsx = dir.path().join("clients.xlsx");
    store.save(Some(&xlsx)).unwrap();
    let reloaded = load(&xlsx);
    assert_eq!(reloaded.len(), 3);
    assert_eq!(values(&reloaded), values(&store));
}
