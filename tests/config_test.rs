use clientbook::config::{AppConfig, ConfigManager, Theme};
use clientbook::MatchMode;
use ratatui::style::Color;
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

fn write_config(config_manager: &ConfigManager, content: &str) {
    config_manager
        .ensure_config_dir()
        .expect("Failed to create config dir");
    fs::write(config_manager.config_path("config.toml"), content)
        .expect("Failed to write config");
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");

    assert_eq!(config.file_loading.default_path, "cust.xlsx");
    assert!(config.file_loading.delimiter.is_none());
    assert!(config.file_loading.sheet.is_none());

    assert_eq!(config.search.default_mode, "all");
    assert!(config.search.fields.is_empty());
    assert_eq!(config.search.history_limit, 1000);
    assert!(config.search.enable_history);
    assert_eq!(config.match_mode(), MatchMode::All);

    assert!(!config.display.row_numbers);
    assert_eq!(config.display.table_cell_padding, 1);
    assert_eq!(config.display.max_column_width, 40);

    assert_eq!(config.performance.event_poll_interval_ms, 25);

    assert_eq!(config.theme.colors.primary, "cyan");
    assert_eq!(config.theme.colors.marked_row, "magenta");
    assert_eq!(config.theme.colors.controls_bg, "indexed(236)");

    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());
    assert!(!config.debug.enabled);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    assert!(template.contains("[file_loading]"));
    assert!(template.contains("[search]"));
    assert!(template.contains("[display]"));
    assert!(template.contains("[performance]"));
    assert!(template.contains("[theme.colors]"));
    assert!(template.contains("[logging]"));
    assert!(template.contains("[debug]"));
    assert!(template.contains("version = \"0.1\""));
    assert!(template.contains("# sheet = null"));

    // Every setting is commented out so the file changes nothing until edited
    let parsed: AppConfig = toml::from_str(&template).expect("Template should parse");
    assert_eq!(parsed.search.default_mode, "all");
    assert_eq!(parsed.display.max_column_width, 40);
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[search]"));
    assert!(content.contains("version = \"0.1\""));
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager
        .write_default_config(false)
        .expect("First write should succeed");

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("already exists"));
}

#[test]
fn test_write_config_with_force_overwrites() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let first_path = config_manager
        .write_default_config(false)
        .expect("First write should succeed");
    fs::write(&first_path, "version = \"0.1\"\n").unwrap();

    let second_path = config_manager
        .write_default_config(true)
        .expect("Second write with force should succeed");

    assert_eq!(first_path, second_path);
    let content = fs::read_to_string(&second_path).unwrap();
    assert!(content.contains("[theme.colors]"));
}

#[test]
fn test_load_config_with_no_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config = AppConfig::load_from(&config_manager).expect("Should load default config");

    assert_eq!(config.version, "0.1");
    assert_eq!(config.file_loading.default_path, "cust.xlsx");
}

#[test]
fn test_load_and_parse_minimal_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(
        &config_manager,
        r#"
version = "0.1"

[file_loading]
default_path = "clients.csv"
delimiter = 59

[search]
default_mode = "any"
fields = ["姓名", "電話"]

[display]
row_numbers = true
"#,
    );

    let config = AppConfig::load_from(&config_manager).expect("Should load config");

    assert_eq!(config.file_loading.default_path, "clients.csv");
    assert_eq!(config.file_loading.delimiter, Some(b';'));
    assert_eq!(config.match_mode(), MatchMode::Any);
    assert_eq!(config.search.fields, vec!["姓名", "電話"]);
    assert!(config.display.row_numbers);

    // Unspecified values keep their defaults
    assert_eq!(config.display.table_cell_padding, 1);
    assert_eq!(config.search.history_limit, 1000);
    assert_eq!(config.performance.event_poll_interval_ms, 25);
}

#[test]
fn test_load_rejects_invalid_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_config(&config_manager, "[search]\ndefault_mode = \"maybe\"\n");

    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));

    write_config(&config_manager, "[search\n");
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_merge_configs() {
    let mut base = AppConfig::default();
    let mut override_config = AppConfig::default();

    override_config.display.row_numbers = true;
    override_config.display.max_column_width = 24;
    override_config.search.default_mode = "any".to_string();
    override_config.performance.event_poll_interval_ms = 50;
    override_config.theme.colors.primary = "blue".to_string();
    override_config.logging.level = "debug".to_string();

    base.merge(override_config);

    assert!(base.display.row_numbers);
    assert_eq!(base.display.max_column_width, 24);
    assert_eq!(base.search.default_mode, "any");
    assert_eq!(base.performance.event_poll_interval_ms, 50);
    assert_eq!(base.theme.colors.primary, "blue");
    assert_eq!(base.logging.level, "debug");

    assert_eq!(base.search.history_limit, 1000);
    assert_eq!(base.theme.colors.secondary, "yellow");
}

#[test]
fn test_merge_option_fields() {
    let mut base = AppConfig::default();
    base.file_loading.sheet = Some("客戶".to_string());

    let mut override_config = AppConfig::default();
    override_config.file_loading.delimiter = Some(b'\t');
    override_config.logging.file = Some("/tmp/clientbook.log".into());

    base.merge(override_config);

    assert_eq!(base.file_loading.delimiter, Some(b'\t'));
    assert_eq!(base.file_loading.sheet.as_deref(), Some("客戶"));
    assert_eq!(
        base.logging.file.as_deref(),
        Some(std::path::Path::new("/tmp/clientbook.log"))
    );
}

#[test]
fn test_merge_does_not_override_with_defaults() {
    let mut base = AppConfig::default();
    base.search.fields = vec!["姓名".to_string()];
    base.display.table_cell_padding = 3;
    base.debug.enabled = true;

    base.merge(AppConfig::default());

    assert_eq!(base.search.fields, vec!["姓名"]);
    assert_eq!(base.display.table_cell_padding, 3);
    assert!(base.debug.enabled);
}

#[test]
fn test_validate_config_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_validate_config_invalid_version() {
    let config = AppConfig {
        version: "1.0".to_string(),
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Unsupported config version"));
}

#[test]
fn test_validate_config_zero_event_poll_interval() {
    let mut config = AppConfig::default();
    config.performance.event_poll_interval_ms = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("event_poll_interval_ms"));
}

#[test]
fn test_validate_config_narrow_columns() {
    let mut config = AppConfig::default();
    config.display.max_column_width = 3;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("max_column_width"));
}

#[test]
fn test_validate_config_match_mode_and_log_level() {
    let mut config = AppConfig::default();
    config.search.default_mode = "or".to_string();
    assert!(config.validate().is_ok());
    assert_eq!(config.match_mode(), MatchMode::Any);

    config.search.default_mode = "sometimes".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("logging.level"));
}

#[test]
fn test_validate_config_invalid_color() {
    // Color parsing is disabled entirely under NO_COLOR
    if std::env::var("NO_COLOR").is_ok() {
        return;
    }
    let mut config = AppConfig::default();
    config.theme.colors.marked_row = "not_a_color".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("marked_row"));
}

#[test]
fn test_theme_from_config() {
    if std::env::var("NO_COLOR").is_ok() {
        return;
    }
    let mut config = AppConfig::default();
    config.theme.colors.primary = "indexed(42)".to_string();

    let theme = Theme::from_config(&config.theme).expect("Theme should build");

    assert_eq!(theme.get("primary"), Color::Indexed(42));
    assert_eq!(theme.get("error"), Color::Red);
    assert_eq!(theme.get("table_selected"), Color::Reset);
    assert_eq!(theme.get("no_such_color"), Color::Reset);
}
