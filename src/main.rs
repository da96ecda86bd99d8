use clap::Parser;
use clientbook::{cache::LOG_FILE, App, AppConfig, AppEvent, Args, OpenOptions, Theme};
use color_eyre::Result;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(
    mut terminal: DefaultTerminal,
    args: &Args,
    config: AppConfig,
    log_path: Option<PathBuf>,
) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let theme = Theme::from_config(&config.theme)?;
    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    let path = data_path(args, &config);
    let opts = OpenOptions::from_args_and_config(args, &config);
    let debug = args.debug || config.debug.enabled;

    let mut app = App::new_with_config(tx.clone(), theme, config);
    if debug {
        app.enable_debug();
        app.set_log_path(log_path);
    }
    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(path, opts))?;

    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// File to open: the CLI path, else the configured default.
fn data_path(args: &Args, config: &AppConfig) -> PathBuf {
    args.path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.file_loading.default_path))
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = clientbook::ConfigManager::new(clientbook::APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Wrote default config to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error writing config: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.clear_cache {
        match clientbook::CacheManager::new(clientbook::APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing cache: {}", e);
                    std::process::exit(1);
                }
                println!("Cache cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    Ok(None)
}

/// Start file logging. Failure is reported but never stops the app.
fn init_logging(args: &Args, config: &AppConfig) -> Option<PathBuf> {
    let path = args
        .log_file
        .clone()
        .or_else(|| config.logging.file.clone())
        .or_else(|| {
            clientbook::CacheManager::new(clientbook::APP_NAME)
                .ok()
                .map(|cache| cache.cache_file(LOG_FILE))
        })?;
    let level = if args.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    match clientbook::logging::init(&path, level) {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let config = AppConfig::load(clientbook::APP_NAME)?;
    let log_path = init_logging(&args, &config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let terminal = ratatui::init();
    let result = run(terminal, &args, config, log_path);
    ratatui::restore();
    if let Err(e) = result {
        tracing::error!(error = %e, "exiting with error");
        eprintln!(
            "Error: {}",
            clientbook::error_display::user_message_from_report(&e, None)
        );
        std::process::exit(1);
    }
    Ok(())
}
