//! pinmark: pin review comments to elements of a live page.
//!
//! Entry point for the `pinmark` binary. Wires together configuration
//! (`config`), the terminal lifecycle (`tui`), the unified event bus (`event`),
//! the comment store worker (`worker`), the demo page with the overlay mounted
//! on it (`app`, `page`) and rendering (`ui`).
//!
//! # Startup sequence
//!
//! 1. Load config and the theme. Read-only, safe before terminal init.
//! 2. Start file logging under `.pinmark/`; the terminal belongs to the TUI.
//! 3. Open the comment store before touching the terminal, so an open error
//!    prints normally.
//! 4. `install_panic_hook()`, then `register_sigterm()`, then `init_tui()`.
//! 5. Spawn the event task and the store worker, build the app state and ask
//!    for the initial fetch.
//!
//! `restore_tui()` runs after the event loop exits, whatever the reason; draw
//! errors break out of the loop rather than returning past it.

mod app;
mod config;
mod event;
mod page;
mod theme;
mod tui;
mod ui;
mod worker;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use pinmark_core::store::StoreRequest;
use pinmark_core::types::Viewport;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::ui::keybindings::{KeyAction, handle_key, handle_mouse};

const LOG_DIR: &str = ".pinmark";
const LOG_FILE: &str = ".pinmark/pinmark.log";

/// Routes `tracing` output to `.pinmark/pinmark.log`.
///
/// The filter comes from `PINMARK_LOG` (same syntax as `RUST_LOG`), defaulting
/// to info for both crates.
fn init_logging() -> std::io::Result<()> {
    std::fs::create_dir_all(LOG_DIR)?;
    let file = OpenOptions::new().create(true).append(true).open(LOG_FILE)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PINMARK_LOG")
                .unwrap_or_else(|_| EnvFilter::new("pinmark=info,pinmark_core=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Fits the page to the terminal's current size.
fn fit_to_terminal(terminal: &tui::Tui, state: &mut app::AppState) -> std::io::Result<()> {
    let size = terminal.size()?;
    state.resize_terminal(size.width, size.height);
    Ok(())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = config::load();
    let theme = theme::Theme::from_name(&config.theme);
    init_logging()?;
    info!(page_url = %config.page_url, backend = ?config.store.backend, "pinmark starting");

    if let Some(dir) = Path::new(&config.store.path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let backend = worker::Backend::open(&config).await.map_err(|e| {
        error!(error = %e, "could not open comment store");
        std::io::Error::other(e)
    })?;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let (store_tx, store_rx) = tokio::sync::mpsc::unbounded_channel::<StoreRequest>();
    worker::spawn_store_worker(backend, store_rx, handler.tx.clone());
    let mut rx = handler.rx;

    let mut state = app::AppState::new(Viewport { width: 80.0, height: 23.0 }, store_tx);
    let mut result = fit_to_terminal(&terminal, &mut state);
    state.send(StoreRequest::Fetch);

    // Exits only via `break`, so `restore_tui()` below always runs.
    'event_loop: while result.is_ok() {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50ms even when the
            // terminal is quiet.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event::AppEvent::Render) => {
                        result = fit_to_terminal(&terminal, &mut state).and_then(|()| {
                            state.frame();
                            terminal.draw(|frame| ui::render(frame, &state, &theme)).map(|_| ())
                        });
                    }
                    Some(event::AppEvent::Key(key)) => {
                        if handle_key(key, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(event::AppEvent::Mouse(mouse)) => {
                        if handle_mouse(mouse, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(event::AppEvent::Store(outcome)) => state.apply_outcome(outcome),
                    Some(event::AppEvent::Resize(columns, rows)) => state.resize_terminal(columns, rows),
                    Some(event::AppEvent::Quit) | None => break 'event_loop,
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    state.shutdown();
    tui::restore_tui()?;
    if let Err(e) = &result {
        error!(error = %e, "terminal error");
    }
    info!("pinmark stopped");
    result
}
