//! Event bus for pinmark.
//!
//! Terminal input, the render tick and storage results are normalised into a
//! single `AppEvent` enum and sent over a tokio unbounded MPSC channel. The main
//! loop receives from this channel and dispatches accordingly.
//!
//! The render interval (33 ms ≈ 30 FPS) doubles as the overlay's animation
//! frame: every `Render` first lets the pin tracker run its scheduled pass, then
//! draws.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use pinmark_core::store::StoreOutcome;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// All events the application can receive from any source.
#[derive(Debug)]
pub enum AppEvent {
    /// A key press from the terminal (`KeyEventKind::Press` only).
    ///
    /// Release and repeat events are filtered in [`spawn_event_task`] to avoid
    /// double-firing on Windows, which synthesises both press and release for
    /// every keystroke.
    Key(KeyEvent),
    /// A mouse event from the terminal (press, drag, release, wheel, move).
    Mouse(MouseEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Render tick: run the scheduled reconciliation frame, then draw.
    Render,
    /// A storage request finished; produced by the store worker.
    Store(StoreOutcome),
    /// Quit signal.
    Quit,
}

/// Holds the sender and receiver ends of the unified event channel.
///
/// The sender (`tx`) is cloned and distributed to background tasks;
/// the receiver (`rx`) is owned by the main event loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background tokio task that feeds terminal input and render ticks
/// into the event channel.
///
/// The task exits once the receiver is gone.
///
/// - `reader.next().fuse()` keeps `tokio::select!` from polling a completed
///   future if the crossterm stream ends.
/// - Only `KeyEventKind::Press` is forwarded.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let sent = tokio::select! {
                _ = render_tick => tx.send(AppEvent::Render),
                maybe_event = crossterm_event => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        tx.send(AppEvent::Key(key))
                    }
                    Some(Ok(Event::Resize(columns, rows))) => tx.send(AppEvent::Resize(columns, rows)),
                    Some(Ok(Event::Mouse(mouse))) => tx.send(AppEvent::Mouse(mouse)),
                    Some(Err(_)) | None => tx.send(AppEvent::Quit),
                    _ => Ok(()),
                },
            };
            if sent.is_err() {
                break;
            }
        }
    });
}
