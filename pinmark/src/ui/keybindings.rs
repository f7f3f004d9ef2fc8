//! Input dispatcher for pinmark.
//!
//! Translates crossterm key and mouse events into `AppState` / `Overlay` calls
//! and returns a `KeyAction` telling the event loop whether to continue or quit.
//! Keys branch first on the help overlay, then on an open draft (which captures
//! typing), then fall through to the browse bindings.
//!
//! Mouse coordinates are converted from screen cells to page coordinates by
//! subtracting the page area's origin; the page is laid out one unit per cell.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use pinmark_core::overlay::ClickOutcome;
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PinPress};

/// Control-flow signal returned from the dispatchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if state.mode == Mode::Help {
        return handle_help(key, state);
    }
    if state.overlay.draft().is_some() {
        return handle_draft(key, state);
    }
    handle_browse(key, state)
}

// ---------------------------------------------------------------------------
// Browse mode
// ---------------------------------------------------------------------------

fn handle_browse(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }

    match key.code {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return KeyAction::Quit,
        KeyCode::Char('c') => toggle_comment_mode(state),
        KeyCode::Esc => {
            if state.overlay.is_comment_mode() {
                toggle_comment_mode(state);
            } else {
                state.overlay.close_tooltip();
                state.selected = None;
            }
        }

        KeyCode::Tab | KeyCode::Char('n') => state.select_step(1),
        KeyCode::BackTab | KeyCode::Char('N') => state.select_step(-1),
        KeyCode::Enter => state.toggle_selected_tooltip(),
        KeyCode::Char('x') => state.resolve_selected(),
        KeyCode::Char('d') => state.delete_selected(),
        KeyCode::Char('r') => state.refetch(),

        KeyCode::Char('b') => state.toggle_banner(),
        KeyCode::Char('s') => state.shuffle_cards(),
        KeyCode::Char('h') => state.toggle_highlight(),

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::Help;
        }
        _ => {}
    }
    KeyAction::Continue
}

fn toggle_comment_mode(state: &mut AppState) {
    if state.overlay.toggle_comment_mode() {
        state.info("comment mode: click an element to pin a comment");
    } else {
        state.info("comment mode off");
    }
}

/// Handles j / k / arrows / paging keys. Returns `None` for other keys.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let page = state.page_rows();

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_by(1.0),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_by(-1.0),
        KeyCode::Char('d') if ctrl => state.scroll_by((page / 2.0).floor()),
        KeyCode::Char('u') if ctrl => state.scroll_by(-(page / 2.0).floor()),
        KeyCode::PageDown | KeyCode::Char(' ') => state.scroll_by(page),
        KeyCode::PageUp => state.scroll_by(-page),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_to_bottom(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// Draft modal
// ---------------------------------------------------------------------------

/// Typing edits the draft, Enter posts it, Esc discards it.
fn handle_draft(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let Some(text) = state.overlay.draft().map(|d| d.text.clone()) else {
        return KeyAction::Continue;
    };

    match key.code {
        KeyCode::Esc => {
            state.overlay.cancel_draft();
            state.info("draft discarded");
        }
        KeyCode::Enter => state.submit_draft(),
        KeyCode::Backspace => {
            let mut text = text;
            text.pop();
            let _ = state.overlay.set_draft_text(&text);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut text = text;
            text.push(ch);
            let _ = state.overlay.set_draft_text(&text);
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Help overlay
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            state.help_scroll = state.help_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.help_scroll = state.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => {
            state.mode = Mode::Browse;
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Handles a mouse event: pin presses and drags, page clicks, hover and wheel.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    let released = mouse.kind == MouseEventKind::Up(MouseButton::Left);
    if state.mode == Mode::Help {
        match mouse.kind {
            MouseEventKind::ScrollUp => state.help_scroll = state.help_scroll.saturating_sub(3),
            MouseEventKind::ScrollDown => state.help_scroll = state.help_scroll.saturating_add(3),
            _ if released => abandon_press(state),
            _ => {}
        }
        return KeyAction::Continue;
    }

    let Some((x, y)) = page_point(state, mouse.column, mouse.row) else {
        // A release off the page still ends the press.
        if released {
            abandon_press(state);
        }
        return KeyAction::Continue;
    };

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_press(mouse.column, mouse.row, x, y, state),
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(press) = state.press.as_mut() {
                press.moved |= press.column != mouse.column || press.row != mouse.row;
            }
            state.overlay.pointer_move(&state.doc, x, y);
        }
        MouseEventKind::Moved => state.overlay.pointer_move(&state.doc, x, y),
        MouseEventKind::Up(MouseButton::Left) => handle_release(x, y, state),
        MouseEventKind::ScrollUp => state.scroll_by(-3.0),
        MouseEventKind::ScrollDown => state.scroll_by(3.0),
        _ => {}
    }
    KeyAction::Continue
}

/// Screen cell → page coordinates, or `None` outside the page area.
fn page_point(state: &AppState, column: u16, row: u16) -> Option<(f64, f64)> {
    let area = state.page_area;
    area.contains(Position { x: column, y: row })
        .then(|| (f64::from(column - area.x), f64::from(row - area.y)))
}

/// Returns the id of the visible pin drawn at page cell `(x, y)`.
fn pin_at(state: &AppState, x: f64, y: f64) -> Option<String> {
    state
        .pins
        .iter()
        .rev()
        .filter(|pin| pin.visible && pin.y.floor() == y)
        .find(|pin| {
            let left = pin.x.floor() - 1.0;
            let width = pin.number.to_string().len() as f64 + 2.0;
            x >= left && x < left + width
        })
        .map(|pin| pin.id.clone())
}

fn handle_press(column: u16, row: u16, x: f64, y: f64, state: &mut AppState) {
    if state.overlay.draft().is_some() {
        return;
    }

    if !state.overlay.is_comment_mode() {
        if let Some(id) = pin_at(state, x, y) {
            if state.overlay.pin_pointer_down(&id, x, y).is_ok() {
                state.press = Some(PinPress { id: id.clone(), column, row, moved: false });
                state.selected = Some(id);
            }
            return;
        }
    }

    match state.overlay.click(&state.doc, x, y) {
        ClickOutcome::Suppressed => {
            if let Some(draft) = state.overlay.draft() {
                let locator = draft.locator.clone();
                state.info(format!("commenting on {locator}: type, Enter to post, Esc to cancel"));
            }
        }
        ClickOutcome::PassThrough => {
            let on_fab = state.page.fab().is_some()
                && state.doc.element_from_point(x, y, |_| false) == state.page.fab();
            if on_fab {
                toggle_comment_mode(state);
            } else {
                state.overlay.close_tooltip();
            }
        }
    }
}

/// Ends a pending pin press without re-anchoring.
fn abandon_press(state: &mut AppState) {
    if state.press.take().is_some() {
        state.overlay.cancel_drag();
        state.info("released outside the page, pin not moved");
    }
}

fn handle_release(x: f64, y: f64, state: &mut AppState) {
    let Some(press) = state.press.take() else {
        return;
    };

    if !press.moved {
        state.overlay.cancel_drag();
        state.overlay.toggle_tooltip(&press.id);
        return;
    }

    match state.overlay.drag_release(&state.doc, x, y) {
        Some(request) => state.send(request),
        None => state.info("dropped outside any element, pin not moved"),
    }
}
