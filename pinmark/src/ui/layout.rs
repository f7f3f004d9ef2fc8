//! Screen layout for pinmark.
//!
//! Pure arithmetic, no application state: the terminal is split into the page
//! area (everything but the last row) and a one-row status bar. Page boxes are
//! mapped from viewport coordinates onto the page area and clipped to it.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Borders, Paragraph},
};

use pinmark_core::types::Rect as PageRect;

use crate::app::AppState;
use crate::theme::Theme;

/// Returns `[page, status_bar]` for a terminal of the given size.
pub fn compute_layout(area: Rect) -> [Rect; 2] {
    area.layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]))
}

/// A page box mapped onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenBox {
    /// The visible part of the box.
    pub area: Rect,
    /// Which edges of the box survived clipping.
    pub borders: Borders,
}

/// Maps a viewport-relative box onto `page`, clipping it to the page area.
///
/// Returns `None` when nothing of the box is on screen.
pub fn to_screen(page: Rect, rect: PageRect) -> Option<ScreenBox> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let left = rect.left.floor() as i64;
    let top = rect.top.floor() as i64;
    let right = left + rect.width.round() as i64;
    let bottom = top + rect.height.round() as i64;

    let clip_left = left.max(0);
    let clip_top = top.max(0);
    let clip_right = right.min(i64::from(page.width));
    let clip_bottom = bottom.min(i64::from(page.height));
    if clip_left >= clip_right || clip_top >= clip_bottom {
        return None;
    }

    let mut borders = Borders::NONE;
    if top == clip_top {
        borders |= Borders::TOP;
    }
    if bottom == clip_bottom {
        borders |= Borders::BOTTOM;
    }
    if left == clip_left {
        borders |= Borders::LEFT;
    }
    if right == clip_right {
        borders |= Borders::RIGHT;
    }

    // Clipped coordinates are within `page`, so they fit in u16.
    let area = Rect::new(
        page.x + clip_left as u16,
        page.y + clip_top as u16,
        (clip_right - clip_left) as u16,
        (clip_bottom - clip_top) as u16,
    );
    Some(ScreenBox { area, borders })
}

/// Renders the one-row status bar: mode, pin count, scroll position and the
/// latest status message.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let overlay = &state.overlay;
    let (mode_text, mode_fg) = if overlay.draft().is_some() {
        (" DRAFT ", theme.status_mode_comment)
    } else if overlay.drag().is_some() {
        (" MOVE ", theme.status_mode_comment)
    } else if overlay.is_comment_mode() {
        (" COMMENT ", theme.status_mode_comment)
    } else {
        (" BROWSE ", theme.status_mode_browse)
    };

    let open = overlay.comments().iter().filter(|c| !c.resolved).count();
    let (_, scroll_y) = state.doc.scroll_offset();
    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(mode_fg).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " {} pins ({} open) │ row {}/{} ",
            overlay.comments().len(),
            open,
            scroll_y as u64,
            state.doc.max_scroll_y() as u64,
        )),
    ];
    if let Some(status) = &state.status {
        let style = if status.error {
            Style::default().fg(theme.status_error).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::raw("│ "));
        spans.push(Span::styled(status.text.clone(), style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
