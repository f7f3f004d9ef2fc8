//! UI rendering for pinmark.
//!
//! `render()` is the single entry point, called once per `AppEvent::Render`
//! inside `terminal.draw()`. It paints in stacking order: the demo page, then
//! the overlay chrome (highlight outline, pins, tooltip, floating button, draft
//! modal), then the status bar and help overlay.
//!
//! Everything is read from `AppState`; the pin list and page area were already
//! brought up to date by `AppState::frame()` before the draw.

mod layout;
pub mod help;
pub mod keybindings;

pub use layout::compute_layout;

use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use pinmark_core::dom::{Document, NodeId};
use pinmark_core::types::Comment;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{render_status_bar, to_screen};

/// Renders one complete frame.
pub fn render(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let [page, status_bar] = compute_layout(frame.area());

    frame.render_widget(Block::new().style(Style::default().bg(theme.background)), page);
    let body = state.doc.body();
    for &child in state.doc.children(body) {
        if Some(child) != state.overlay.root() {
            render_element(frame, page, &state.doc, child, theme);
        }
    }

    render_highlight(frame, page, state, theme);
    render_pins(frame, page, state, theme);
    render_tooltip(frame, page, state, theme);
    render_fab(frame, page, state, theme);
    render_draft(frame, page, state, theme);

    render_status_bar(frame, status_bar, state, theme);

    if state.mode == Mode::Help {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}

// ---------------------------------------------------------------------------
// Demo page
// ---------------------------------------------------------------------------

/// `tag#id.class` label shown on a container's top border.
fn element_label(doc: &Document, node: NodeId) -> String {
    let mut label = doc.tag(node).to_owned();
    if let Some(id) = doc.id_attr(node) {
        label.push('#');
        label.push_str(id);
    }
    for class in doc.classes(node) {
        label.push('.');
        label.push_str(class);
    }
    label
}

fn render_element(frame: &mut Frame, page: Rect, doc: &Document, node: NodeId, theme: &Theme) {
    if doc.attribute(node, "hidden").is_some() || doc.layout(node).is_none() {
        return;
    }
    let children = doc.children(node);
    let Some(boxed) = to_screen(page, doc.bounding_client_rect(node)) else {
        return;
    };

    if children.is_empty() {
        let fg = if doc.has_class(node, "banner") { theme.page_banner } else { theme.page_text };
        let mut style = Style::default().fg(fg);
        if matches!(doc.tag(node), "h1" | "h2" | "h3") {
            style = style.add_modifier(Modifier::BOLD);
        }
        if doc.tag(node) == "a" {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        let text = doc.text(node).unwrap_or_default();
        frame.render_widget(Paragraph::new(text).style(style), boxed.area);
        return;
    }

    let border = if doc.has_class(node, "highlighted") { theme.page_accent } else { theme.page_border };
    let mut block = Block::new()
        .borders(boxed.borders)
        .border_style(Style::default().fg(border));
    if boxed.borders.contains(Borders::TOP) {
        block = block.title(Span::styled(
            format!(" {} ", element_label(doc, node)),
            Style::default().fg(theme.page_label),
        ));
    }
    frame.render_widget(block, boxed.area);

    for &child in children {
        render_element(frame, page, doc, child, theme);
    }
}

// ---------------------------------------------------------------------------
// Overlay chrome
// ---------------------------------------------------------------------------

fn render_highlight(frame: &mut Frame, page: Rect, state: &AppState, theme: &Theme) {
    let Some(highlight) = state.overlay.highlight() else {
        return;
    };
    let Some(boxed) = to_screen(page, highlight.rect) else {
        return;
    };
    let block = Block::new()
        .borders(boxed.borders)
        .border_style(Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD))
        .title(Span::styled(
            format!(" {} ", highlight.locator),
            Style::default().fg(theme.highlight_label).bg(theme.highlight),
        ));
    frame.render_widget(block, boxed.area);
}

/// Screen cell of a pin's label, which starts one cell left of the anchor.
fn pin_cell(page: Rect, x: f64, y: f64, width: u16) -> Option<Rect> {
    let left = x.floor() as i64 - 1;
    let top = y.floor() as i64;
    if left < 0 || top < 0 || top >= i64::from(page.height) {
        return None;
    }
    let left = left as u16;
    if left >= page.width {
        return None;
    }
    let width = width.min(page.width - left);
    Some(Rect::new(page.x + left, page.y + top as u16, width, 1))
}

fn render_pins(frame: &mut Frame, page: Rect, state: &AppState, theme: &Theme) {
    for pin in state.pins.iter().filter(|p| p.visible) {
        let label = format!(" {} ", pin.number);
        let Some(cell) = pin_cell(page, pin.x, pin.y, label.chars().count() as u16) else {
            continue;
        };
        let selected = state.selected.as_deref() == Some(pin.id.as_str());
        let bg = if pin.dragging || selected {
            theme.pin_selected
        } else if pin.resolved {
            theme.pin_resolved
        } else {
            theme.pin
        };
        let mut style = Style::default().fg(theme.pin_text).bg(bg).add_modifier(Modifier::BOLD);
        if pin.resolved {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        frame.render_widget(Paragraph::new(label).style(style), cell);
    }
}

fn tooltip_text<'a>(comment: &'a Comment, theme: &Theme) -> Vec<Line<'a>> {
    let muted = Style::default().fg(theme.modal_muted);
    let mut lines = vec![
        Line::from(comment.content.as_str()),
        Line::from(Span::styled(
            format!("{} · {}", comment.author.name, comment.created_at),
            muted,
        )),
    ];
    for reply in &comment.thread {
        lines.push(Line::from(vec![
            Span::styled(format!("↳ {}: ", reply.author.name), muted),
            Span::raw(reply.content.as_str()),
        ]));
    }
    let state = if comment.resolved { "resolved" } else { "x resolve · d delete" };
    lines.push(Line::from(Span::styled(state, muted.add_modifier(Modifier::ITALIC))));
    lines
}

fn render_tooltip(frame: &mut Frame, page: Rect, state: &AppState, theme: &Theme) {
    let Some(id) = state.overlay.tooltip() else {
        return;
    };
    let (Some(comment), Some(pin)) = (
        state.overlay.comment(id),
        state.pins.iter().find(|p| p.id == id && p.visible),
    ) else {
        return;
    };

    let lines = tooltip_text(comment, theme);
    let width = 36.min(page.width);
    let height = (lines.len() as u16 + 2 + 1).min(page.height);
    if width < 4 || height < 3 {
        return;
    }
    // Below-right of the pin, flipped to stay on screen.
    let anchor_x = pin.x.max(0.0) as u16;
    let anchor_y = pin.y.max(0.0) as u16;
    let x = if anchor_x + width < page.width { anchor_x } else { page.width - width };
    let y = if anchor_y + 1 + height <= page.height {
        anchor_y + 1
    } else {
        anchor_y.saturating_sub(height)
    };
    let area = Rect::new(page.x + x, page.y + y, width, height);

    let number = state.pins.iter().find(|p| p.id == id).map_or(0, |p| p.number);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(format!(" #{number} "))
                    .border_style(Style::default().fg(theme.modal_border)),
            )
            .style(Style::default().bg(theme.background))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_fab(frame: &mut Frame, page: Rect, state: &AppState, theme: &Theme) {
    let Some(fab) = state.page.fab() else {
        return;
    };
    let Some(boxed) = to_screen(page, state.doc.bounding_client_rect(fab)) else {
        return;
    };
    let armed = state.overlay.is_comment_mode();
    let style = if armed {
        Style::default().fg(theme.background).bg(theme.status_mode_comment)
    } else {
        Style::default().fg(theme.fab)
    };
    frame.render_widget(Clear, boxed.area);
    frame.render_widget(
        Paragraph::new(state.doc.text(fab).unwrap_or_default())
            .centered()
            .style(style)
            .block(Block::new().borders(boxed.borders).border_style(Style::default().fg(theme.fab))),
        boxed.area,
    );
}

fn render_draft(frame: &mut Frame, page: Rect, state: &AppState, theme: &Theme) {
    let Some(draft) = state.overlay.draft() else {
        return;
    };
    let area = page.centered(Constraint::Length(52.min(page.width)), Constraint::Length(7.min(page.height)));
    let muted = Style::default().fg(theme.modal_muted);
    let lines = vec![
        Line::from(Span::styled(draft.locator.as_str(), muted)),
        Line::from(""),
        Line::from(vec![
            Span::raw(draft.text.as_str()),
            Span::styled("▏", Style::default().fg(theme.modal_border)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Enter post · Esc cancel", muted.add_modifier(Modifier::ITALIC))),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(" New comment ")
                    .border_style(Style::default().fg(theme.modal_border)),
            )
            .style(Style::default().bg(theme.background))
            .wrap(Wrap { trim: false }),
        area,
    );
}
