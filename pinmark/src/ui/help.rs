//! Help overlay renderer for pinmark.
//!
//! Draws a centred modal over the page with `Clear` erasing the background
//! first, inside the same `terminal.draw()` closure as everything else.

use ratatui::{
    Frame,
    layout::Constraint,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay, scrolled down by `help_scroll` rows.
///
/// Skipped on terminals narrower than 40 columns.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 40 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));

    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help │ j/k scroll, ? or Esc to close ")
        .border_style(ratatui::style::Style::default().fg(theme.modal_border));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Page"),
        Line::from("  j / k         Scroll down / up one row"),
        Line::from("  Space / PgDn  Page down        PgUp  Page up"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  mouse wheel   Scroll three rows"),
        Line::from("  b             Show / hide the promo banner"),
        Line::from("  s             Shuffle the feature cards"),
        Line::from("  h             Highlight the first card (grows it)"),
        Line::from(""),
        Line::from("Commenting"),
        Line::from("  c / ✎ button  Toggle comment mode"),
        Line::from("  click         In comment mode: pin a comment to the element"),
        Line::from("  Enter / Esc   In the draft: post / discard"),
        Line::from("  Esc           Leave comment mode, or close the open tooltip"),
        Line::from(""),
        Line::from("Pins"),
        Line::from("  Tab / n       Select next pin      Shift-Tab / N  previous"),
        Line::from("  Enter         Open / close the selected pin's tooltip"),
        Line::from("  click pin     Open / close its tooltip"),
        Line::from("  drag pin      Re-anchor it to the element under the cursor"),
        Line::from("  x             Resolve the selected comment"),
        Line::from("  d             Delete the selected comment"),
        Line::from("  r             Reload comments from storage"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help"),
        Line::from("  q / Ctrl-c    Quit"),
    ])
}
