//! Color theme system for pinmark.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every surface
//! pinmark draws: the demo page's element boxes, the overlay chrome on top of
//! them, and the status bar. Two built-in themes are provided:
//!
//! - `dark` — ANSI 16 colors, works on any terminal.
//! - `catppuccin_mocha` — Catppuccin Mocha palette in RGB; requires truecolor.

use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    // Demo page
    /// Border of container elements.
    pub page_border: Color,
    /// Tag/class label drawn on container borders.
    pub page_label: Color,
    /// Text of leaf elements.
    pub page_text: Color,
    /// Elements carrying the `highlighted` class.
    pub page_accent: Color,
    /// The dismissible promo banner.
    pub page_banner: Color,

    // Overlay chrome
    /// Outline around the element under the cursor in comment mode.
    pub highlight: Color,
    /// Foreground of the locator label on the highlight outline.
    pub highlight_label: Color,
    /// Background of an open comment pin.
    pub pin: Color,
    /// Background of a resolved comment pin.
    pub pin_resolved: Color,
    /// Background of the pin selected with Tab.
    pub pin_selected: Color,
    /// Foreground of pin numbers.
    pub pin_text: Color,
    /// Border of tooltips and the draft modal.
    pub modal_border: Color,
    /// Secondary text inside tooltips and the modal (author, locator).
    pub modal_muted: Color,
    /// The floating comment button.
    pub fab: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Mode indicator while browsing.
    pub status_mode_browse: Color,
    /// Mode indicator while comment mode is armed or a draft is open.
    pub status_mode_comment: Color,
    /// Transient error messages.
    pub status_error: Color,

    /// Application background (used for clearing areas).
    pub background: Color,
}

impl Theme {
    /// The built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            page_border: Color::DarkGray,
            page_label: Color::Gray,
            page_text: Color::Reset,
            page_accent: Color::Yellow,
            page_banner: Color::Magenta,

            highlight: Color::Cyan,
            highlight_label: Color::Black,
            pin: Color::Blue,
            pin_resolved: Color::DarkGray,
            pin_selected: Color::Yellow,
            pin_text: Color::White,
            modal_border: Color::Cyan,
            modal_muted: Color::DarkGray,
            fab: Color::Blue,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_browse: Color::Cyan,
            status_mode_comment: Color::Green,
            status_error: Color::Red,

            background: Color::Reset,
        }
    }

    /// The Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay0 = Color::Rgb(108, 112, 134); // #6c7086
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let crust = Color::Rgb(17, 17, 27); // #11111b
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            page_border: surface1,
            page_label: overlay1,
            page_text: text,
            page_accent: peach,
            page_banner: mauve,

            highlight: teal,
            highlight_label: crust,
            pin: blue,
            pin_resolved: overlay0,
            pin_selected: yellow,
            pin_text: crust,
            modal_border: lavender,
            modal_muted: overlay1,
            fab: blue,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_browse: lavender,
            status_mode_comment: green,
            status_error: red,

            background: base,
        }
    }

    /// Resolves a theme name from config. Unknown names fall back to `dark()`
    /// with a note on stderr.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                eprintln!("pinmark: unknown theme '{}', falling back to 'dark'", other);
                Self::dark()
            }
        }
    }
}
