//! Ayu color theme and status marks for mpinstall output.
//!
//! Color source: <https://github.com/ayu-theme/ayu-colors>
//!
//! Only outcomes get color: green for done, yellow for warnings and
//! fallbacks, red for failures. Everything else stays in standard text.

use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_WARN: &str = "\u{26A0}"; // ⚠
pub const ICON_FAIL: &str = "\u{2716}"; // ✖
pub const ICON_SKIP: &str = "-";
pub const ICON_INFO: &str = "\u{2139}"; // ℹ

/// Light separator used under table headers.
pub const SEPARATOR_CHAR: char = '\u{2500}'; // ─

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn paint(s: &str, rgb: (u8, u8, u8), color: bool) -> String {
    if color {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn render_muted(s: &str) -> String {
    paint(s, MUTED, supports_color())
}

/// Renders text in bold.
pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// A muted separator line `width` characters wide.
pub fn render_separator(width: usize) -> String {
    render_muted(&SEPARATOR_CHAR.to_string().repeat(width))
}

// ---------------------------------------------------------------------------
// Status marks
// ---------------------------------------------------------------------------

/// Outcome shown in front of a line of the install summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Pass,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Mark {
    pub fn icon(self) -> &'static str {
        match self {
            Mark::Pass => ICON_PASS,
            Mark::Warn => ICON_WARN,
            Mark::Fail => ICON_FAIL,
            Mark::Skip => ICON_SKIP,
            Mark::Info => ICON_INFO,
        }
    }

    fn rgb(self) -> (u8, u8, u8) {
        match self {
            Mark::Pass => PASS,
            Mark::Warn => WARN,
            Mark::Fail => FAIL,
            Mark::Skip => MUTED,
            Mark::Info => ACCENT,
        }
    }
}

/// `<icon> <label>` followed by muted detail text when present.
pub fn render_marked(mark: Mark, label: &str, detail: Option<&str>) -> String {
    format_marked(mark, label, detail, supports_color())
}

fn format_marked(mark: Mark, label: &str, detail: Option<&str>, color: bool) -> String {
    let icon = paint(mark.icon(), mark.rgb(), color);
    match detail {
        Some(detail) if !detail.is_empty() => {
            format!("{icon} {label}  {}", paint(detail, MUTED, color))
        }
        _ => format!("{icon} {label}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_marked_line() {
        assert_eq!(
            format_marked(Mark::Skip, "extract", Some("sources exist"), false),
            "- extract  sources exist"
        );
        assert_eq!(format_marked(Mark::Pass, "build", None, false), "\u{2713} build");
        assert_eq!(format_marked(Mark::Pass, "build", Some(""), false), "\u{2713} build");
    }

    #[test]
    fn colored_marked_line_contains_escape() {
        let line = format_marked(Mark::Fail, "configure", None, true);
        assert!(line.contains("\x1b["));
        assert!(line.contains("configure"));
    }

    #[test]
    fn every_mark_has_an_icon() {
        for mark in [Mark::Pass, Mark::Warn, Mark::Fail, Mark::Skip, Mark::Info] {
            assert!(!mark.icon().is_empty());
        }
    }
}
